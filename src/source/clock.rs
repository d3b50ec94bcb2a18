//! Spells the current time, in five minute steps plus minute dots, and the weekday.

use rgb::RGB8;

use crate::buffer::ColorBuffer;
use crate::control::Controllable;
use crate::control::ValidationError;
use crate::error::ConfigurationError;
use crate::geometry::Grid;
use crate::geometry::PixelIndex;
use crate::geometry::PixelSet;
use crate::layout::ClockPhrases;
use crate::layout::WordLayout;
use crate::settings::Section;

const SECTION: &str = "clock";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockSettings {
    pub on: RGB8,
    pub off: RGB8,
    pub day: RGB8,
    pub minute: RGB8,
    pub rainbow: bool,
    pub simulate: bool,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            on: RGB8::new(255, 255, 255),
            off: RGB8::new(0, 0, 0),
            day: RGB8::new(255, 165, 0),
            minute: RGB8::new(0x00, 0xc6, 0xce),
            rainbow: false,
            simulate: false,
        }
    }
}

impl ClockSettings {
    pub fn from_section(section: &Section) -> Result<Self, ValidationError> {
        use crate::settings::read;

        let defaults = Self::default();
        let color = |s: &str| crate::color::parse(s).map_err(ValidationError::from);

        Ok(Self {
            on: read(section, SECTION, "on_rgb", defaults.on, color)?,
            off: read(section, SECTION, "off_rgb", defaults.off, color)?,
            day: read(section, SECTION, "day_rgb", defaults.day, color)?,
            minute: read(section, SECTION, "minute_rgb", defaults.minute, color)?,
            rainbow: read(section, SECTION, "rainbow", defaults.rainbow, crate::control::parse_bool)?,
            simulate: read(section, SECTION, "simulate", defaults.simulate, crate::control::parse_bool)?,
        })
    }

    pub fn to_section(&self) -> Section {
        use crate::color::to_hex;

        Section::from([
            (String::from("on_rgb"), to_hex(self.on)),
            (String::from("off_rgb"), to_hex(self.off)),
            (String::from("day_rgb"), to_hex(self.day)),
            (String::from("minute_rgb"), to_hex(self.minute)),
            (String::from("rainbow"), self.rainbow.to_string()),
            (String::from("simulate"), self.simulate.to_string()),
        ])
    }
}

/// Wall clock time as the clock face needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Days since Monday.
    pub weekday: u8,
}

impl From<time::OffsetDateTime> for ClockReading {
    fn from(now: time::OffsetDateTime) -> Self {
        Self {
            hour: now.hour(),
            minute: now.minute(),
            second: now.second(),
            weekday: now.weekday().number_days_from_monday(),
        }
    }
}

/// Which phrase variants light up for a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub hour_index: usize,
    pub minute_bucket: usize,
    pub extra_minutes: usize,
}

impl ClockReading {
    /// From 35 minutes on the time is told relative to the next hour.
    pub fn selection(&self) -> Selection {
        let minute = usize::from(self.minute % 60);
        let additional_hour = usize::from(minute >= 35);

        Selection {
            hour_index: (usize::from(self.hour) + additional_hour) % 24,
            minute_bucket: minute / 5,
            extra_minutes: minute % 5,
        }
    }
}

/// Runs through the day quickly: one hour per frame, one minute per day.
#[derive(Debug, Default, Clone)]
struct SimulatedClock {
    hour: u8,
    minute: u8,
    second: u8,
    weekday: u8,
}

impl SimulatedClock {
    fn advance(&mut self) -> ClockReading {
        self.hour = (self.hour + 1) % 24;
        if self.hour == 0 {
            self.minute = (self.minute + 1) % 60;
            self.weekday = (self.weekday + 1) % 7;
            if self.minute == 0 {
                self.second = (self.second + 30) % 60;
            }
        }

        ClockReading {
            hour: self.hour,
            minute: self.minute,
            second: self.second,
            weekday: self.weekday,
        }
    }
}

struct Phrases {
    prefix: PixelSet,
    minutes: Vec<PixelSet>,
    extra_minutes: Vec<PixelSet>,
    hours: Vec<PixelSet>,
    weekdays: Vec<PixelSet>,
}

pub struct ClockSource {
    grid: Grid,
    phrases: Phrases,
    /// Which minute dot a pixel belongs to, if any.
    minute_dot: Vec<Option<usize>>,
    any_weekday: PixelSet,
    settings: ClockSettings,
    simulated: SimulatedClock,
}

impl ClockSource {
    pub fn new(layout: &WordLayout, settings: ClockSettings) -> Result<Self, ConfigurationError> {
        let grid = *layout.grid();
        if crate::color::RAINBOW.len() != grid.width() {
            return Err(ConfigurationError::PaletteWidthMismatch {
                palette: crate::color::RAINBOW.len(),
                width: grid.width(),
            });
        }

        let phrases = ClockPhrases::from_layout(layout)?;

        let to_set = |positions: &Vec<PixelIndex>| -> Result<PixelSet, ConfigurationError> {
            let mut set = PixelSet::empty(&grid);
            set.extend(positions.iter().copied())?;
            Ok(set)
        };
        let to_sets = |variants: &[Vec<PixelIndex>]| variants.iter().map(to_set).collect::<Result<Vec<_>, _>>();

        let mut minute_dot = vec![None; grid.number_of_pixels()];
        for (dot, positions) in phrases.minute_dots.iter().enumerate() {
            for index in positions {
                minute_dot[*index] = Some(dot);
            }
        }

        let mut any_weekday = PixelSet::empty(&grid);
        for weekday in &phrases.weekdays {
            any_weekday.extend(weekday.iter().copied())?;
        }

        Ok(Self {
            grid,
            phrases: Phrases {
                prefix: to_set(&phrases.prefix)?,
                minutes: to_sets(&phrases.minutes)?,
                extra_minutes: to_sets(&phrases.extra_minutes)?,
                hours: to_sets(&phrases.hours)?,
                weekdays: to_sets(&phrases.weekdays)?,
            },
            minute_dot,
            any_weekday,
            settings,
            simulated: SimulatedClock::default(),
        })
    }

    pub fn lit(&self, reading: ClockReading) -> PixelSet {
        let selection = reading.selection();
        let mut lit = self.phrases.prefix.clone();
        lit.union_with(&self.phrases.minutes[selection.minute_bucket]);
        lit.union_with(&self.phrases.extra_minutes[selection.extra_minutes]);
        lit.union_with(&self.phrases.hours[selection.hour_index]);
        lit.union_with(&self.phrases.weekdays[usize::from(reading.weekday % 7)]);
        lit
    }

    /// Colours a reading. Minute dots win over the weekday, which wins over other words.
    pub fn compose(&self, reading: ClockReading) -> ColorBuffer {
        let lit = self.lit(reading);
        let settings = &self.settings;

        ColorBuffer::from_fn(self.grid, |index| {
            if !lit.contains(index) {
                return settings.off;
            }

            if let Some(dot) = self.minute_dot[index] {
                return if settings.rainbow {
                    crate::color::MINUTE_ACCENTS[dot % crate::color::MINUTE_ACCENTS.len()]
                } else {
                    settings.minute
                };
            }

            if self.any_weekday.contains(index) {
                return settings.day;
            }

            if settings.rainbow {
                self.rainbow_color(index)
            } else {
                settings.on
            }
        })
    }

    fn rainbow_color(&self, index: PixelIndex) -> RGB8 {
        self.grid
            .to_row_col(index)
            .map(|position| crate::color::RAINBOW[position.column])
            .unwrap_or(self.settings.on)
    }
}

impl Controllable for ClockSource {
    fn section(&self) -> &'static str {
        SECTION
    }

    fn topic_prefix(&self) -> &'static str {
        "plugin/clock"
    }

    fn control_topics(&self) -> &'static [&'static str] {
        &["on", "off", "day", "minute", "rainbow", "simulate"]
    }

    fn handle_message(&mut self, topic: &str, payload: &str) -> Result<(), ValidationError> {
        let mut next = self.settings.clone();
        match topic {
            "on" => next.on = crate::color::parse(payload)?,
            "off" => next.off = crate::color::parse(payload)?,
            "day" => next.day = crate::color::parse(payload)?,
            "minute" => next.minute = crate::color::parse(payload)?,
            "rainbow" => next.rainbow = crate::control::parse_bool(payload)?,
            "simulate" => next.simulate = crate::control::parse_bool(payload)?,
            other => return Err(ValidationError::UnknownTopic(other.to_string())),
        }

        tracing::info!(?topic, settings = ?next, "Clock settings changed");
        self.settings = next;
        Ok(())
    }

    fn persisted(&self) -> Section {
        self.settings.to_section()
    }
}

impl super::Source for ClockSource {
    fn name(&self) -> &'static str {
        "clock"
    }

    fn frame_rate(&self) -> super::FrameRate {
        super::FrameRate::hz(5)
    }

    fn render(&mut self, now: time::OffsetDateTime) -> ColorBuffer {
        let reading = if self.settings.simulate {
            self.simulated.advance()
        } else {
            ClockReading::from(now)
        };

        tracing::trace!(?reading, "Rendering clock");
        self.compose(reading)
    }
}

#[cfg(test)]
mod tests {
    use rgb::RGB8;
    use time::macros::datetime;

    use super::ClockReading;
    use super::ClockSettings;
    use super::ClockSource;
    use super::Selection;
    use crate::buffer::ColorBuffer;
    use crate::control::Controllable;
    use crate::error::ConfigurationError;
    use crate::geometry::Grid;
    use crate::geometry::RowCol;
    use crate::layout::WordLayout;
    use crate::source::Source;

    fn layout() -> WordLayout {
        WordLayout::parse(Grid::new(12, 12), crate::layout::FRENCH).unwrap()
    }

    fn clock(settings: ClockSettings) -> ClockSource {
        ClockSource::new(&layout(), settings).unwrap()
    }

    fn reading(hour: u8, minute: u8, weekday: u8) -> ClockReading {
        ClockReading {
            hour,
            minute,
            second: 0,
            weekday,
        }
    }

    fn art(buffer: &ColorBuffer, off: RGB8) -> String {
        let layout = layout();
        let letters = layout.letters();
        let grid = buffer.grid();
        (0..grid.height())
            .map(|row| {
                (0..grid.width())
                    .map(|column| {
                        let index = grid.to_pixel_index(RowCol::new(row, column)).unwrap();
                        if buffer.get(index) == Some(off) {
                            '.'
                        } else {
                            letters[index].unwrap_or('?')
                        }
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn color_at(buffer: &ColorBuffer, row: usize, column: usize) -> RGB8 {
        let index = buffer.grid().to_pixel_index(RowCol::new(row, column)).unwrap();
        buffer.get(index).unwrap()
    }

    #[test]
    fn test_additional_hour_boundary() {
        assert_eq!(
            reading(10, 34, 0).selection(),
            Selection {
                hour_index: 10,
                minute_bucket: 6,
                extra_minutes: 4
            }
        );
        assert_eq!(
            reading(10, 35, 0).selection(),
            Selection {
                hour_index: 11,
                minute_bucket: 7,
                extra_minutes: 0
            }
        );
        assert_eq!(reading(23, 40, 0).selection().hour_index, 0);
    }

    #[test]
    fn test_selection_ranges() {
        for minute in 0..60 {
            let selection = reading(0, minute, 0).selection();
            assert!(selection.minute_bucket < 12);
            assert!(selection.extra_minutes < 5);
            assert_eq!(
                selection.minute_bucket * 5 + selection.extra_minutes,
                usize::from(minute)
            );
        }
    }

    #[test]
    fn test_twenty_five_to_eleven_on_wednesday() {
        let settings = ClockSettings::default();
        let buffer = clock(settings.clone()).compose(reading(10, 35, 2));

        insta::assert_snapshot!(art(&buffer, settings.off), @r"
        IL.EST......
        ............
        ............
        ............
        ............
        ONZE.HEURES.
        MOINS.......
        ............
        VINGT.CINQ..
        ............
        ...M........
        ............
        ");
    }

    #[test]
    fn test_midnight_and_midday_have_no_hour_word() {
        let settings = ClockSettings::default();
        let source = clock(settings.clone());

        let midnight = art(&source.compose(reading(0, 0, 0)), settings.off);
        assert_eq!(midnight.lines().nth(4), Some(".....MINUIT."));
        assert_eq!(midnight.lines().nth(5), Some("............"));

        let midday = art(&source.compose(reading(11, 40, 0)), settings.off);
        assert_eq!(midday.lines().nth(4), Some("MIDI........"));
        assert_eq!(midday.lines().nth(6), Some("MOINS......."));
    }

    #[test]
    fn test_weekday_wins_over_on_color() {
        for rainbow in [false, true] {
            let settings = ClockSettings {
                rainbow,
                ..ClockSettings::default()
            };
            let buffer = clock(settings.clone()).compose(reading(9, 0, 2));
            // the Wednesday 'M' is both a lit word and the weekday
            assert_eq!(color_at(&buffer, 10, 3), settings.day);
            assert_eq!(color_at(&buffer, 10, 2), settings.off);
        }
    }

    #[test]
    fn test_minute_dots() {
        let settings = ClockSettings::default();
        let buffer = clock(settings.clone()).compose(reading(9, 2, 0));
        assert_eq!(color_at(&buffer, 11, 2), settings.minute);
        assert_eq!(color_at(&buffer, 11, 3), settings.minute);
        assert_eq!(color_at(&buffer, 11, 4), settings.off);

        let settings = ClockSettings {
            rainbow: true,
            ..settings
        };
        let buffer = clock(settings).compose(reading(9, 4, 0));
        for (dot, accent) in crate::color::MINUTE_ACCENTS.iter().enumerate() {
            assert_eq!(color_at(&buffer, 11, 2 + dot), *accent);
        }
    }

    #[test]
    fn test_rainbow_colors_by_column() {
        let settings = ClockSettings {
            rainbow: true,
            ..ClockSettings::default()
        };
        let buffer = clock(settings).compose(reading(9, 0, 0));
        // "IL EST" in the top row
        for column in [0, 1, 3, 4, 5] {
            assert_eq!(color_at(&buffer, 0, column), crate::color::RAINBOW[column]);
        }
        // "HEURES" in a row wired right to left
        for column in 5..11 {
            assert_eq!(color_at(&buffer, 5, column), crate::color::RAINBOW[column]);
        }
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut source = clock(ClockSettings::default());
        let now = datetime!(2024-01-03 10:35:00 UTC);
        let first = source.render(now);
        let second = source.render(now);
        assert_eq!(first, second);
        assert_eq!(first, source.compose(reading(10, 35, 2)));
    }

    #[test]
    fn test_simulated_time() {
        let mut source = clock(ClockSettings {
            simulate: true,
            ..ClockSettings::default()
        });
        let now = datetime!(2024-01-03 10:35:00 UTC);

        assert_eq!(source.simulated.advance(), reading(1, 0, 0));
        for _ in 1..24 {
            source.simulated.advance();
        }
        assert_eq!(source.simulated.advance(), reading(1, 1, 1));

        let mut fresh = super::SimulatedClock::default();
        let last = (0..24 * 60).map(|_| fresh.advance()).last().unwrap();
        assert_eq!(
            last,
            ClockReading {
                hour: 0,
                minute: 0,
                second: 30,
                weekday: (60 % 7) as u8,
            }
        );

        // every frame shows a different hour regardless of the wall clock
        let first = source.render(now);
        let second = source.render(now);
        assert_ne!(first, second);
    }

    #[test]
    fn test_settings_change_applies_to_the_whole_frame() {
        let mut source = clock(ClockSettings::default());
        let before = source.compose(reading(9, 0, 0));

        source.handle_message("on", "#00ff00").unwrap();
        let after = source.compose(reading(9, 0, 0));

        let green = RGB8::new(0, 255, 0);
        let white = RGB8::new(255, 255, 255);
        assert!(before.pixels().iter().all(|c| *c != green));
        assert!(after.pixels().iter().all(|c| *c != white));
        assert!(after.pixels().contains(&green));
    }

    #[test]
    fn test_invalid_message_is_rejected() {
        let mut source = clock(ClockSettings::default());
        assert!(source.handle_message("on", "#zzzzzz").is_err());
        assert!(source.handle_message("rainbow", "maybe").is_err());
        assert!(source.handle_message("signature", "#ffffff").is_err());
        assert_eq!(source.settings, ClockSettings::default());
    }

    #[test]
    fn test_settings_round_trip_through_section() {
        let settings = ClockSettings {
            on: RGB8::new(1, 2, 3),
            rainbow: true,
            ..ClockSettings::default()
        };
        let section = settings.to_section();
        insta::assert_json_snapshot!(section, @r###"
        {
          "day_rgb": "#ffa500",
          "minute_rgb": "#00c6ce",
          "off_rgb": "#000000",
          "on_rgb": "#010203",
          "rainbow": "true",
          "simulate": "false"
        }
        "###);
        assert_eq!(ClockSettings::from_section(&section).unwrap(), settings);
    }

    #[test]
    fn test_palette_must_match_width() {
        let layout = WordLayout::parse(Grid::new(10, 10), "{}").unwrap();
        assert!(matches!(
            ClockSource::new(&layout, ClockSettings::default()),
            Err(ConfigurationError::PaletteWidthMismatch {
                palette: 12,
                width: 10
            })
        ));
    }
}
