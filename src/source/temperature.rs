//! Shows the outdoor temperature as large digits followed by a degree sign.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use rgb::RGB8;
use tokio::time::Instant;

use crate::buffer::ColorBuffer;
use crate::control::Controllable;
use crate::control::ValidationError;
use crate::error::ConfigurationError;
use crate::geometry::Grid;
use crate::geometry::PixelIndex;
use crate::geometry::PixelSet;
use crate::settings::Section;
use crate::weather::WeatherError;
use crate::weather::WeatherProvider;

use super::glyphs;

const SECTION: &str = "temperature";

const FRAME_RATE: super::FrameRate = super::FrameRate::hz(1);

/// Shown whenever no reading could be fetched.
pub const SENTINEL: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemperatureSettings {
    pub on: RGB8,
    pub off: RGB8,
    pub rainbow: bool,
    pub location: String,
}

impl Default for TemperatureSettings {
    fn default() -> Self {
        Self {
            on: RGB8::new(255, 255, 255),
            off: RGB8::new(0, 0, 0),
            rainbow: false,
            location: String::from("Paris,FR"),
        }
    }
}

impl TemperatureSettings {
    pub fn from_section(section: &Section) -> Result<Self, ValidationError> {
        use crate::settings::read;

        let defaults = Self::default();
        let color = |s: &str| crate::color::parse(s).map_err(ValidationError::from);

        Ok(Self {
            on: read(section, SECTION, "on_rgb", defaults.on, color)?,
            off: read(section, SECTION, "off_rgb", defaults.off, color)?,
            rainbow: read(section, SECTION, "rainbow", defaults.rainbow, crate::control::parse_bool)?,
            location: read(section, SECTION, "location", defaults.location, crate::control::parse_location)?,
        })
    }

    pub fn to_section(&self) -> Section {
        use crate::color::to_hex;

        Section::from([
            (String::from("on_rgb"), to_hex(self.on)),
            (String::from("off_rgb"), to_hex(self.off)),
            (String::from("rainbow"), self.rainbow.to_string()),
            (String::from("location"), self.location.clone()),
        ])
    }
}

/// How often and how long the weather provider is asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Upper bound for one request, which may span several frames.
    pub timeout: Duration,
    /// A successful reading younger than this is reused.
    pub refresh_interval: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            refresh_interval: Duration::from_secs(60),
        }
    }
}

type Fetch = Pin<Box<dyn Future<Output = Result<i32, WeatherError>>>>;

pub struct TemperatureSource<W> {
    grid: Grid,
    /// Lit pixels for every displayable reading, starting at the lowest.
    readings: Vec<PixelSet>,
    provider: W,
    policy: FetchPolicy,
    settings: TemperatureSettings,
    /// Location to fall back to while a new one has not been confirmed by the provider.
    confirmed_location: Option<String>,
    current: i32,
    last_success: Option<Instant>,
    /// Request that did not finish within the frame it was started in.
    in_flight: Option<Fetch>,
}

impl<W> TemperatureSource<W>
where
    W: WeatherProvider + Clone + 'static,
{
    pub fn new(
        grid: Grid,
        provider: W,
        policy: FetchPolicy,
        settings: TemperatureSettings,
    ) -> Result<Self, ConfigurationError> {
        if grid.width() < glyphs::MIN_WIDTH || grid.height() < glyphs::MIN_HEIGHT {
            return Err(ConfigurationError::GridTooSmall {
                width: grid.width(),
                height: grid.height(),
                min_width: glyphs::MIN_WIDTH,
                min_height: glyphs::MIN_HEIGHT,
            });
        }

        if crate::color::RAINBOW.len() != grid.width() {
            return Err(ConfigurationError::PaletteWidthMismatch {
                palette: crate::color::RAINBOW.len(),
                width: grid.width(),
            });
        }

        let readings = (glyphs::MIN_TEMPERATURE..=glyphs::MAX_TEMPERATURE)
            .map(|temperature| glyphs::render(&grid, temperature))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            grid,
            readings,
            provider,
            policy,
            settings,
            confirmed_location: None,
            current: SENTINEL,
            last_success: None,
            in_flight: None,
        })
    }

    pub fn lit(&self, temperature: i32) -> &PixelSet {
        let slot = glyphs::clamp(temperature) - glyphs::MIN_TEMPERATURE;
        // clamping keeps the slot inside the table
        &self.readings[usize::try_from(slot).unwrap_or(0)]
    }

    pub fn compose(&self, temperature: i32) -> ColorBuffer {
        let lit = self.lit(temperature);
        let settings = &self.settings;

        ColorBuffer::from_fn(self.grid, |index| {
            if !lit.contains(index) {
                settings.off
            } else if settings.rainbow {
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

    fn reading_is_fresh(&self) -> bool {
        self.last_success
            .is_some_and(|at| at.elapsed() < self.policy.refresh_interval)
    }

    /// The request owns its provider handle, so it can outlive the frame that started it.
    fn start_fetch(&self) -> Fetch {
        let provider = self.provider.clone();
        let location = self.settings.location.clone();
        let timeout = self.policy.timeout;
        tracing::debug!(?location, ?timeout, "Fetching temperature");

        Box::pin(async move {
            tokio::time::timeout(timeout, provider.temperature(&location))
                .await
                .unwrap_or(Err(WeatherError::Timeout))
        })
    }

    fn apply(&mut self, result: Result<i32, WeatherError>) {
        match result {
            Ok(temperature) => {
                if self.confirmed_location.take().is_some() {
                    tracing::info!(location = ?self.settings.location, "Location accepted");
                }
                tracing::debug!(temperature, "Temperature updated");
                self.current = temperature;
                self.last_success = Some(Instant::now());
            }

            Err(WeatherError::UnknownLocation(location)) if self.confirmed_location.is_some() => {
                let previous = self.confirmed_location.take().unwrap_or_default();
                tracing::warn!(?location, ?previous, "Unknown location, restoring the previous one");
                self.settings = TemperatureSettings {
                    location: previous,
                    ..self.settings.clone()
                };
                self.current = SENTINEL;
                self.last_success = None;
            }

            Err(error) => {
                tracing::warn!(?error, "Failed to fetch temperature");
                self.current = SENTINEL;
                self.last_success = None;
            }
        }
    }
}

impl<W> Controllable for TemperatureSource<W>
where
    W: WeatherProvider,
{
    fn section(&self) -> &'static str {
        SECTION
    }

    fn topic_prefix(&self) -> &'static str {
        "plugin/temperature"
    }

    fn control_topics(&self) -> &'static [&'static str] {
        &["on", "off", "rainbow", "location"]
    }

    fn handle_message(&mut self, topic: &str, payload: &str) -> Result<(), ValidationError> {
        let mut next = self.settings.clone();
        match topic {
            "on" => next.on = crate::color::parse(payload)?,
            "off" => next.off = crate::color::parse(payload)?,
            "rainbow" => next.rainbow = crate::control::parse_bool(payload)?,
            "location" => next.location = crate::control::parse_location(payload)?,
            other => return Err(ValidationError::UnknownTopic(other.to_string())),
        }

        if next.location != self.settings.location {
            // keep the oldest confirmed location when changed twice before a fetch
            if self.confirmed_location.is_none() {
                self.confirmed_location = Some(self.settings.location.clone());
            }
            self.last_success = None;
            self.in_flight = None;
        }

        tracing::info!(?topic, settings = ?next, "Temperature settings changed");
        self.settings = next;
        Ok(())
    }

    /// Unconfirmed locations are not persisted.
    fn persisted(&self) -> Section {
        let mut section = self.settings.to_section();
        if let Some(confirmed) = &self.confirmed_location {
            section.insert(String::from("location"), confirmed.clone());
        }
        section
    }
}

impl<W> super::Source for TemperatureSource<W>
where
    W: WeatherProvider + Clone + 'static,
{
    fn name(&self) -> &'static str {
        "temperature"
    }

    fn frame_rate(&self) -> super::FrameRate {
        FRAME_RATE
    }

    /// Waits a quarter of a frame for the reading, a slower request keeps running in the background.
    fn refresh(&mut self) -> super::Refresh<'_> {
        Box::pin(async move {
            if self.in_flight.is_none() {
                if self.reading_is_fresh() {
                    return;
                }
                self.in_flight = Some(self.start_fetch());
            }

            let Some(fetch) = self.in_flight.as_mut() else {
                return;
            };
            let outcome = tokio::time::timeout(FRAME_RATE.period() / 4, fetch).await;

            match outcome {
                Ok(result) => {
                    self.in_flight = None;
                    self.apply(result);
                }
                Err(_elapsed) => {
                    tracing::trace!(temperature = self.current, "Temperature still being fetched");
                }
            }
        })
    }

    fn render(&mut self, _now: time::OffsetDateTime) -> ColorBuffer {
        tracing::trace!(temperature = self.current, "Rendering temperature");
        self.compose(self.current)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::time::Duration;

    use rgb::RGB8;

    use super::FetchPolicy;
    use super::TemperatureSettings;
    use super::TemperatureSource;
    use crate::buffer::ColorBuffer;
    use crate::control::Controllable;
    use crate::error::ConfigurationError;
    use crate::geometry::Grid;
    use crate::geometry::RowCol;
    use crate::source::Source;
    use crate::weather::WeatherError;
    use crate::weather::WeatherProvider;

    /// Answers with the queued replies, then with the last temperature.
    #[derive(Default)]
    struct Scripted {
        replies: RefCell<VecDeque<Result<i32, WeatherError>>>,
        locations: RefCell<Vec<String>>,
        delay: Option<Duration>,
        calls: Cell<usize>,
    }

    impl Scripted {
        fn replying<I>(replies: I) -> Self
        where
            I: IntoIterator<Item = Result<i32, WeatherError>>,
        {
            Self {
                replies: RefCell::new(replies.into_iter().collect()),
                ..Self::default()
            }
        }
    }

    impl WeatherProvider for Rc<Scripted> {
        async fn temperature(&self, location: &str) -> Result<i32, WeatherError> {
            self.calls.set(self.calls.get() + 1);
            self.locations.borrow_mut().push(location.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.replies.borrow_mut().pop_front().unwrap_or(Ok(20))
        }
    }

    fn source(provider: Scripted) -> TemperatureSource<Rc<Scripted>> {
        TemperatureSource::new(
            Grid::new(12, 12),
            Rc::new(provider),
            FetchPolicy::default(),
            TemperatureSettings::default(),
        )
        .unwrap()
    }

    fn art(buffer: &ColorBuffer, on: RGB8) -> String {
        let grid = buffer.grid();
        (0..grid.height())
            .map(|row| {
                (0..grid.width())
                    .map(|column| {
                        let index = grid.to_pixel_index(RowCol::new(row, column)).unwrap();
                        if buffer.get(index) == Some(on) { '#' } else { '.' }
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn now() -> time::OffsetDateTime {
        time::macros::datetime!(2024-01-03 10:35:00 UTC)
    }

    #[test]
    fn test_twenty_three() {
        let source = source(Scripted::default());
        insta::assert_snapshot!(art(&source.compose(23), RGB8::new(255, 255, 255)), @r"
        ............
        ............
        ####.####.##
        ...#....#.##
        ...#....#...
        ####.####...
        #.......#...
        #.......#...
        ####.####...
        ............
        ............
        ............
        ");
    }

    #[test]
    fn test_minus_one() {
        let source = source(Scripted::default());
        insta::assert_snapshot!(art(&source.compose(-1), RGB8::new(255, 255, 255)), @r"
        ............
        ............
        .....#.##...
        .....#.##...
        .....#......
        ####.#......
        ####.#......
        .....#......
        .....#......
        ............
        ............
        ............
        ");
    }

    #[test]
    fn test_single_digit() {
        let source = source(Scripted::default());
        insta::assert_snapshot!(art(&source.compose(7), RGB8::new(255, 255, 255)), @r"
        ............
        ............
        ...####.##..
        ......#.##..
        ......#.....
        ......#.....
        ......#.....
        ......#.....
        ......#.....
        ............
        ............
        ............
        ");
    }

    #[test]
    fn test_out_of_range_readings_are_clamped() {
        let source = source(Scripted::default());
        assert_eq!(source.compose(-15), source.compose(-9));
        assert_eq!(source.compose(150), source.compose(99));
    }

    #[test]
    fn test_rainbow_colours_by_column() {
        let mut source = source(Scripted::default());
        source.handle_message("rainbow", "on").unwrap();
        let buffer = source.compose(23);
        let grid = Grid::new(12, 12);
        for (row, column) in [(2, 0), (2, 5), (2, 11)] {
            let index = grid.to_pixel_index(RowCol::new(row, column)).unwrap();
            assert_eq!(buffer.get(index), Some(crate::color::RAINBOW[column]));
        }
        let unlit = grid.to_pixel_index(RowCol::new(0, 0)).unwrap();
        assert_eq!(buffer.get(unlit), Some(RGB8::new(0, 0, 0)));
    }

    #[test]
    fn test_grid_checks() {
        let result = TemperatureSource::new(
            Grid::new(12, 8),
            Rc::new(Scripted::default()),
            FetchPolicy::default(),
            TemperatureSettings::default(),
        );
        assert!(matches!(result, Err(ConfigurationError::GridTooSmall { .. })));

        let result = TemperatureSource::new(
            Grid::new(16, 16),
            Rc::new(Scripted::default()),
            FetchPolicy::default(),
            TemperatureSettings::default(),
        );
        assert!(matches!(
            result,
            Err(ConfigurationError::PaletteWidthMismatch { palette: 12, width: 16 })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_shows_fetched_temperature() {
        let mut source = source(Scripted::replying([Ok(23)]));
        assert_eq!(source.current, super::SENTINEL);

        source.refresh().await;
        assert_eq!(source.current, 23);
        assert_eq!(source.render(now()), source.compose(23));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_shows_sentinel_and_retries() {
        let mut source = source(Scripted::replying([Ok(23), Err(WeatherError::Unauthorized), Ok(5)]));

        source.refresh().await;
        assert_eq!(source.current, 23);

        tokio::time::advance(Duration::from_secs(61)).await;
        source.refresh().await;
        assert_eq!(source.current, super::SENTINEL);

        // no waiting after a failure
        source.refresh().await;
        assert_eq!(source.current, 5);
        assert_eq!(source.provider.calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_provider_times_out() {
        let provider = Scripted {
            delay: Some(Duration::from_secs(30)),
            ..Scripted::replying([Ok(23)])
        };
        let mut source = source(provider);

        let start = tokio::time::Instant::now();
        source.refresh().await;
        assert_eq!(start.elapsed(), Duration::from_millis(250));
        assert_eq!(source.current, super::SENTINEL);

        // the request gives up after the policy timeout, whichever frame polls it
        tokio::time::sleep(Duration::from_secs(2)).await;
        let start = tokio::time::Instant::now();
        source.refresh().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(source.current, super::SENTINEL);
        assert!(source.in_flight.is_none());

        source.refresh().await;
        assert_eq!(source.provider.calls.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_reading_arrives_on_a_later_frame() {
        let provider = Scripted {
            delay: Some(Duration::from_millis(1500)),
            ..Scripted::replying([Ok(23)])
        };
        let mut source = source(provider);

        source.refresh().await;
        assert_eq!(source.current, super::SENTINEL);
        assert_eq!(source.render(now()), source.compose(super::SENTINEL));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        source.refresh().await;
        assert_eq!(source.current, 23);
        assert_eq!(source.provider.calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_location_change_abandons_running_fetch() {
        let provider = Scripted {
            delay: Some(Duration::from_secs(1)),
            ..Scripted::replying([Ok(12), Ok(-4)])
        };
        let mut source = source(provider);

        source.refresh().await;
        assert!(source.in_flight.is_some());

        source.handle_message("location", "Oslo,NO").unwrap();
        assert!(source.in_flight.is_none());

        source.refresh().await;
        tokio::time::sleep(Duration::from_millis(900)).await;
        source.refresh().await;
        assert_eq!(source.current, 12);
        assert_eq!(
            *source.provider.locations.borrow(),
            vec![String::from("Paris,FR"), String::from("Oslo,NO")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_reading_is_reused() {
        let mut source = source(Scripted::replying([Ok(12), Ok(13)]));

        source.refresh().await;
        tokio::time::advance(Duration::from_secs(30)).await;
        source.refresh().await;
        assert_eq!(source.current, 12);
        assert_eq!(source.provider.calls.get(), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        source.refresh().await;
        assert_eq!(source.current, 13);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_location_is_reverted() {
        let mut source = source(Scripted::replying([
            Ok(12),
            Err(WeatherError::UnknownLocation(String::from("Atlantis"))),
        ]));
        source.refresh().await;

        source.handle_message("location", "Atlantis").unwrap();
        assert_eq!(source.settings.location, "Atlantis");
        assert_eq!(source.persisted()["location"], "Paris,FR");

        source.refresh().await;
        assert_eq!(source.settings.location, "Paris,FR");
        assert_eq!(source.current, super::SENTINEL);
        assert_eq!(
            *source.provider.locations.borrow(),
            vec![String::from("Paris,FR"), String::from("Atlantis")]
        );

        // the restored location is fetched again right away
        source.refresh().await;
        assert_eq!(source.current, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_location_is_confirmed() {
        let mut source = source(Scripted::replying([Ok(12), Ok(-4)]));
        source.refresh().await;

        source.handle_message("location", " Oslo,NO ").unwrap();
        source.refresh().await;

        assert_eq!(source.current, -4);
        assert_eq!(source.settings.location, "Oslo,NO");
        assert_eq!(source.persisted()["location"], "Oslo,NO");
    }

    #[test]
    fn test_invalid_messages_are_rejected() {
        let mut source = source(Scripted::default());
        let before = source.settings.clone();

        assert!(source.handle_message("on", "#12345").is_err());
        assert!(source.handle_message("rainbow", "perhaps").is_err());
        assert!(source.handle_message("location", "  ").is_err());
        assert!(source.handle_message("day", "#ffffff").is_err());
        assert_eq!(source.settings, before);
    }

    #[test]
    fn test_settings_from_section() {
        let section = crate::settings::Section::from([
            (String::from("on_rgb"), String::from("red")),
            (String::from("location"), String::from("Lyon,FR")),
        ]);
        let settings = TemperatureSettings::from_section(&section).unwrap();
        assert_eq!(settings.on, RGB8::new(255, 0, 0));
        assert_eq!(settings.location, "Lyon,FR");
        assert!(!settings.rainbow);

        insta::assert_json_snapshot!(settings.to_section(), @r###"
        {
          "location": "Lyon,FR",
          "off_rgb": "#000000",
          "on_rgb": "#ff0000",
          "rainbow": "false"
        }
        "###);
    }
}
