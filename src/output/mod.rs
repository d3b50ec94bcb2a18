pub mod ddp;
pub mod terminal;

use rgb::RGB8;
use smart_leds_trait::SmartLedsWrite;

use crate::buffer::ColorBuffer;
use crate::control::Controllable;
use crate::control::ValidationError;
use crate::geometry::Grid;
use crate::settings::Section;

const SECTION: &str = "display";

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Buffer has {buffer} pixels, the display has {display}")]
    SizeMismatch { buffer: usize, display: usize },

    #[error("Writing to the LEDs failed")]
    Writing(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Something a finished frame can be shown on.
pub trait Output: Controllable {
    /// Replaces the frame shown by the next `paint`.
    fn write(&mut self, buffer: ColorBuffer) -> Result<(), OutputError>;

    /// Shows the last written frame, may be called repeatedly.
    fn paint(&mut self) -> Result<(), OutputError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySettings {
    /// In `0.0..=1.0`
    pub brightness: f32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self { brightness: 1.0 }
    }
}

impl DisplaySettings {
    pub fn from_section(section: &Section) -> Result<Self, ValidationError> {
        Ok(Self {
            brightness: crate::settings::read(
                section,
                SECTION,
                "brightness",
                Self::default().brightness,
                crate::control::parse_brightness,
            )?,
        })
    }

    pub fn to_section(&self) -> Section {
        Section::from([(String::from("brightness"), self.brightness.to_string())])
    }

    /// Brightness as the scale factor `smart_leds::brightness` expects.
    fn level(&self) -> u8 {
        (self.brightness.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

/// An LED matrix driven through a [`SmartLedsWrite`] implementation.
pub struct Display<W> {
    writer: W,
    buffer: ColorBuffer,
    settings: DisplaySettings,
}

impl<W> Display<W>
where
    W: SmartLedsWrite<Color = RGB8>,
    W::Error: std::error::Error + Send + Sync + 'static,
{
    pub fn new(writer: W, grid: Grid, settings: DisplaySettings) -> Self {
        Self {
            writer,
            buffer: ColorBuffer::filled(grid, RGB8::default()),
            settings,
        }
    }
}

impl<W> Controllable for Display<W>
where
    W: SmartLedsWrite<Color = RGB8>,
    W::Error: std::error::Error + Send + Sync + 'static,
{
    fn section(&self) -> &'static str {
        SECTION
    }

    fn topic_prefix(&self) -> &'static str {
        "display"
    }

    fn control_topics(&self) -> &'static [&'static str] {
        &["brightness"]
    }

    fn handle_message(&mut self, topic: &str, payload: &str) -> Result<(), ValidationError> {
        let next = match topic {
            "brightness" => DisplaySettings {
                brightness: crate::control::parse_brightness(payload)?,
            },
            other => return Err(ValidationError::UnknownTopic(other.to_string())),
        };

        tracing::info!(brightness = next.brightness, "Setting brightness");
        self.settings = next;
        Ok(())
    }

    fn persisted(&self) -> Section {
        self.settings.to_section()
    }
}

impl<W> Output for Display<W>
where
    W: SmartLedsWrite<Color = RGB8>,
    W::Error: std::error::Error + Send + Sync + 'static,
{
    fn write(&mut self, buffer: ColorBuffer) -> Result<(), OutputError> {
        if buffer.len() != self.buffer.len() {
            return Err(OutputError::SizeMismatch {
                buffer: buffer.len(),
                display: self.buffer.len(),
            });
        }

        self.buffer = buffer;
        Ok(())
    }

    fn paint(&mut self) -> Result<(), OutputError> {
        let pixels = self.buffer.pixels().iter().copied();
        self.writer
            .write(smart_leds::brightness(pixels, self.settings.level()))
            .map_err(|error| OutputError::Writing(Box::new(error)))
    }
}
