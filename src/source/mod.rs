pub mod clock;
pub mod glyphs;
pub mod temperature;

use std::future::Future;
use std::pin::Pin;

use crate::buffer::ColorBuffer;
use crate::control::Controllable;

/// Frames per second a source wants to be rendered at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate(u32);

impl FrameRate {
    pub const fn hz(frames: u32) -> Self {
        Self(if frames == 0 { 1 } else { frames })
    }

    pub fn period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(1) / self.0
    }
}

pub type Refresh<'a> = Pin<Box<dyn Future<Output = ()> + 'a>>;

/// Something that can own the display for a while.
pub trait Source: Controllable {
    fn name(&self) -> &'static str;

    fn frame_rate(&self) -> FrameRate;

    /// Fetches external data needed by the next `render`.
    ///
    /// Must finish well within one frame period.
    fn refresh(&mut self) -> Refresh<'_> {
        Box::pin(std::future::ready(()))
    }

    fn render(&mut self, now: time::OffsetDateTime) -> ColorBuffer;
}
