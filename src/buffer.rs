use rgb::RGB8;

use crate::geometry::Grid;
use crate::geometry::PixelIndex;

/// One frame, one colour per pixel in wiring order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorBuffer {
    grid: Grid,
    pixels: Vec<RGB8>,
}

impl ColorBuffer {
    pub fn filled(grid: Grid, color: RGB8) -> Self {
        Self {
            grid,
            pixels: vec![color; grid.number_of_pixels()],
        }
    }

    /// Builds a buffer by asking `color_of` for every pixel in wiring order.
    pub fn from_fn<F>(grid: Grid, color_of: F) -> Self
    where
        F: FnMut(PixelIndex) -> RGB8,
    {
        Self {
            grid,
            pixels: (0..grid.number_of_pixels()).map(color_of).collect(),
        }
    }

    #[cfg(test)]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[cfg(test)]
    pub fn get(&self, index: PixelIndex) -> Option<RGB8> {
        self.pixels.get(index).copied()
    }

    pub fn pixels(&self) -> &[RGB8] {
        &self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }
}
