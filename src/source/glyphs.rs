//! Pixel font for the temperature display.
//!
//! Glyphs are drawn in a four column wide cell starting at column 1, the
//! placement shifts them horizontally depending on the reading.

use crate::geometry::Grid;
use crate::geometry::PixelSet;
use crate::geometry::RowCol;

/// Lowest reading that can be shown, anything colder is clamped.
pub const MIN_TEMPERATURE: i32 = -9;

/// Highest reading that can be shown, anything warmer is clamped.
pub const MAX_TEMPERATURE: i32 = 99;

/// Smallest grid every placement fits on.
pub const MIN_WIDTH: usize = 12;
pub const MIN_HEIGHT: usize = 9;

type Shape = &'static [(usize, usize)];

#[rustfmt::skip]
const DIGITS: [Shape; 10] = [
    &[
        (2, 1), (2, 2), (2, 3), (2, 4),
        (3, 1), (3, 4),
        (4, 1), (4, 4),
        (5, 1), (5, 4),
        (6, 1), (6, 4),
        (7, 1), (7, 4),
        (8, 1), (8, 2), (8, 3), (8, 4),
    ],
    &[(2, 4), (3, 4), (4, 4), (5, 4), (6, 4), (7, 4), (8, 4)],
    &[
        (2, 1), (2, 2), (2, 3), (2, 4),
        (3, 4),
        (4, 4),
        (5, 1), (5, 2), (5, 3), (5, 4),
        (6, 1),
        (7, 1),
        (8, 1), (8, 2), (8, 3), (8, 4),
    ],
    &[
        (2, 1), (2, 2), (2, 3), (2, 4),
        (3, 4),
        (4, 4),
        (5, 1), (5, 2), (5, 3), (5, 4),
        (6, 4),
        (7, 4),
        (8, 1), (8, 2), (8, 3), (8, 4),
    ],
    &[
        (2, 1), (2, 4),
        (3, 1), (3, 4),
        (4, 1), (4, 4),
        (5, 1), (5, 2), (5, 3), (5, 4),
        (6, 4),
        (7, 4),
        (8, 4),
    ],
    &[
        (2, 1), (2, 2), (2, 3), (2, 4),
        (3, 1),
        (4, 1),
        (5, 1), (5, 2), (5, 3), (5, 4),
        (6, 4),
        (7, 4),
        (8, 1), (8, 2), (8, 3), (8, 4),
    ],
    &[
        (2, 1), (2, 2), (2, 3), (2, 4),
        (3, 1),
        (4, 1),
        (5, 1), (5, 2), (5, 3), (5, 4),
        (6, 1), (6, 4),
        (7, 1), (7, 4),
        (8, 1), (8, 2), (8, 3), (8, 4),
    ],
    &[
        (2, 1), (2, 2), (2, 3), (2, 4),
        (3, 4),
        (4, 4),
        (5, 4),
        (6, 4),
        (7, 4),
        (8, 4),
    ],
    &[
        (2, 1), (2, 2), (2, 3), (2, 4),
        (3, 1), (3, 4),
        (4, 1), (4, 4),
        (5, 1), (5, 2), (5, 3), (5, 4),
        (6, 1), (6, 4),
        (7, 1), (7, 4),
        (8, 1), (8, 2), (8, 3), (8, 4),
    ],
    &[
        (2, 1), (2, 2), (2, 3), (2, 4),
        (3, 1), (3, 4),
        (4, 1), (4, 4),
        (5, 1), (5, 2), (5, 3), (5, 4),
        (6, 4),
        (7, 4),
        (8, 4),
    ],
];

#[rustfmt::skip]
const MINUS: Shape = &[
    (5, 1), (5, 2), (5, 3), (5, 4),
    (6, 1), (6, 2), (6, 3), (6, 4),
];

const DEGREE: Shape = &[(2, 7), (2, 8), (3, 7), (3, 8)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    Digit(u8),
    Minus,
    Degree,
}

impl Glyph {
    fn shape(&self) -> Shape {
        match self {
            Glyph::Digit(digit) => DIGITS[usize::from(*digit % 10)],
            Glyph::Minus => MINUS,
            Glyph::Degree => DEGREE,
        }
    }
}

/// A glyph shifted by `offset` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub glyph: Glyph,
    pub offset: isize,
}

impl Placement {
    const fn new(glyph: Glyph, offset: isize) -> Self {
        Self { glyph, offset }
    }

    /// Raster positions covered by this placement, `None` if one would be left of column 0.
    pub fn positions(&self) -> Option<Vec<RowCol>> {
        self.glyph
            .shape()
            .iter()
            .map(|(row, column)| {
                column
                    .checked_add_signed(self.offset)
                    .map(|column| RowCol::new(*row, column))
            })
            .collect()
    }
}

pub fn clamp(temperature: i32) -> i32 {
    temperature.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
}

/// Digit glyph for `digit`, which has to be in `0..10`.
fn digit(digit: i32) -> Glyph {
    Glyph::Digit(u8::try_from(digit.rem_euclid(10)).unwrap_or(0))
}

/// How to draw `temperature`, after clamping it to the displayable range.
///
/// A "1" is narrow, so whatever follows it moves three columns to the left.
pub fn placements(temperature: i32) -> Vec<Placement> {
    let temperature = clamp(temperature);

    if (0..10).contains(&temperature) {
        let (offset, degree) = if temperature == 1 { (1, 0) } else { (2, 1) };
        return vec![
            Placement::new(digit(temperature), offset),
            Placement::new(Glyph::Degree, degree),
        ];
    }

    let (first, second) = if temperature < 0 {
        (Glyph::Minus, -temperature)
    } else {
        (digit(temperature / 10), temperature % 10)
    };
    let (offset, degree) = if second == 1 { (1, 0) } else { (4, 3) };

    vec![
        Placement::new(first, -1),
        Placement::new(digit(second), offset),
        Placement::new(Glyph::Degree, degree),
    ]
}

/// Pixels lit for `temperature` on `grid`.
pub fn render(grid: &Grid, temperature: i32) -> Result<PixelSet, crate::error::ConfigurationError> {
    let mut set = PixelSet::empty(grid);
    for placement in placements(temperature) {
        let positions = placement.positions().ok_or(crate::error::ConfigurationError::GridTooSmall {
            width: grid.width(),
            height: grid.height(),
            min_width: MIN_WIDTH,
            min_height: MIN_HEIGHT,
        })?;

        for position in positions {
            set.insert(grid.to_pixel_index(position)?)?;
        }
    }
    Ok(set)
}
