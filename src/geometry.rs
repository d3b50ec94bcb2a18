//! Grid geometry of the serpentine-wired letter matrix.
//!
//! The strip enters the matrix at the bottom right corner. Counting rows from
//! the bottom (`height - 1 - row`), even rows run from the highest column to
//! the lowest in wiring order and odd rows run from the lowest column to the
//! highest. Every other module converts between raster and wiring order
//! through [`Grid`] only.

/// Position of a LED in wiring order.
pub type PixelIndex = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowCol {
    pub row: usize,
    pub column: usize,
}

impl RowCol {
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexOutOfRange {
    #[error("Position ({row}, {column}) is outside of a {width}x{height} grid")]
    Position {
        row: usize,
        column: usize,
        width: usize,
        height: usize,
    },

    #[error("Pixel index {index} is outside of a grid with {number_of_pixels} pixels")]
    Index {
        index: PixelIndex,
        number_of_pixels: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
}

impl Grid {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    #[inline]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub const fn number_of_pixels(&self) -> usize {
        self.width * self.height
    }

    /// Whether the row at `row` runs from high to low columns in wiring order.
    #[inline]
    fn runs_backwards(&self, row: usize) -> bool {
        (self.height - 1 - row) % 2 == 0
    }

    pub fn to_pixel_index(&self, position: RowCol) -> Result<PixelIndex, IndexOutOfRange> {
        if position.row >= self.height || position.column >= self.width {
            return Err(IndexOutOfRange::Position {
                row: position.row,
                column: position.column,
                width: self.width,
                height: self.height,
            });
        }

        Ok(self.pixel_index_unchecked(position))
    }

    pub fn to_row_col(&self, index: PixelIndex) -> Result<RowCol, IndexOutOfRange> {
        if index >= self.number_of_pixels() {
            return Err(IndexOutOfRange::Index {
                index,
                number_of_pixels: self.number_of_pixels(),
            });
        }

        Ok(self.row_col_unchecked(index))
    }

    fn pixel_index_unchecked(&self, position: RowCol) -> PixelIndex {
        let wiring_row = self.height - 1 - position.row;
        let offset = if self.runs_backwards(position.row) {
            self.width - 1 - position.column
        } else {
            position.column
        };

        wiring_row * self.width + offset
    }

    fn row_col_unchecked(&self, index: PixelIndex) -> RowCol {
        let row = self.height - 1 - index / self.width;
        let offset = index % self.width;
        let column = if self.runs_backwards(row) {
            self.width - 1 - offset
        } else {
            offset
        };

        RowCol { row, column }
    }

    /// All pixels in wiring order, together with their raster position.
    pub fn pixels(&self) -> impl Iterator<Item = (PixelIndex, RowCol)> + '_ {
        (0..self.number_of_pixels()).map(|index| (index, self.row_col_unchecked(index)))
    }
}

/// Membership set over the pixels of one grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelSet {
    bits: Vec<bool>,
}

impl PixelSet {
    pub fn empty(grid: &Grid) -> Self {
        Self {
            bits: vec![false; grid.number_of_pixels()],
        }
    }

    pub fn insert(&mut self, index: PixelIndex) -> Result<(), IndexOutOfRange> {
        let number_of_pixels = self.bits.len();
        let bit = self.bits.get_mut(index).ok_or(IndexOutOfRange::Index {
            index,
            number_of_pixels,
        })?;
        *bit = true;
        Ok(())
    }

    pub fn extend<I>(&mut self, indexes: I) -> Result<(), IndexOutOfRange>
    where
        I: IntoIterator<Item = PixelIndex>,
    {
        indexes.into_iter().try_for_each(|index| self.insert(index))
    }

    /// Adds every member of `other`, which must belong to the same grid.
    pub fn union_with(&mut self, other: &PixelSet) {
        for (bit, other) in self.bits.iter_mut().zip(other.bits.iter()) {
            *bit |= *other;
        }
    }

    #[inline]
    pub fn contains(&self, index: PixelIndex) -> bool {
        self.bits.get(index).copied().unwrap_or(false)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.bits.iter().filter(|bit| **bit).count()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = PixelIndex> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, bit)| **bit)
            .map(|(index, _)| index)
    }
}
