//! Draws the letter matrix in a terminal, for running without LEDs attached.

use crossterm::cursor::MoveTo;
use crossterm::style::Color;
use crossterm::style::Print;
use crossterm::style::ResetColor;
use crossterm::style::SetForegroundColor;
use crossterm::terminal::Clear;
use crossterm::terminal::ClearType;
use rgb::RGB8;

use crate::geometry::Grid;

const FILLER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub struct TerminalWriter<O = std::io::Stdout> {
    grid: Grid,
    /// Letter printed on every pixel, in wiring order.
    letters: Vec<char>,
    out: O,
    cleared: bool,
}

impl TerminalWriter {
    pub fn stdout(grid: Grid, letters: Vec<Option<char>>, fill_empty: bool) -> Self {
        Self::new(grid, letters, fill_empty, std::io::stdout())
    }
}

impl<O> TerminalWriter<O>
where
    O: std::io::Write,
{
    /// Pixels without a letter show a dot, or a letter of the alphabet with `fill_empty`.
    pub fn new(grid: Grid, letters: Vec<Option<char>>, fill_empty: bool, out: O) -> Self {
        let letters = (0..grid.number_of_pixels())
            .map(|index| match letters.get(index).copied().flatten() {
                Some(letter) => letter,
                None if fill_empty => char::from(FILLER[index % FILLER.len()]),
                None => '·',
            })
            .collect();

        Self {
            grid,
            letters,
            out,
            cleared: false,
        }
    }

    fn draw(&mut self, pixels: &[RGB8]) -> std::io::Result<()> {
        if !self.cleared {
            crossterm::queue!(self.out, Clear(ClearType::All))?;
            self.cleared = true;
        }

        let grid = self.grid;
        for (index, position) in grid.pixels() {
            let color = pixels.get(index).copied().unwrap_or_default();

            crossterm::queue!(
                self.out,
                MoveTo(cell(position.column * 2), cell(position.row)),
                SetForegroundColor(Color::Rgb {
                    r: color.r,
                    g: color.g,
                    b: color.b,
                }),
                Print(self.letters[index]),
            )?;
        }

        crossterm::queue!(self.out, ResetColor, MoveTo(0, cell(self.grid.height())))?;
        self.out.flush()
    }
}

fn cell(coordinate: usize) -> u16 {
    u16::try_from(coordinate).unwrap_or(u16::MAX)
}

impl<O> smart_leds_trait::SmartLedsWrite for TerminalWriter<O>
where
    O: std::io::Write,
{
    type Error = std::io::Error;
    type Color = RGB8;

    fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        let pixels = iterator.into_iter().map(Into::into).collect::<Vec<RGB8>>();
        self.draw(&pixels)
    }
}

#[cfg(test)]
mod tests {
    use rgb::RGB8;
    use smart_leds_trait::SmartLedsWrite;

    use super::TerminalWriter;
    use crate::geometry::Grid;

    #[test]
    fn test_letters_in_their_colour() {
        let grid = Grid::new(2, 1);
        // index 0 is the bottom right pixel
        let letters = vec![Some('B'), Some('A')];
        let mut writer = TerminalWriter::new(grid, letters, false, Vec::new());
        writer
            .write([RGB8::new(0, 0, 255), RGB8::new(255, 0, 0)])
            .unwrap();

        let output = String::from_utf8(writer.out).unwrap();
        assert!(output.contains("\u{1b}[1;1H\u{1b}[38;2;255;0;0mA"), "{output:?}");
        assert!(output.contains("\u{1b}[1;3H\u{1b}[38;2;0;0;255mB"), "{output:?}");
    }

    #[test]
    fn test_empty_cells() {
        let grid = Grid::new(2, 1);
        let dotted = TerminalWriter::new(grid, vec![None, Some('X')], false, Vec::new());
        assert_eq!(dotted.letters, vec!['·', 'X']);

        let filled = TerminalWriter::new(grid, vec![None, None], true, Vec::new());
        assert_eq!(filled.letters, vec!['A', 'B']);
    }
}
