//! Printed words of the letter matrix and the phrases built from them.

use std::collections::BTreeMap;

use crate::error::ConfigurationError;
use crate::geometry::Grid;
use crate::geometry::PixelIndex;

/// The 12x12 French front plate.
pub const FRENCH: &str = include_str!("../layouts/french.json");

#[derive(Debug, serde::Deserialize)]
struct WordEntry {
    word: String,
    index: PixelIndex,
}

type Description = BTreeMap<String, BTreeMap<String, WordEntry>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    /// Pixels of the word in reading order, left to right.
    pub positions: Vec<PixelIndex>,
}

#[derive(Debug, Clone)]
pub struct WordLayout {
    grid: Grid,
    words: BTreeMap<String, BTreeMap<String, Word>>,
}

impl WordLayout {
    pub fn parse(grid: Grid, description: &str) -> Result<Self, ConfigurationError> {
        let description: Description =
            serde_json::from_str(description).map_err(ConfigurationError::ParsingLayout)?;

        let words = description
            .into_iter()
            .map(|(category, entries)| {
                let entries = entries
                    .into_iter()
                    .map(|(label, entry)| Ok((label, expand(&grid, entry)?)))
                    .collect::<Result<BTreeMap<_, _>, ConfigurationError>>()?;
                Ok((category, entries))
            })
            .collect::<Result<BTreeMap<_, _>, ConfigurationError>>()?;

        Ok(Self { grid, words })
    }

    pub async fn load(grid: Grid, path: &camino::Utf8Path) -> Result<Self, ConfigurationError> {
        let description = tokio::fs::read_to_string(path).await.map_err(|source| {
            ConfigurationError::ReadingLayout {
                path: path.to_path_buf(),
                source,
            }
        })?;

        Self::parse(grid, &description)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn word(&self, category: &str, label: &str) -> Result<&Word, ConfigurationError> {
        self.words
            .get(category)
            .and_then(|entries| entries.get(label))
            .ok_or_else(|| ConfigurationError::UnknownLabel {
                category: category.to_string(),
                label: label.to_string(),
            })
    }

    pub fn lookup(&self, category: &str, label: &str) -> Result<&[PixelIndex], ConfigurationError> {
        self.word(category, label).map(|word| word.positions.as_slice())
    }

    /// Printed letter of every pixel, indexed in wiring order.
    pub fn letters(&self) -> Vec<Option<char>> {
        let mut letters = vec![None; self.grid.number_of_pixels()];

        for word in self.words.values().flat_map(BTreeMap::values) {
            for (letter, index) in word.text.chars().zip(word.positions.iter()) {
                letters[*index] = Some(letter);
            }
        }

        letters
    }
}

fn expand(grid: &Grid, entry: WordEntry) -> Result<Word, ConfigurationError> {
    let len = entry.word.chars().count();

    if entry.index + len > grid.number_of_pixels() {
        return Err(ConfigurationError::WordOutOfBounds {
            word: entry.word,
            index: entry.index,
            number_of_pixels: grid.number_of_pixels(),
        });
    }

    if len > 0 && entry.index / grid.width() != (entry.index + len - 1) / grid.width() {
        return Err(ConfigurationError::WordWrapsRow {
            word: entry.word,
            index: entry.index,
        });
    }

    let mut positions = (entry.index..entry.index + len)
        .map(|index| Ok((grid.to_row_col(index)?.column, index)))
        .collect::<Result<Vec<_>, ConfigurationError>>()?;
    positions.sort_unstable();

    Ok(Word {
        text: entry.word,
        positions: positions.into_iter().map(|(_, index)| index).collect(),
    })
}

/// Word combinations the clock face lights, precomputed once per layout.
#[derive(Debug, Clone)]
pub struct ClockPhrases {
    pub prefix: Vec<PixelIndex>,
    /// One entry per five minute bucket.
    pub minutes: Vec<Vec<PixelIndex>>,
    /// Entry `k` lights the first `k` minute dots.
    pub extra_minutes: Vec<Vec<PixelIndex>>,
    /// One entry per hour of the day, 0 is midnight.
    pub hours: Vec<Vec<PixelIndex>>,
    /// Monday first.
    pub weekdays: Vec<Vec<PixelIndex>>,
    /// The four minute dots, first dot first.
    pub minute_dots: Vec<Vec<PixelIndex>>,
}

const HOUR_WORDS: [&str; 12] = [
    "midnight", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven",
];

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

const MINUTE_DOTS: [&str; 4] = ["one", "two", "three", "four"];

impl ClockPhrases {
    pub fn from_layout(layout: &WordLayout) -> Result<Self, ConfigurationError> {
        let phrase = |category: &str, labels: &[&str]| -> Result<Vec<PixelIndex>, ConfigurationError> {
            labels.iter().try_fold(Vec::new(), |mut acc, label| {
                acc.extend_from_slice(layout.lookup(category, label)?);
                Ok(acc)
            })
        };
        let minutes = |labels: &[&str]| phrase("minutes", labels);

        let minute_phrases = vec![
            minutes(&["oclock"])?,
            minutes(&["five"])?,
            minutes(&["ten"])?,
            minutes(&["and", "quarter"])?,
            minutes(&["twenty"])?,
            minutes(&["twenty", "five"])?,
            minutes(&["and", "half"])?,
            minutes(&["to", "twenty", "five"])?,
            minutes(&["to", "twenty"])?,
            minutes(&["to", "the", "quarter"])?,
            minutes(&["to", "ten"])?,
            minutes(&["to", "five"])?,
        ];

        let minute_dots = MINUTE_DOTS
            .iter()
            .map(|label| minutes(&[*label]))
            .collect::<Result<Vec<_>, _>>()?;

        let extra_minutes = (0..=MINUTE_DOTS.len())
            .map(|count| minutes(&MINUTE_DOTS[..count]))
            .collect::<Result<Vec<_>, _>>()?;

        let twelve_hours = HOUR_WORDS
            .iter()
            .enumerate()
            .map(|(hour, word)| match hour {
                0 => phrase("hours", &[*word]),
                1 => phrase("hours", &[*word, "hour"]),
                _ => phrase("hours", &[*word, "hours"]),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut hours = twelve_hours.clone();
        hours.push(phrase("hours", &["midday"])?);
        hours.extend(twelve_hours.into_iter().skip(1));

        let weekdays = WEEKDAYS
            .iter()
            .map(|day| phrase("day", &[*day]))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            prefix: phrase("prefix", &["it", "is"])?,
            minutes: minute_phrases,
            extra_minutes,
            hours,
            weekdays,
            minute_dots,
        })
    }
}
