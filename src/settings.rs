//! Runtime settings persisted between restarts.
//!
//! The file is a toml document of string values grouped by section:
//!
//! ```toml
//! [display]
//! brightness = "0.6"
//!
//! [clock]
//! on_rgb = "#ffffff"
//! rainbow = "false"
//! ```
//!
//! It is read once at start and rewritten after every accepted control message.

use std::collections::BTreeMap;

use crate::control::ValidationError;

pub type Section = BTreeMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings from '{path}'")]
    ReadingFile {
        path: camino::Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write settings to '{path}'")]
    WritingFile {
        path: camino::Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings")]
    Parsing(#[source] toml::de::Error),

    #[error("Failed to serialize settings")]
    Serializing(#[source] toml::ser::Error),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Default)]
pub struct SettingsStore {
    path: Option<camino::Utf8PathBuf>,
    sections: BTreeMap<String, Section>,
}

impl SettingsStore {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the settings at `path`, a missing file yields the defaults.
    pub async fn load(path: &camino::Utf8Path) -> Result<Self, SettingsError> {
        let sections = match tokio::fs::read_to_string(path).await {
            Ok(content) => toml::from_str(&content).map_err(SettingsError::Parsing)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(%path, "No settings file yet, using defaults");
                BTreeMap::new()
            }
            Err(source) => {
                return Err(SettingsError::ReadingFile {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            sections,
        })
    }

    pub fn section(&self, name: &str) -> Section {
        self.sections.get(name).cloned().unwrap_or_default()
    }

    /// Writes the keys of `section` over the stored ones, keys only the store knows are kept.
    ///
    /// Returns whether the stored section changed.
    pub fn merge_section(&mut self, name: &str, section: Section) -> bool {
        let stored = self.sections.entry(name.to_string()).or_default();
        let before = stored.clone();
        stored.extend(section);
        *stored != before
    }

    pub fn to_toml(&self) -> Result<String, SettingsError> {
        toml::to_string(&self.sections).map_err(SettingsError::Serializing)
    }

    pub async fn save(&self) -> Result<(), SettingsError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };

        let content = self.to_toml()?;
        tokio::fs::write(path, content)
            .await
            .map_err(|source| SettingsError::WritingFile {
                path: path.clone(),
                source,
            })
    }
}

/// Reads `key` from a section, falling back to `default` when it is absent.
pub fn read<T, F>(
    section: &Section,
    section_name: &'static str,
    key: &'static str,
    default: T,
    parse: F,
) -> Result<T, ValidationError>
where
    F: FnOnce(&str) -> Result<T, ValidationError>,
{
    match section.get(key) {
        None => Ok(default),
        Some(value) => parse(value).map_err(|source| ValidationError::Setting {
            section: section_name,
            key,
            source: Box::new(source),
        }),
    }
}
