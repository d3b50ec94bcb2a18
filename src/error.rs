#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Setting up error reporting failed")]
    InstallingColorEyre(#[source] color_eyre::Report),

    #[error("Setting up logging failed")]
    Logging(#[source] tracing::subscriber::SetGlobalDefaultError),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Settings(#[from] crate::settings::SettingsError),

    #[error("DDP error")]
    Ddp(#[from] ddp_rs::error::DDPError),

    #[error("Error getting local time offset")]
    TimeOffset(#[source] time::error::IndeterminateOffset),

    #[error("Failed to bind UDP socket")]
    UDPBind(#[source] std::io::Error),

    #[error("Failed to set up weather client")]
    Weather(#[source] crate::weather::WeatherError),
}

/// Inconsistency between the layout, the grid and the renderers, detected at start.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Failed to read layout from '{path}'")]
    ReadingLayout {
        path: camino::Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse layout description")]
    ParsingLayout(#[source] serde_json::Error),

    #[error("Layout has no entry '{label}' in category '{category}'")]
    UnknownLabel { category: String, label: String },

    #[error("Word '{word}' at index {index} does not fit into {number_of_pixels} pixels")]
    WordOutOfBounds {
        word: String,
        index: usize,
        number_of_pixels: usize,
    },

    #[error("Word '{word}' at index {index} wraps around the end of a wired row")]
    WordWrapsRow { word: String, index: usize },

    #[error("Rainbow palette has {palette} colours but the grid is {width} columns wide")]
    PaletteWidthMismatch { palette: usize, width: usize },

    #[error("Grid {width}x{height} is too small for the temperature glyphs (need {min_width}x{min_height})")]
    GridTooSmall {
        width: usize,
        height: usize,
        min_width: usize,
        min_height: usize,
    },

    #[error("Temperature display is enabled but no [weather] section is configured")]
    MissingWeather,

    #[error(transparent)]
    Geometry(#[from] crate::geometry::IndexOutOfRange),
}

#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    #[error("Failed to subscribe")]
    Subscribing(#[source] rumqttc::v5::ClientError),
}
