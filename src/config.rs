use std::time::Duration;

#[derive(Debug, serde::Deserialize)]
pub struct Config {
    pub display: DisplayConfig,

    #[serde(default)]
    pub temperature: TemperatureConfig,

    pub weather: Option<WeatherConfig>,

    pub mqtt: Option<MqttConfig>,
}

#[derive(Debug, serde::Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_grid_size")]
    pub width: usize,

    #[serde(default = "default_grid_size")]
    pub height: usize,

    /// Word layout description, the built-in french layout if not set
    pub layout: Option<camino::Utf8PathBuf>,

    /// Where runtime settings are persisted, kept in memory only if not set
    pub settings: Option<camino::Utf8PathBuf>,

    pub backend: Backend,
}

fn default_grid_size() -> usize {
    12
}

#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Backend {
    Ddp {
        host: std::net::IpAddr,
        port: u16,
        udp_port: u16,
    },

    Terminal {
        #[serde(default)]
        fill_empty: bool,
    },
}

#[derive(Debug, serde::Deserialize)]
pub struct TemperatureConfig {
    #[serde(default)]
    pub enable: bool,

    #[serde(with = "humantime_serde", default = "default_repeat_interval")]
    pub repeat_interval: Duration,

    #[serde(with = "humantime_serde", default = "default_duration")]
    pub duration: Duration,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            enable: false,
            repeat_interval: default_repeat_interval(),
            duration: default_duration(),
        }
    }
}

fn default_repeat_interval() -> Duration {
    Duration::from_secs(50)
}

fn default_duration() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, serde::Deserialize)]
pub struct WeatherConfig {
    pub api_key: String,

    #[serde(default = "default_weather_url")]
    pub base_url: String,

    #[serde(with = "humantime_serde", default = "default_weather_timeout")]
    pub timeout: Duration,

    #[serde(with = "humantime_serde", default = "default_refresh_interval")]
    pub refresh_interval: Duration,
}

fn default_weather_url() -> String {
    crate::weather::OPENWEATHERMAP_URL.to_string()
}

fn default_weather_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(60)
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MqttConfig {
    pub host: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    pub qos: Qos,
    pub client_name: String,

    #[serde(with = "humantime_serde")]
    pub keep_alive: Duration,

    pub topic_prefix: String,
}

fn default_mqtt_port() -> u16 {
    1883
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[expect(clippy::enum_variant_names, reason = "That's the names")]
pub enum Qos {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl From<Qos> for rumqttc::v5::mqttbytes::QoS {
    fn from(value: Qos) -> Self {
        match value {
            Qos::AtMostOnce => rumqttc::v5::mqttbytes::QoS::AtMostOnce,
            Qos::AtLeastOnce => rumqttc::v5::mqttbytes::QoS::AtLeastOnce,
            Qos::ExactlyOnce => rumqttc::v5::mqttbytes::QoS::ExactlyOnce,
        }
    }
}

impl Config {
    pub async fn load(path: &camino::Utf8Path) -> Result<Self, ConfigError> {
        let config_str =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::ReadingFile {
                    path: path.to_path_buf(),
                    source,
                })?;

        Self::parse(&config_str)
    }

    pub fn parse(config_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(config_str).map_err(ConfigError::ParsingConfig)
    }

    pub fn grid(&self) -> crate::geometry::Grid {
        crate::geometry::Grid::new(self.display.width, self.display.height)
    }

    pub fn schedule(&self) -> crate::scheduler::Schedule {
        crate::scheduler::Schedule {
            temperature_enabled: self.temperature.enable,
            repeat_interval: self.temperature.repeat_interval,
            duration: self.temperature.duration,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file from path '{}'", .path)]
    ReadingFile {
        path: camino::Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    ParsingConfig(#[from] toml::de::Error),
}
