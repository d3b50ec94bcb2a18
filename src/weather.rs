use std::future::Future;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Location '{0}' is unknown to the weather service")]
    UnknownLocation(String),

    #[error("Weather service rejected the API key")]
    Unauthorized,

    #[error("Weather service did not answer in time")]
    Timeout,

    #[error("Weather service answered with status {0}")]
    UnexpectedStatus(reqwest::StatusCode),

    #[error("Request to weather service failed")]
    Transport(#[source] reqwest::Error),

    #[error("Invalid weather service URL")]
    Url(#[source] url::ParseError),
}

/// Source of the current outdoor temperature.
pub trait WeatherProvider {
    /// Current temperature at `location` in whole degrees Celsius.
    fn temperature(&self, location: &str) -> impl Future<Output = Result<i32, WeatherError>>;
}

pub const OPENWEATHERMAP_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, serde::Deserialize)]
struct CurrentWeather {
    main: Measurements,
}

#[derive(Debug, serde::Deserialize)]
struct Measurements {
    temp: f64,
}

/// Current weather endpoint of OpenWeatherMap.
#[derive(Debug, Clone)]
pub struct OpenWeatherMap {
    client: reqwest::Client,
    base_url: url::Url,
    api_key: String,
}

impl OpenWeatherMap {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self, WeatherError> {
        let base_url = url::Url::parse(base_url).map_err(WeatherError::Url)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(WeatherError::Transport)?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn request_url(&self, location: &str) -> url::Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("q", location)
            .append_pair("appid", &self.api_key)
            .append_pair("units", "metric");
        url
    }
}

fn round_celsius(weather: &CurrentWeather) -> i32 {
    // `as` saturates, which is fine for anything a thermometer reports
    weather.main.temp.round() as i32
}

impl WeatherProvider for OpenWeatherMap {
    async fn temperature(&self, location: &str) -> Result<i32, WeatherError> {
        tracing::debug!(?location, "Fetching current weather");

        let response = self
            .client
            .get(self.request_url(location))
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    WeatherError::Timeout
                } else {
                    WeatherError::Transport(error)
                }
            })?;

        match response.status() {
            status if status.is_success() => {}
            reqwest::StatusCode::NOT_FOUND => {
                return Err(WeatherError::UnknownLocation(location.to_string()))
            }
            reqwest::StatusCode::UNAUTHORIZED => return Err(WeatherError::Unauthorized),
            status => return Err(WeatherError::UnexpectedStatus(status)),
        }

        let weather = response
            .json::<CurrentWeather>()
            .await
            .map_err(WeatherError::Transport)?;

        let temperature = round_celsius(&weather);
        tracing::debug!(?location, temperature, "Received current weather");
        Ok(temperature)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::CurrentWeather;
    use super::OpenWeatherMap;
    use super::WeatherError;

    #[test]
    fn test_request_url() {
        let provider = OpenWeatherMap::new(
            super::OPENWEATHERMAP_URL,
            String::from("secret"),
            Duration::from_secs(2),
        )
        .unwrap();

        insta::assert_snapshot!(
            provider.request_url("Saint-Étienne,FR"),
            @"https://api.openweathermap.org/data/2.5/weather?q=Saint-%C3%89tienne%2CFR&appid=secret&units=metric"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let error = OpenWeatherMap::new("not a url", String::new(), Duration::from_secs(1)).unwrap_err();
        assert!(matches!(error, WeatherError::Url(_)));
    }

    #[test]
    fn test_rounding() {
        let body = r#"{"coord":{"lon":2.35,"lat":48.85},"main":{"temp":21.5,"humidity":40},"name":"Paris"}"#;
        let weather: CurrentWeather = serde_json::from_str(body).unwrap();
        assert_eq!(super::round_celsius(&weather), 22);

        let body = r#"{"main":{"temp":-0.4}}"#;
        let weather: CurrentWeather = serde_json::from_str(body).unwrap();
        assert_eq!(super::round_celsius(&weather), 0);

        let body = r#"{"main":{"temp":-3.6}}"#;
        let weather: CurrentWeather = serde_json::from_str(body).unwrap();
        assert_eq!(super::round_celsius(&weather), -4);
    }
}
