//! Weather data source

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::format::{CurrentWeather, ForecastResponse};
use crate::settings::WorkerSettings;

/// Forecast slots per day (three-hour steps)
pub const SLOTS_PER_DAY: u32 = 8;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Request(String),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("unexpected payload: {0}")]
    Decode(String),
}

/// What to look up current conditions for
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherQuery {
    City(String),
    Coordinates { latitude: f64, longitude: f64 },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Current conditions
    async fn current(&self, query: &WeatherQuery) -> Result<CurrentWeather, ProviderError>;

    /// Three-hour forecast slots covering `days` days
    async fn forecast(&self, city: &str, days: u32) -> Result<ForecastResponse, ProviderError>;
}

/// OpenWeatherMap-compatible HTTP provider
pub struct OpenWeatherMapProvider {
    client: reqwest::Client,
    settings: WorkerSettings,
}

impl OpenWeatherMapProvider {
    pub fn new(settings: WorkerSettings) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ProviderError::Request(e.to_string()))?;
        Ok(Self { client, settings })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        if !self.settings.has_api_key() {
            return Err(ProviderError::MissingApiKey);
        }

        let url = format!("{}/{}", self.settings.api_base, path);
        debug!(url = %url, ?params, "Weather API request");

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[
                ("appid", self.settings.api_key.as_str()),
                ("units", "metric"),
                ("lang", self.settings.lang.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMapProvider {
    async fn current(&self, query: &WeatherQuery) -> Result<CurrentWeather, ProviderError> {
        let params = match query {
            WeatherQuery::City(city) => vec![("q", city.clone())],
            WeatherQuery::Coordinates {
                latitude,
                longitude,
            } => vec![("lat", latitude.to_string()), ("lon", longitude.to_string())],
        };
        self.fetch("weather", &params).await
    }

    async fn forecast(&self, city: &str, days: u32) -> Result<ForecastResponse, ProviderError> {
        let params = [
            ("q", city.to_string()),
            ("cnt", (days * SLOTS_PER_DAY).to_string()),
        ];
        self.fetch("forecast", &params).await
    }
}
