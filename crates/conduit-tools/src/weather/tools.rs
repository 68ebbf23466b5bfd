//! Weather tools exposed by the worker

use std::sync::Arc;

use async_trait::async_trait;
use conduit_core::protocol::{Content, ToolParameter};
use serde_json::Value;
use tracing::{info, warn};

use super::format::{format_current, format_forecast};
use super::provider::{ProviderError, WeatherProvider, WeatherQuery};
use crate::tool::{Tool, ToolError, optional_i64, param, required_f64, required_str};

pub const GET_WEATHER_BY_CITY: &str = "get_weather_by_city";
pub const GET_WEATHER_BY_COORDINATES: &str = "get_weather_by_coordinates";
pub const GET_FORECAST: &str = "get_forecast";

pub const MIN_FORECAST_DAYS: i64 = 1;
pub const MAX_FORECAST_DAYS: i64 = 5;

fn unavailable(what: &str, err: &ProviderError) -> Vec<Content> {
    warn!("{} unavailable: {}", what, err);
    vec![Content::text(format!("{} data unavailable ({})", what, err))]
}

/// Current weather for a city
pub struct GetWeatherByCity {
    provider: Arc<dyn WeatherProvider>,
}

impl GetWeatherByCity {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for GetWeatherByCity {
    fn name(&self) -> &str {
        GET_WEATHER_BY_CITY
    }

    fn description(&self) -> &str {
        "Get the current weather for a city"
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![param(
            "city",
            "string",
            "City name, e.g. \"Beijing\", \"Taipei\", \"New York\"",
            true,
        )]
    }

    async fn execute(&self, arguments: &Value) -> Result<Vec<Content>, ToolError> {
        let city = required_str(arguments, "city")?;
        info!(city, "Current weather lookup");

        match self.provider.current(&WeatherQuery::City(city.to_string())).await {
            Ok(data) => Ok(vec![Content::text(format_current(&data))]),
            Err(e) => Ok(unavailable("Weather", &e)),
        }
    }
}

/// Current weather at a coordinate
pub struct GetWeatherByCoordinates {
    provider: Arc<dyn WeatherProvider>,
}

impl GetWeatherByCoordinates {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for GetWeatherByCoordinates {
    fn name(&self) -> &str {
        GET_WEATHER_BY_COORDINATES
    }

    fn description(&self) -> &str {
        "Get the current weather at a latitude/longitude"
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![
            param("latitude", "number", "Latitude in degrees, -90 to 90", true),
            param("longitude", "number", "Longitude in degrees, -180 to 180", true),
        ]
    }

    async fn execute(&self, arguments: &Value) -> Result<Vec<Content>, ToolError> {
        let latitude = required_f64(arguments, "latitude")?;
        let longitude = required_f64(arguments, "longitude")?;

        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ToolError::OutOfRange(format!(
                "Latitude must be between -90 and 90, got {}",
                latitude
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ToolError::OutOfRange(format!(
                "Longitude must be between -180 and 180, got {}",
                longitude
            )));
        }

        info!(latitude, longitude, "Coordinate weather lookup");
        let query = WeatherQuery::Coordinates {
            latitude,
            longitude,
        };
        match self.provider.current(&query).await {
            Ok(data) => Ok(vec![Content::text(format_current(&data))]),
            Err(e) => Ok(unavailable("Weather", &e)),
        }
    }
}

/// Multi-day forecast for a city
pub struct GetForecast {
    provider: Arc<dyn WeatherProvider>,
}

impl GetForecast {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for GetForecast {
    fn name(&self) -> &str {
        GET_FORECAST
    }

    fn description(&self) -> &str {
        "Get a daily weather forecast for a city"
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![
            param(
                "city",
                "string",
                "City name, e.g. \"Beijing\", \"Taipei\", \"New York\"",
                true,
            ),
            param("days", "number", "Number of days, 1 to 5 (default 5)", false),
        ]
    }

    async fn execute(&self, arguments: &Value) -> Result<Vec<Content>, ToolError> {
        let city = required_str(arguments, "city")?;
        let days = optional_i64(arguments, "days")?.unwrap_or(MAX_FORECAST_DAYS);

        if !(MIN_FORECAST_DAYS..=MAX_FORECAST_DAYS).contains(&days) {
            return Err(ToolError::OutOfRange(format!(
                "Forecast days must be between {} and {}",
                MIN_FORECAST_DAYS, MAX_FORECAST_DAYS
            )));
        }

        info!(city, days, "Forecast lookup");
        match self.provider.forecast(city, days as u32).await {
            Ok(data) => Ok(vec![Content::text(format_forecast(&data, days as usize))]),
            Err(e) => Ok(unavailable("Forecast", &e)),
        }
    }
}

/// The three weather tools sharing one provider
pub fn weather_tools(provider: Arc<dyn WeatherProvider>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(GetWeatherByCity::new(provider.clone())),
        Arc::new(GetWeatherByCoordinates::new(provider.clone())),
        Arc::new(GetForecast::new(provider)),
    ]
}
