//! Weather lookups backed by an OpenWeatherMap-compatible API

pub mod format;
pub mod provider;
pub mod tools;

pub use provider::{OpenWeatherMapProvider, ProviderError, WeatherProvider, WeatherQuery};
pub use tools::{
    GET_FORECAST, GET_WEATHER_BY_CITY, GET_WEATHER_BY_COORDINATES, GetForecast, GetWeatherByCity,
    GetWeatherByCoordinates, weather_tools,
};
