//! Deterministic completion planning
//!
//! Decides, from a message and the tool results already attached to it,
//! whether to answer or to ask the controller for a tool call first.

use std::sync::LazyLock;

use conduit_core::protocol::{Completion, ToolCallResult};
use regex::Regex;
use serde_json::json;

use crate::weather::{GET_FORECAST, GET_WEATHER_BY_CITY, GET_WEATHER_BY_COORDINATES};

/// Reply used when nothing in the message maps to a tool
pub const HELP_TEXT: &str = "I can look up weather. Try \"weather in Taipei\", \
\"3 day forecast for Tokyo\" or a coordinate pair like \"25.03,121.56\".";

static COORDINATES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-?\d{1,3}(?:\.\d+)?)\s*,\s*(-?\d{1,3}(?:\.\d+)?)").expect("valid coordinate pattern")
});

static DAYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)[\s-]*days?\b").expect("valid days pattern"));

static WEATHER_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:weather|forecast)\s+(?:in|for|at)\s+([\p{L}][\p{L}\s.'-]*)")
        .expect("valid city pattern")
});

static FORECAST_FOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:in|for|at)\s+([\p{L}][\p{L}\s.'-]*)").expect("valid city pattern")
});

static CITY_WEATHER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([\p{L}][\p{L}\s.'-]*?)\s+(?:weather|forecast)\b").expect("valid city pattern")
});

/// Picks the next completion for a message
pub trait Planner: Send + Sync {
    fn plan(&self, message: &str, tool_results: &[ToolCallResult]) -> Completion;
}

/// Keyword rules over the message text
#[derive(Debug, Default, Clone)]
pub struct KeywordPlanner;

impl KeywordPlanner {
    pub fn new() -> Self {
        Self
    }
}

impl Planner for KeywordPlanner {
    fn plan(&self, message: &str, tool_results: &[ToolCallResult]) -> Completion {
        if !tool_results.is_empty() {
            let text = tool_results
                .iter()
                .map(ToolCallResult::text)
                .collect::<Vec<_>>()
                .join("\n\n");
            return Completion::content(text);
        }

        if let Some((latitude, longitude)) = coordinates(message) {
            return Completion::tool_call(
                GET_WEATHER_BY_COORDINATES,
                json!({"latitude": latitude, "longitude": longitude}),
            );
        }

        let lower = message.to_lowercase();
        if lower.contains("forecast") {
            if let Some(city) = forecast_city(message) {
                let mut arguments = json!({"city": city});
                if let Some(days) = days(message) {
                    arguments["days"] = json!(days);
                }
                return Completion::tool_call(GET_FORECAST, arguments);
            }
        }

        if lower.contains("weather") {
            if let Some(city) = weather_city(message) {
                return Completion::tool_call(GET_WEATHER_BY_CITY, json!({"city": city}));
            }
        }

        Completion::content(HELP_TEXT)
    }
}

fn coordinates(message: &str) -> Option<(f64, f64)> {
    let caps = COORDINATES.captures(message)?;
    let latitude: f64 = caps.get(1)?.as_str().parse().ok()?;
    let longitude: f64 = caps.get(2)?.as_str().parse().ok()?;
    Some((latitude, longitude))
}

fn days(message: &str) -> Option<i64> {
    DAYS.captures(message)?.get(1)?.as_str().parse().ok()
}

fn clean_city(raw: &str) -> Option<String> {
    let trimmed = raw
        .trim()
        .trim_end_matches(['.', '?', '!', '\''])
        .trim();
    // Trailing filler such as "today" or "tomorrow" is not part of the name
    let city = trimmed
        .split_whitespace()
        .filter(|w| !matches!(w.to_lowercase().as_str(), "today" | "tomorrow" | "now" | "please"))
        .collect::<Vec<_>>()
        .join(" ");
    (!city.is_empty()).then_some(city)
}

fn forecast_city(message: &str) -> Option<String> {
    FORECAST_FOR
        .captures(message)
        .and_then(|c| c.get(1))
        .and_then(|m| clean_city(m.as_str()))
        .or_else(|| weather_city(message))
}

fn weather_city(message: &str) -> Option<String> {
    if let Some(m) = WEATHER_IN.captures(message).and_then(|c| c.get(1)) {
        return clean_city(m.as_str());
    }
    let m = CITY_WEATHER.captures(message)?.get(1)?;
    // "what's the weather" style prefixes carry no city
    let candidate = m.as_str().split_whitespace().last()?;
    match candidate.to_lowercase().as_str() {
        "the" | "what's" | "whats" | "is" | "a" | "day" | "days" => None,
        _ => clean_city(candidate),
    }
}
