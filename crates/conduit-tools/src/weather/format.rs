//! Upstream payload shapes and their text rendering

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Readings {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Wind {
    pub speed: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Place {
    #[serde(default)]
    pub country: Option<String>,
}

/// Current conditions, metric units
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentWeather {
    pub name: String,
    #[serde(default)]
    pub sys: Place,
    pub weather: Vec<Condition>,
    pub main: Readings,
    pub wind: Wind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastCity {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastTemp {
    pub temp: f64,
}

/// One three-hour forecast slot
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastItem {
    /// `YYYY-MM-DD HH:MM:SS`
    pub dt_txt: String,
    pub main: ForecastTemp,
    pub weather: Vec<Condition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub city: ForecastCity,
    pub list: Vec<ForecastItem>,
}

/// Per-day aggregate of forecast slots
#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub date: String,
    pub average_temp: f64,
    pub description: String,
}

fn location(name: &str, country: Option<&str>) -> String {
    match country {
        Some(country) if !country.is_empty() => format!("{}, {}", name, country),
        _ => name.to_string(),
    }
}

fn description(conditions: &[Condition]) -> &str {
    conditions
        .first()
        .map(|c| c.description.as_str())
        .unwrap_or("unknown")
}

pub fn format_current(data: &CurrentWeather) -> String {
    format!(
        "City: {}\nWeather: {}\nTemperature: {:.1}°C (feels like {:.1}°C)\nHumidity: {}%\nWind speed: {} m/s",
        location(&data.name, data.sys.country.as_deref()),
        description(&data.weather),
        data.main.temp,
        data.main.feels_like,
        data.main.humidity,
        data.wind.speed,
    )
}

/// Group slots by calendar date, in upstream order, keeping the first `days`
pub fn daily_summaries(items: &[ForecastItem], days: usize) -> Vec<DailySummary> {
    let mut groups: Vec<(String, Vec<&ForecastItem>)> = Vec::new();
    for item in items {
        let date = item.dt_txt.split(' ').next().unwrap_or_default().to_string();
        match groups.iter_mut().find(|(d, _)| *d == date) {
            Some((_, slots)) => slots.push(item),
            None => groups.push((date, vec![item])),
        }
    }

    groups
        .into_iter()
        .take(days)
        .map(|(date, slots)| {
            let average_temp = slots.iter().map(|s| s.main.temp).sum::<f64>() / slots.len() as f64;
            DailySummary {
                date,
                average_temp,
                description: most_common(slots.iter().map(|s| description(&s.weather))),
            }
        })
        .collect()
}

// Ties go to the description seen first
fn most_common<'a>(descriptions: impl Iterator<Item = &'a str>) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for desc in descriptions {
        match counts.iter_mut().find(|(d, _)| *d == desc) {
            Some((_, n)) => *n += 1,
            None => counts.push((desc, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (desc, n) in counts {
        if best.is_none_or(|(_, top)| n > top) {
            best = Some((desc, n));
        }
    }
    best.map(|(d, _)| d.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn format_forecast(data: &ForecastResponse, days: usize) -> String {
    let mut out = format!(
        "City: {}\n",
        location(&data.city.name, data.city.country.as_deref())
    );
    for day in daily_summaries(&data.list, days) {
        out.push_str(&format!(
            "\nDate: {}\nAverage temperature: {:.1}°C\nWeather: {}\n",
            day.date, day.average_temp, day.description
        ));
    }
    out
}
