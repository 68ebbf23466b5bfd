//! Worker settings, read once at startup

use std::time::Duration;

pub const ENV_API_KEY: &str = "OPENWEATHERMAP_API_KEY";
pub const ENV_API_BASE: &str = "CONDUIT_WEATHER_API_BASE";
pub const ENV_LANG: &str = "CONDUIT_WEATHER_LANG";
pub const ENV_TIMEOUT_SECS: &str = "CONDUIT_WEATHER_TIMEOUT_SECS";

pub const DEFAULT_API_BASE: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_LANG: &str = "zh_cn";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Settings handed to the weather tools
#[derive(Clone, PartialEq)]
pub struct WorkerSettings {
    /// Empty when not configured; lookups then degrade to "unavailable"
    pub api_key: String,
    pub api_base: String,
    pub lang: String,
    pub timeout: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            lang: DEFAULT_LANG.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

// Keeps the key out of logs
impl std::fmt::Debug for WorkerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerSettings")
            .field("api_key", &if self.has_api_key() { "<set>" } else { "<unset>" })
            .field("api_base", &self.api_base)
            .field("lang", &self.lang)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl WorkerSettings {
    /// Load `.env` if present, then read the process environment
    pub fn load() -> Self {
        if let Ok(path) = dotenv::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let timeout = match non_empty(ENV_TIMEOUT_SECS) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    tracing::warn!("Ignoring invalid {}='{}'", ENV_TIMEOUT_SECS, raw);
                    defaults.timeout
                }
            },
            None => defaults.timeout,
        };

        Self {
            api_key: non_empty(ENV_API_KEY).unwrap_or_default(),
            api_base: non_empty(ENV_API_BASE)
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            lang: non_empty(ENV_LANG).unwrap_or(defaults.lang),
            timeout,
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }
}
