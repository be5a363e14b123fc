use thiserror::Error;

use crate::api::YahooClient;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error(
        "{key} must be an integer in 1..={max}, got {value:?}",
        max = Config::MAX_CHART_DIMENSION
    )]
    Invalid { key: &'static str, value: String },
}

/// Startup settings read from the environment (after `.env` is loaded)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub discord_token: String,
    pub quote_base_url: String,
    pub chart_width: u32,
    pub chart_height: u32,
}

impl Config {
    pub const DEFAULT_CHART_WIDTH: u32 = 1024;
    pub const DEFAULT_CHART_HEIGHT: u32 = 768;
    pub const MAX_CHART_DIMENSION: u32 = 8192;

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let discord_token = get("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;
        let quote_base_url = get("QUOTE_BASE_URL")
            .unwrap_or_else(|| YahooClient::DEFAULT_BASE_URL.to_string());

        let dimension = |key: &'static str, default: u32| -> Result<u32, ConfigError> {
            match get(key) {
                None => Ok(default),
                Some(value) => match value.parse::<u32>() {
                    Ok(n) if (1..=Self::MAX_CHART_DIMENSION).contains(&n) => Ok(n),
                    _ => Err(ConfigError::Invalid { key, value }),
                },
            }
        };

        Ok(Config {
            discord_token,
            quote_base_url,
            chart_width: dimension("CHART_WIDTH", Self::DEFAULT_CHART_WIDTH)?,
            chart_height: dimension("CHART_HEIGHT", Self::DEFAULT_CHART_HEIGHT)?,
        })
    }
}
