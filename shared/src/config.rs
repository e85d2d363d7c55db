use chrono_tz::Tz;
use std::env;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TABLE_NAME: &str = "coachlife";
const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";
const DEFAULT_TRANSLATION_API_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TRANSLATION_MODEL: &str = "gpt-4o-mini";
const DEFAULT_EXTERNAL_CALL_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not a valid IANA timezone: {value}")]
    InvalidTimezone { name: &'static str, value: String },

    #[error("{name} must be a positive integer, got: {value}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct TranslationConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

/// Settings read once per execution context.
#[derive(Debug, Clone)]
pub struct Config {
    pub table_name: String,
    pub timezone: Tz,
    /// `None` disables translation of Tamil comments.
    pub translation: Option<TranslationConfig>,
    pub external_call_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let table_name = lookup("TABLE_NAME").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());

        let tz_name = lookup("COMMENT_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = tz_name.parse().map_err(|_| ConfigError::InvalidTimezone {
            name: "COMMENT_TIMEZONE",
            value: tz_name.clone(),
        })?;

        let translation = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .map(|api_key| TranslationConfig {
                api_url: lookup("TRANSLATION_API_URL")
                    .unwrap_or_else(|| DEFAULT_TRANSLATION_API_URL.to_string()),
                api_key,
                model: lookup("TRANSLATION_MODEL")
                    .unwrap_or_else(|| DEFAULT_TRANSLATION_MODEL.to_string()),
            });

        let timeout_ms = match lookup("EXTERNAL_CALL_TIMEOUT_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::InvalidNumber {
                    name: "EXTERNAL_CALL_TIMEOUT_MS",
                    value: raw,
                })?,
            None => DEFAULT_EXTERNAL_CALL_TIMEOUT_MS,
        };

        Ok(Config {
            table_name,
            timezone,
            translation,
            external_call_timeout: Duration::from_millis(timeout_ms),
        })
    }
}
