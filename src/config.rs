use std::path::PathBuf;

use thiserror::Error;

use crate::client::MARKDOWN_NOTE_TYPE;
use crate::extractor::DEFAULT_ICON_URL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Where the base URL and token are persisted
    pub settings_path: PathBuf,
    /// `type` sent with every upsert
    pub note_type: i64,
    /// Image shown inside injected controls
    pub icon_url: String,
    /// Page URL assumed for saved pages when none is given
    pub default_page_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from("./data/settings.json"),
            note_type: MARKDOWN_NOTE_TYPE,
            icon_url: DEFAULT_ICON_URL.to_string(),
            default_page_url: "https://x.com/home".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            settings_path: optional_env("BLINKO_SETTINGS_PATH")
                .map_or(defaults.settings_path, PathBuf::from),
            note_type: parse_env_i64("BLINKO_NOTE_TYPE", defaults.note_type)?,
            icon_url: optional_env("BLINKO_ICON_URL").unwrap_or(defaults.icon_url),
            default_page_url: optional_env("BLINKO_PAGE_URL").unwrap_or(defaults.default_page_url),
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settings_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "BLINKO_SETTINGS_PATH".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if url::Url::parse(&self.default_page_url).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "BLINKO_PAGE_URL".to_string(),
                message: format!("not an absolute URL: {}", self.default_page_url),
            });
        }
        Ok(())
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_env_i64(name: &str, default: i64) -> Result<i64, ConfigError> {
    match optional_env(name) {
        Some(value) => value.trim().parse().map_err(|source| ConfigError::ParseInt {
            name: name.to_string(),
            source,
        }),
        None => Ok(default),
    }
}
