//! Configuration infrastructure
//!
//! Settings are layered: built-in defaults, then an optional config file,
//! then `WISHLIST_PARSER__*` environment variables
//! (e.g. `WISHLIST_PARSER__PARSER__REQUEST_TIMEOUT_SECONDS=5`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::infrastructure::parsing_error::ParsingError;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "WISHLIST_PARSER";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub parser: ParserConfig,
    pub logging: LoggingConfig,
}

/// Settings for outbound fetching and marketplace endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Browser user agent; marketplaces reject default client identifiers
    pub user_agent: String,

    pub follow_redirects: bool,
    pub max_redirects: usize,

    /// Wildberries product card endpoint, queried with `?nm={article}`
    pub wildberries_api_url: String,

    /// Host suffix of the Wildberries image CDN (`basket-NN.{host}`)
    pub wildberries_image_host: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            user_agent: defaults::USER_AGENT.to_string(),
            follow_redirects: true,
            max_redirects: defaults::MAX_REDIRECTS,
            wildberries_api_url: defaults::WILDBERRIES_API_URL.to_string(),
            wildberries_image_host: defaults::WILDBERRIES_IMAGE_HOST.to_string(),
        }
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    pub json_format: bool,
    pub console_output: bool,
    pub file_output: bool,

    /// Directory for log files; next to the executable when unset
    pub log_dir: Option<PathBuf>,

    pub file_name: String,

    /// "never" or "daily"
    pub rotation: String,

    /// Module-specific log level filters (e.g., "reqwest": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
            file_name: defaults::LOG_FILE_NAME.to_string(),
            rotation: defaults::LOG_ROTATION.to_string(),
            module_filters: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Default location of the optional config file (extension resolved by the loader)
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wishlist-parser").join("config"))
    }

    /// Load configuration from an explicit file, or from the default location if present
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(default_path) = Self::default_config_path() {
                    builder = builder.add_source(
                        config::File::with_name(&default_path.to_string_lossy()).required(false),
                    );
                }
            }
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let app_config: Self = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ParsingError> {
        self.parser.validate()
    }
}

impl ParserConfig {
    pub fn validate(&self) -> Result<(), ParsingError> {
        if self.request_timeout_seconds == 0 {
            return Err(ParsingError::configuration(
                "request_timeout_seconds",
                "request_timeout_seconds must be greater than 0",
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ParsingError::configuration(
                "user_agent",
                "user_agent must not be empty",
            ));
        }
        if !self.wildberries_api_url.starts_with("http://")
            && !self.wildberries_api_url.starts_with("https://")
        {
            return Err(ParsingError::configuration(
                "wildberries_api_url",
                "wildberries_api_url must be an http(s) URL",
            ));
        }
        if self.wildberries_image_host.trim().is_empty() {
            return Err(ParsingError::configuration(
                "wildberries_image_host",
                "wildberries_image_host must not be empty",
            ));
        }
        Ok(())
    }
}

/// Default configuration values
pub mod defaults {
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 10;

    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    pub const MAX_REDIRECTS: usize = 10;

    pub const WILDBERRIES_API_URL: &str = "https://card.wb.ru/cards/v2/detail";

    pub const WILDBERRIES_IMAGE_HOST: &str = "wbbasket.ru";

    pub const LOG_LEVEL: &str = "info";

    pub const LOG_JSON_FORMAT: bool = false;

    pub const LOG_CONSOLE_OUTPUT: bool = true;

    pub const LOG_FILE_OUTPUT: bool = false;

    pub const LOG_FILE_NAME: &str = "wishlist-parser.log";

    pub const LOG_ROTATION: &str = "never";
}
