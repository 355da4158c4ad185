//! Configuration management.
//!
//! This module handles:
//! - Environment variable loading (with optional `.env` file)
//! - Configuration validation
//! - Default value handling
//!
//! The free functions in [`crate::security`] always use the built-in
//! defaults. Configured limits apply through [`crate::Sanitizer`].
//!
//! # Example
//!
//! ```
//! use trust_boundary::config::Config;
//!
//! let config = Config {
//!     skill_tag_max_chars: 32,
//!     ..Config::default()
//! };
//! assert_eq!(config.prompt_max_chars, 10_000);
//! assert!(trust_boundary::config::validate_config(&config).is_ok());
//! ```

mod validation;

pub use validation::{
    validate_config, MAX_FILE_CHARS, MAX_PROMPT_CHARS, MAX_RATE_LIMIT_REQUESTS,
    MAX_RATE_LIMIT_WINDOW_MS, MAX_SKILL_TAG_CHARS,
};

use crate::error::ConfigError;
use crate::rate_limit::{RateLimitConfig, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_MS};
use crate::security::{DEFAULT_FILE_MAX_CHARS, MAX_PROMPT_INPUT_CHARS};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Application configuration.
///
/// Use [`Config::from_env`] to load configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Log level (error, warn, info, debug, trace) or an `EnvFilter` directive.
    pub log_level: String,
    /// Character budget for prompt text.
    pub prompt_max_chars: usize,
    /// Character budget for uploaded file content.
    pub file_max_chars: usize,
    /// Character budget for skill tags.
    pub skill_tag_max_chars: usize,
    /// Rate limiter settings.
    pub rate_limit: RateLimitConfig,
    /// Extra denylist patterns appended to the built-in prompt denylist.
    pub extra_denylist: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            prompt_max_chars: MAX_PROMPT_INPUT_CHARS,
            file_max_chars: DEFAULT_FILE_MAX_CHARS,
            skill_tag_max_chars: crate::security::MAX_SKILL_TAG_CHARS,
            rate_limit: RateLimitConfig::default(),
            extra_denylist: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional environment variables (with defaults):
    /// - `LOG_LEVEL`: Logging level (default: `info`)
    /// - `PROMPT_MAX_CHARS`: Prompt text budget (default: `10000`)
    /// - `FILE_MAX_CHARS`: File content budget (default: `50000`)
    /// - `SKILL_TAG_MAX_CHARS`: Skill tag budget (default: `50`)
    /// - `RATE_LIMIT_MAX_REQUESTS`: Requests per window (default: `10`)
    /// - `RATE_LIMIT_WINDOW_MS`: Window length (default: `60000`)
    /// - `PROMPT_DENYLIST_EXTRA`: Comma-separated extra patterns (default: none)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a numeric variable is not a valid
    /// non-negative integer, or if any value fails validation (see
    /// [`validate_config`]).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into());

        let prompt_max_chars = parse_env("PROMPT_MAX_CHARS", MAX_PROMPT_INPUT_CHARS)?;
        let file_max_chars = parse_env("FILE_MAX_CHARS", DEFAULT_FILE_MAX_CHARS)?;
        let skill_tag_max_chars =
            parse_env("SKILL_TAG_MAX_CHARS", crate::security::MAX_SKILL_TAG_CHARS)?;
        let max_requests = parse_env("RATE_LIMIT_MAX_REQUESTS", DEFAULT_MAX_REQUESTS)?;
        let window_ms = parse_env("RATE_LIMIT_WINDOW_MS", DEFAULT_WINDOW_MS)?;

        let extra_denylist = std::env::var("PROMPT_DENYLIST_EXTRA")
            .map(|raw| split_patterns(&raw))
            .unwrap_or_default();

        let config = Self {
            log_level,
            prompt_max_chars,
            file_max_chars,
            skill_tag_max_chars,
            rate_limit: RateLimitConfig {
                max_requests,
                window_ms,
            },
            extra_denylist,
        };

        validate_config(&config)?;
        Ok(config)
    }
}

/// Parse an environment variable, using a default if not set.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    std::env::var(name).map_or(Ok(default), |val| {
        val.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var: name.into(),
            reason: "must be a non-negative integer".into(),
        })
    })
}

fn split_patterns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
