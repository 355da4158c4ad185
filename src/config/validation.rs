//! Configuration validation.
//!
//! This module provides validation logic for configuration values,
//! ensuring they are within acceptable ranges.

use super::Config;
use crate::error::ConfigError;

/// Maximum allowed prompt budget in characters.
pub const MAX_PROMPT_CHARS: usize = 1_000_000;

/// Maximum allowed file budget in characters.
pub const MAX_FILE_CHARS: usize = 10_000_000;

/// Maximum allowed skill tag budget in characters.
pub const MAX_SKILL_TAG_CHARS: usize = 1_000;

/// Maximum allowed requests per window.
pub const MAX_RATE_LIMIT_REQUESTS: u32 = 100_000;

/// Maximum allowed window length in milliseconds (24 hours).
pub const MAX_RATE_LIMIT_WINDOW_MS: u64 = 86_400_000;

/// Validate configuration values.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if any value is out of range:
/// - `PROMPT_MAX_CHARS` must be between 1 and 1000000
/// - `FILE_MAX_CHARS` must be between 1 and 10000000
/// - `SKILL_TAG_MAX_CHARS` must be between 1 and 1000
/// - `RATE_LIMIT_MAX_REQUESTS` must be at most 100000
/// - `RATE_LIMIT_WINDOW_MS` must be between 1 and 86400000
/// - `LOG_LEVEL` must not be empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.log_level.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            var: "LOG_LEVEL".into(),
            reason: "must not be empty".into(),
        });
    }

    check_range("PROMPT_MAX_CHARS", config.prompt_max_chars, 1, MAX_PROMPT_CHARS)?;
    check_range("FILE_MAX_CHARS", config.file_max_chars, 1, MAX_FILE_CHARS)?;
    check_range(
        "SKILL_TAG_MAX_CHARS",
        config.skill_tag_max_chars,
        1,
        MAX_SKILL_TAG_CHARS,
    )?;
    check_range(
        "RATE_LIMIT_MAX_REQUESTS",
        config.rate_limit.max_requests,
        0,
        MAX_RATE_LIMIT_REQUESTS,
    )?;
    check_range(
        "RATE_LIMIT_WINDOW_MS",
        config.rate_limit.window_ms,
        1,
        MAX_RATE_LIMIT_WINDOW_MS,
    )?;

    Ok(())
}

fn check_range<T>(var: &str, value: T, min: T, max: T) -> Result<(), ConfigError>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(ConfigError::InvalidValue {
            var: var.into(),
            reason: format!("must be between {min} and {max}"),
        });
    }
    Ok(())
}
