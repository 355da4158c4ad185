//! Error types for the trust-boundary toolkit.
//!
//! The sanitizers themselves never fail: malformed input is absorbed into a
//! safe default output. Errors only exist at the edges of the crate:
//! - [`AppError`]: Top-level errors surfaced by the binary
//! - [`ConfigError`]: Configuration loading and validation errors
//! - [`SanitizeError`]: Rule construction errors (caller-supplied patterns)
//! - [`CommandParseError`]: Command-line parsing errors
//!
//! All errors implement `Send + Sync`.

use thiserror::Error;

/// Top-level application error.
///
/// Wraps all subsystem errors for unified handling in the binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Rule construction error.
    #[error("Sanitizer error: {0}")]
    Sanitize(#[from] SanitizeError),

    /// Command-line error.
    #[error("Command error: {0}")]
    Command(#[from] CommandParseError),

    /// I/O error while reading input or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration errors.
///
/// These errors represent failures in configuration loading and validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Configuration value is invalid.
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue {
        /// The variable name.
        var: String,
        /// Why the value is invalid.
        reason: String,
    },
}

/// Rule construction errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SanitizeError {
    /// A denylist pattern failed to compile.
    #[error("Invalid pattern {pattern:?}: {message}")]
    InvalidPattern {
        /// The offending pattern source.
        pattern: String,
        /// Compiler message.
        message: String,
    },
}

/// Error parsing CLI commands.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    /// No command provided.
    #[error("No command provided. Use 'help' for usage.")]
    MissingCommand,

    /// Unknown command.
    #[error("Unknown command: {0}. Use 'help' for usage.")]
    UnknownCommand(String),

    /// Unknown flag.
    #[error("Unknown flag: {0}")]
    UnknownFlag(String),

    /// Missing value for flag.
    #[error("Missing value for: {0}")]
    MissingValue(String),

    /// Invalid value for flag.
    #[error("Invalid value '{value}' for {flag}")]
    InvalidValue {
        /// The flag with the invalid value.
        flag: String,
        /// The invalid value that was provided.
        value: String,
    },
}
