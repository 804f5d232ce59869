//! Error types and handling
//!
//! This module provides the error types shared by the Swarm engine.
//! All errors implement the `SwarmErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Error messages never carry the API key. Callers that embed upstream
//! error text should scrub it before display.

use thiserror::Error;

/// Trait for Swarm error extensions
pub trait SwarmErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around on the next turn.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Database**: SQLite operation failures
/// - **Memory**: Long-term fact store failures
/// - **Keyring**: OS keychain access
/// - **IO**: Everything else touching the file system
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, SwarmErrorExt};
///
/// let error = EngineError::Memory("disk full".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal = EngineError::Config("bad log level".to_string());
/// assert!(!fatal.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // Memory store errors
    #[error("Memory store error: {0}")]
    Memory(String),

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    #[error("API key not found: set {0} or run 'swarm key set'")]
    MissingApiKey(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SwarmErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Database(_) => "Database operation failed. Check the memory database file",
            Self::Memory(_) => "Could not persist memory. Check the memory file permissions",
            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",
            Self::MissingApiKey(_) => "Provide a Gemini API key before starting a session",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::MissingApiKey(_))
    }
}
