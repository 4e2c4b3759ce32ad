//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

use crate::decoder::DecodeError;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Compiler Errors
    // ─────────────────────────────────────────────────────────────
    // Never produced for well-typed input today; reserved for future
    // schema validation of ConfigInput.
    #[error("Config compile error: {message}")]
    Compile { message: String },

    // ─────────────────────────────────────────────────────────────
    // Engine Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Tunnel engine error: {message}")]
    Engine { message: String },

    #[error("State probe error: {message}")]
    Probe { message: String },

    #[error("A session-mutating call is already in flight")]
    TransitionInFlight,

    // ─────────────────────────────────────────────────────────────
    // Query-Log Errors
    // ─────────────────────────────────────────────────────────────
    #[error(transparent)]
    Decode(#[from] DecodeError),

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Settings slot not found: {path}")]
    SettingsNotFound { path: PathBuf },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn compile(message: impl Into<String>) -> Self {
        Self::Compile {
            message: message.into(),
        }
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    pub fn probe(message: impl Into<String>) -> Self {
        Self::Probe {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn settings_not_found(path: impl Into<PathBuf>) -> Self {
        Self::SettingsNotFound { path: path.into() }
    }

    /// Check if this is a recoverable error.
    ///
    /// Recoverable errors leave the session usable: the caller may retry the
    /// request or simply keep observing events. Engine call failures are
    /// propagated unchanged and never retried automatically.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Engine { .. }
                | Error::Probe { .. }
                | Error::Decode(_)
                | Error::TransitionInFlight
        )
    }

    /// Check if this error should abort the caller entirely
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ChannelClosed | Error::Compile { .. })
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
