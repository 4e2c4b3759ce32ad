//! # warden-core - Core Domain Types
//!
//! Foundation crate for Tunnel Warden. Provides domain types, error handling,
//! the engine config compiler, the query-log decoder, and settings
//! persistence.
//!
//! This crate has **zero internal dependencies** -- it only depends on
//! external crates (serde, chrono, thiserror, tracing, toml).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`SessionState`] - Tunnel session lifecycle state with a total ordinal mapping
//! - [`ServerConfig`], [`RoutingConfig`], [`ConfigInput`] - Structured user setup
//! - [`QueryLogRow`] - A decoded per-connection query-log record
//! - [`RingBuffer`] - Capped retention buffer for query-log rows
//!
//! ### Config Compiler (`compiler`)
//! - [`compile()`] - Structured settings to engine configuration text
//!
//! ### Query-Log Decoder (`decoder`)
//! - [`decode_query_log_row()`] - Raw event payload to a validated [`QueryLogRow`]
//! - [`DecodeError`] - Why a payload was rejected
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with recoverable classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ### Settings (`settings`)
//! - [`Settings`] - Persisted user setup, load/save by named slot
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use warden_core::prelude::*;
//! ```

pub mod compiler;
pub mod decoder;
pub mod error;
pub mod logging;
pub mod settings;
pub mod types;

/// Prelude for common imports used throughout all Tunnel Warden crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use compiler::compile;
pub use decoder::{decode_query_log_row, DecodeError};
pub use error::{Error, Result, ResultExt};
pub use settings::Settings;
pub use types::{
    split_list, ConfigInput, QueryLogAction, QueryLogProtocol, QueryLogRow, RingBuffer,
    RoutingConfig, RoutingMode, ServerConfig, SessionState, TunnelProtocol,
    QUERY_LOG_RETENTION,
};
