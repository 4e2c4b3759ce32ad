//! The tunnel engine's operation surface and push-event stream
//!
//! The engine is a black box reachable only through four operations plus
//! two push channels. Events arrive over an `mpsc` stream owned by
//! whatever bridges the engine process; the facade consumes it.

use warden_core::prelude::*;

/// The engine's asynchronous operation surface.
///
/// All operations suspend the caller until the engine responds; none block
/// a shared thread. Failures surface as [`Error::Engine`] and are
/// propagated unchanged to the caller -- the control plane never retries a
/// mutating call automatically.
#[trait_variant::make(TunnelEngine: Send)]
pub trait LocalTunnelEngine {
    /// Start a session under `server_name` with the compiled config text.
    async fn start(&self, server_name: &str, config_text: &str) -> Result<()>;

    /// Tear down the active session.
    async fn stop(&self) -> Result<()>;

    /// Replace the active session's configuration. Both fields absent means
    /// "re-apply whatever the engine holds".
    async fn update_configuration(
        &self,
        server_name: Option<&str>,
        config_text: Option<&str>,
    ) -> Result<()>;

    /// Query the raw session-state ordinal.
    async fn current_state(&self) -> Result<i64>;
}

/// One event pushed by the engine.
///
/// The two channels are independent: there is no ordering guarantee
/// between a state notification and a query-log record, only within each
/// kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Session-state ordinal notification
    State(i64),

    /// Raw serialized query-log record
    QueryLog(String),
}
