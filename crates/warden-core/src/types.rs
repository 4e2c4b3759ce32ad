//! Core domain type definitions

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────
// Session State
// ─────────────────────────────────────────────────────────

/// Tunnel session lifecycle state.
///
/// The engine reports this as a small integer ordinal. The mapping is total:
/// any ordinal outside 0..=5 is treated as [`SessionState::Disconnected`] so
/// an unrecognized state is never surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// No active session. Initial state, reachable from every other state.
    #[default]
    Disconnected,
    /// Session establishment in progress
    Connecting,
    /// Tunnel is up
    Connected,
    /// Tunnel lost, waiting before a recovery attempt
    WaitingForRecovery,
    /// Recovery attempt in progress
    Recovering,
    /// No usable network, waiting for connectivity
    WaitingForNetwork,
}

impl SessionState {
    /// Map an engine ordinal to a session state.
    ///
    /// Ordinals 0-5 map in declaration order; anything else defaults to
    /// `Disconnected`.
    pub fn from_ordinal(raw: i64) -> Self {
        match raw {
            1 => SessionState::Connecting,
            2 => SessionState::Connected,
            3 => SessionState::WaitingForRecovery,
            4 => SessionState::Recovering,
            5 => SessionState::WaitingForNetwork,
            _ => SessionState::Disconnected,
        }
    }

    /// A settled state ends the confirmation probe schedule early.
    pub fn is_settled(&self) -> bool {
        matches!(self, SessionState::Connected | SessionState::Disconnected)
    }

    /// Display label used in diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::WaitingForRecovery => "waitingForRecovery",
            SessionState::Recovering => "recovering",
            SessionState::WaitingForNetwork => "waitingForNetwork",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ─────────────────────────────────────────────────────────
// User Setup
// ─────────────────────────────────────────────────────────

/// Transport protocol used to reach the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TunnelProtocol {
    #[default]
    #[serde(rename = "Http/2")]
    Http2,
    #[serde(rename = "QUIC")]
    Quic,
}

impl TunnelProtocol {
    /// The token the engine expects in `upstream_protocol`
    pub fn engine_token(&self) -> &'static str {
        match self {
            TunnelProtocol::Http2 => "http2",
            TunnelProtocol::Quic => "http3",
        }
    }
}

/// One endpoint's connection identity.
///
/// Mutated only by the setup surface; read-only to the control plane.
/// Defaults are all empty -- persistence is the sole source of truth after
/// first hydration, never hard-coded credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub ip_address: String,
    pub domain: String,
    pub login: String,
    pub password: String,
    pub protocol: TunnelProtocol,
    #[serde(default)]
    pub dns_servers: Vec<String>,
}

/// Client connection routing policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// Route everything except `rules` through the tunnel
    #[default]
    General,
    /// Route only `rules` through the tunnel
    Selective,
}

impl RoutingMode {
    /// The token the engine expects in `vpn_mode`
    pub fn engine_token(&self) -> &'static str {
        match self {
            RoutingMode::General => "general",
            RoutingMode::Selective => "selective",
        }
    }
}

/// Routing mode plus the rule set it applies to.
///
/// Rules are domain or address/CIDR patterns; their classification is
/// derived at compile time, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub mode: RoutingMode,
    pub rules: Vec<String>,
}

/// Input to one compile call. Constructed fresh each time, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigInput {
    pub server: ServerConfig,
    pub routing: RoutingConfig,
    pub excluded_routes: Vec<String>,
}

// ─────────────────────────────────────────────────────────
// Query Log
// ─────────────────────────────────────────────────────────

/// What the engine did with a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryLogAction {
    Bypass,
    Tunnel,
    Reject,
}

impl QueryLogAction {
    /// Parse a raw action token. Comparison is trimmed and case-insensitive.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bypass" => Some(QueryLogAction::Bypass),
            "tunnel" => Some(QueryLogAction::Tunnel),
            "reject" => Some(QueryLogAction::Reject),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QueryLogAction::Bypass => "bypass",
            QueryLogAction::Tunnel => "tunnel",
            QueryLogAction::Reject => "reject",
        }
    }
}

/// Transport protocol of a logged connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryLogProtocol {
    Tcp,
    Udp,
}

impl QueryLogProtocol {
    /// Parse a raw protocol token. Comparison is trimmed and case-insensitive.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tcp" => Some(QueryLogProtocol::Tcp),
            "udp" => Some(QueryLogProtocol::Udp),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QueryLogProtocol::Tcp => "tcp",
            QueryLogProtocol::Udp => "udp",
        }
    }
}

/// A decoded per-connection query-log record.
///
/// Created only by the decoder; immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLogRow {
    pub action: QueryLogAction,
    pub protocol: QueryLogProtocol,
    pub source: String,
    pub destination: Option<String>,
    pub domain: Option<String>,
    pub stamp: DateTime<Utc>,
}

impl QueryLogRow {
    /// Format for single-line display
    pub fn display_line(&self) -> String {
        format!(
            "{} {} [{}] {} -> {}",
            self.stamp.format("%H:%M:%S"),
            self.action.label(),
            self.protocol.label(),
            self.source,
            self.domain
                .as_deref()
                .or(self.destination.as_deref())
                .unwrap_or("-"),
        )
    }
}

/// Rows retained by consumers before eviction
pub const QUERY_LOG_RETENTION: usize = 200;

// ─────────────────────────────────────────────────────────
// RingBuffer
// ─────────────────────────────────────────────────────────

/// A fixed-capacity circular buffer that overwrites the oldest entries
/// when full. Used for rolling query-log retention.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a value, evicting the oldest if at capacity.
    pub fn push(&mut self, value: T) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(value);
    }

    /// Number of items currently stored.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Maximum capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate over items from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }

    /// Get the most recently pushed item.
    pub fn latest(&self) -> Option<&T> {
        self.buf.back()
    }

    /// Clear all items.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

// ─────────────────────────────────────────────────────────
// List Text Helpers
// ─────────────────────────────────────────────────────────

/// Split comma-separated setup text into trimmed, non-empty entries.
///
/// DNS server lists and routing rule lists are persisted as free text;
/// this is the single place that turns them back into structured lists.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
