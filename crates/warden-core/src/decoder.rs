//! Query-log decoder: raw event payloads to validated records
//!
//! The engine pushes each routed connection as a serialized JSON object.
//! Decoding either yields a complete [`QueryLogRow`] or a [`DecodeError`];
//! there is no partial record. A rejected payload never crashes the event
//! pipeline -- the caller drops it and keeps processing.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::types::{QueryLogAction, QueryLogProtocol, QueryLogRow};

const ACTION_KEY: &str = "action";
const DOMAIN_KEY: &str = "domain";
const SOURCE_KEY: &str = "src";
const DESTINATION_KEY: &str = "dst";
const PROTOCOL_KEY: &str = "proto";
const TIMESTAMP_KEY: &str = "date";

/// Why a query-log payload was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("query log entry is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("query log entry must be an object")]
    NotAnObject,

    #[error("invalid action `{0}`")]
    InvalidAction(String),

    #[error("invalid protocol `{0}`")]
    InvalidProtocol(String),

    #[error("expected `{0}` to be defined")]
    MissingField(&'static str),

    #[error("expected `{0}` to be a string or null")]
    InvalidFieldType(&'static str),

    #[error("cannot parse timestamp from `{0}`")]
    Timestamp(String),
}

/// Decode one raw query-log payload.
///
/// Validation rules:
/// - the payload must be a JSON object,
/// - `action` must be one of bypass/tunnel/reject and `proto` one of
///   tcp/udp, trimmed and case-insensitive,
/// - `src` must be present,
/// - `dst` and `domain` default to absent when missing or null but fail
///   on any non-string value,
/// - `date` must parse into a valid instant.
pub fn decode_query_log_row(raw: &str) -> Result<QueryLogRow, DecodeError> {
    let parsed: Value =
        serde_json::from_str(raw).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

    let data = parsed.as_object().ok_or(DecodeError::NotAnObject)?;

    let action = parse_action(data.get(ACTION_KEY))?;
    let protocol = parse_protocol(data.get(PROTOCOL_KEY))?;
    let source = parse_required_string(data.get(SOURCE_KEY), SOURCE_KEY)?;
    let destination = parse_nullable_string(data.get(DESTINATION_KEY), DESTINATION_KEY)?;
    let domain = parse_nullable_string(data.get(DOMAIN_KEY), DOMAIN_KEY)?;
    let stamp = parse_timestamp(data.get(TIMESTAMP_KEY))?;

    Ok(QueryLogRow {
        action,
        protocol,
        source,
        destination,
        domain,
        stamp,
    })
}

fn parse_action(value: Option<&Value>) -> Result<QueryLogAction, DecodeError> {
    let raw = stringify(value);
    QueryLogAction::parse(&raw).ok_or_else(|| DecodeError::InvalidAction(raw))
}

fn parse_protocol(value: Option<&Value>) -> Result<QueryLogProtocol, DecodeError> {
    let raw = stringify(value);
    QueryLogProtocol::parse(&raw).ok_or_else(|| DecodeError::InvalidProtocol(raw))
}

fn parse_required_string(
    value: Option<&Value>,
    key: &'static str,
) -> Result<String, DecodeError> {
    match value {
        None | Some(Value::Null) => Err(DecodeError::MissingField(key)),
        Some(v) => Ok(stringify(Some(v)).trim().to_string()),
    }
}

fn parse_nullable_string(
    value: Option<&Value>,
    key: &'static str,
) -> Result<Option<String>, DecodeError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(DecodeError::InvalidFieldType(key)),
    }
}

fn parse_timestamp(value: Option<&Value>) -> Result<DateTime<Utc>, DecodeError> {
    let raw = stringify(value);

    if let Ok(stamp) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(stamp.with_timezone(&Utc));
    }
    // The engine also emits space-separated timestamps without a zone;
    // treat those as UTC.
    if let Ok(naive) = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }

    Err(DecodeError::Timestamp(raw))
}

/// Coerce a JSON value to its string form the way the event producer does:
/// strings unquoted, scalars via their literal token, missing as empty.
fn stringify(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
    }
}
