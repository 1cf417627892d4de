//! Reading identifiers out of transaction logs.
//!
//! A raw log is a JSON array with one entry per message, each listing typed
//! events with key/value attributes. Logs are untrusted input: a failed
//! transaction puts plain error text here instead of JSON.

use serde::Deserialize;
use thiserror::Error;

/// Event carrying the code id of uploaded bytecode
pub const STORE_CODE_EVENTS: &[&str] = &["store_code", "migrate_code"];
pub const CODE_ID_ATTR: &str = "code_id";

/// Instantiate event, renamed between chain versions; oldest name first
pub const INSTANTIATE_EVENTS: &[&str] = &["instantiate_contract", "instantiate"];
pub const CONTRACT_ADDRESS_ATTR: &str = "_contract_address";

#[derive(Debug, Error)]
pub enum LogError {
    /// Not a structured log; usually the chain's error text. Inspect `raw_log`.
    #[error("Transaction log is not a valid event log ({reason}):\n{raw_log}")]
    Malformed { reason: String, raw_log: String },

    /// Structured log without the event; likely a chain version mismatch.
    #[error("No {expected:?} event in transaction log (found {found:?})")]
    EventNotFound {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Event {event} has no {key} attribute")]
    AttributeNotFound { event: String, key: String },
}

/// Log of one message within a transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct MsgLog {
    #[serde(default)]
    pub msg_index: Option<u32>,
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attribute {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

pub fn parse_log(raw_log: &str) -> Result<Vec<MsgLog>, LogError> {
    serde_json::from_str(raw_log).map_err(|e| LogError::Malformed {
        reason: e.to_string(),
        raw_log: raw_log.to_string(),
    })
}

/// Value of attribute `key` on the first of `event_types` present in the
/// first message's events.
pub fn extract_attribute(raw_log: &str, event_types: &[&str], key: &str) -> Result<String, LogError> {
    let logs = parse_log(raw_log)?;
    let events = logs.first().map(|log| log.events.as_slice()).unwrap_or_default();

    let event = event_types
        .iter()
        .find_map(|wanted| events.iter().find(|event| event.kind == *wanted))
        .ok_or_else(|| LogError::EventNotFound {
            expected: event_types.iter().map(|t| t.to_string()).collect(),
            found: events.iter().map(|e| e.kind.clone()).collect(),
        })?;

    event
        .attributes
        .iter()
        .find(|attr| attr.key == key)
        .and_then(|attr| attr.value.clone())
        .ok_or_else(|| LogError::AttributeNotFound {
            event: event.kind.clone(),
            key: key.to_string(),
        })
}
