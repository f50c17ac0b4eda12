//! Audit entry records.
//!
//! One `LogEntry` is one line in an environment's audit log: an internally
//! tagged JSON object whose `type` discriminant is `request`, `response`, or
//! `error`. Entries are immutable once built; the sink only ever sees the
//! serialized line.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogEntry {
    /// An inbound request, recorded before the upstream call is made.
    Request {
        time: String,
        environment: String,
        method: String,
        /// Original URL, environment prefix included.
        url: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        query: BTreeMap<String, String>,
        headers: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        workspace: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_agent: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },
    /// The upstream's answer to a previously recorded request.
    Response {
        time: String,
        environment: String,
        method: String,
        url: String,
        status: u16,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_length: Option<u64>,
        duration_ms: u64,
        headers: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
        /// Reason the body was not captured, when it wasn't.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body_omitted: Option<String>,
    },
    /// Upstream call failure; takes the place of a response entry.
    Error {
        time: String,
        environment: String,
        method: String,
        url: String,
        error: String,
        duration_ms: u64,
    },
}

impl LogEntry {
    /// Current wall-clock timestamp in the format entries carry.
    pub fn timestamp_now() -> String {
        chrono::Utc::now().to_rfc3339()
    }

    /// Environment this entry belongs to.
    pub fn environment(&self) -> &str {
        match self {
            LogEntry::Request { environment, .. }
            | LogEntry::Response { environment, .. }
            | LogEntry::Error { environment, .. } => environment,
        }
    }

    /// Serialize to a single JSON line (no trailing newline).
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
