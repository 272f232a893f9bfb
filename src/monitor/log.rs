//! Append-only record of received payloads

use serde::Serialize;

/// Ordered record of every text payload received on the connection.
///
/// Entries are kept in arrival order and never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MessageLog {
    entries: Vec<String>,
}

impl MessageLog {
    /// Append a payload at the end of the log
    pub fn push(&mut self, payload: String) {
        self.entries.push(payload);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Most recent payload, if any
    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    /// Total payload bytes held by the log
    pub fn total_bytes(&self) -> usize {
        self.entries.iter().map(String::len).sum()
    }

    /// Render the log as a pretty-printed JSON array
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
