//! Connection events
//!
//! Everything the transport observes is reduced to a [`ConnectionEvent`] and
//! handed to a single handler in arrival order.

use std::fmt;

use serde::Serialize;

/// Lifecycle state of the monitored connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Handshake in progress
    Connecting,
    /// Handshake completed, frames flowing
    Open,
    /// Closed or failed; terminal
    Closed,
}

impl ConnectionState {
    /// Whether frames can be sent in this state
    pub fn is_open(self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Classification of a transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The handshake never completed
    ConnectionOpenFailure,
    /// The connection broke after it was open
    TransportError,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::ConnectionOpenFailure => "connection open failure",
            FailureKind::TransportError => "transport error",
        };
        f.write_str(name)
    }
}

/// Close code used when the connection ends without a close frame
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Something that happened on the connection
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// Handshake succeeded
    Opened { endpoint: String, status: u16 },
    /// Connection is gone; no further events follow
    Closed {
        code: Option<u16>,
        reason: String,
        clean: bool,
    },
    /// Connection attempt or transport failed
    Failed { kind: FailureKind, detail: String },
    /// A text payload arrived
    Received { payload: String },
}

impl ConnectionEvent {
    pub fn opened(endpoint: impl Into<String>, status: u16) -> Self {
        Self::Opened {
            endpoint: endpoint.into(),
            status,
        }
    }

    /// A close acknowledged by both sides
    pub fn closed_cleanly(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self::Closed {
            code,
            reason: reason.into(),
            clean: true,
        }
    }

    /// A close with no closing handshake
    pub fn closed_abnormally() -> Self {
        Self::Closed {
            code: Some(ABNORMAL_CLOSURE),
            reason: String::new(),
            clean: false,
        }
    }

    pub fn failed(kind: FailureKind, detail: impl fmt::Display) -> Self {
        Self::Failed {
            kind,
            detail: detail.to_string(),
        }
    }

    pub fn received(payload: impl Into<String>) -> Self {
        Self::Received {
            payload: payload.into(),
        }
    }
}

/// Number of events of each kind seen by the handler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventCounts {
    pub opened: u64,
    pub closed: u64,
    pub failed: u64,
    pub received: u64,
    /// Events that arrived after the connection closed
    pub discarded: u64,
}
