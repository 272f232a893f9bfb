//! Connection event handler
//!
//! Consumes [`ConnectionEvent`]s one at a time, emits a diagnostic for each and
//! records received payloads in the [`MessageLog`].

use std::sync::Arc;

use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{ConnectionEvent, ConnectionState, EventCounts, MessageLog};

/// Length reported in message diagnostics, in UTF-16 code units so it
/// matches what browser clients report for the same payload
pub fn payload_length(payload: &str) -> usize {
    payload.encode_utf16().count()
}

/// State shared between the handler and the context handed to callers
#[derive(Debug, Default)]
pub struct MonitorState {
    pub log: MessageLog,
    pub counts: EventCounts,
}

/// Applies connection events to the shared monitor state
pub struct EventHandler {
    connection_id: Uuid,
    shared: Arc<RwLock<MonitorState>>,
    state_tx: watch::Sender<ConnectionState>,
    log_payloads: bool,
}

impl EventHandler {
    pub fn new(
        connection_id: Uuid,
        shared: Arc<RwLock<MonitorState>>,
        state_tx: watch::Sender<ConnectionState>,
        log_payloads: bool,
    ) -> Self {
        Self {
            connection_id,
            shared,
            state_tx,
            log_payloads,
        }
    }

    /// Drain the event channel until every sender is gone
    pub async fn run(self, mut event_rx: mpsc::Receiver<ConnectionEvent>) {
        while let Some(event) = event_rx.recv().await {
            self.handle(event).await;
        }
        debug!(connection = %self.connection_id, "Event channel closed");
    }

    /// Apply a single event
    pub async fn handle(&self, event: ConnectionEvent) {
        let id = self.connection_id;
        let mut shared = self.shared.write().await;

        if *self.state_tx.borrow() == ConnectionState::Closed {
            shared.counts.discarded += 1;
            debug!(connection = %id, ?event, "Discarding event after close");
            return;
        }

        match event {
            ConnectionEvent::Opened { endpoint, status } => {
                shared.counts.opened += 1;
                info!(connection = %id, %endpoint, status, "Connection open");
                self.state_tx.send_replace(ConnectionState::Open);
            }
            ConnectionEvent::Closed {
                code,
                reason,
                clean,
            } => {
                shared.counts.closed += 1;
                info!(connection = %id, ?code, %reason, clean, "Connection closed");
                self.state_tx.send_replace(ConnectionState::Closed);
            }
            ConnectionEvent::Failed { kind, detail } => {
                shared.counts.failed += 1;
                error!(connection = %id, %kind, %detail, "Connection error");
            }
            ConnectionEvent::Received { payload } => {
                shared.counts.received += 1;
                let length = payload_length(&payload);
                if self.log_payloads {
                    info!(connection = %id, length, message = %payload, "Message received");
                } else {
                    info!(connection = %id, length, "Message received");
                }
                shared.log.push(payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::FailureKind;

    fn handler() -> (
        EventHandler,
        Arc<RwLock<MonitorState>>,
        watch::Receiver<ConnectionState>,
    ) {
        let shared = Arc::new(RwLock::new(MonitorState::default()));
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let handler = EventHandler::new(Uuid::new_v4(), Arc::clone(&shared), state_tx, true);
        (handler, shared, state_rx)
    }

    #[tokio::test]
    async fn test_messages_logged_in_arrival_order() {
        let (handler, shared, _state_rx) = handler();

        handler.handle(ConnectionEvent::opened("ws://test/ws", 101)).await;
        for payload in ["a", "bb", "ccc"] {
            handler.handle(ConnectionEvent::received(payload)).await;
        }

        let state = shared.read().await;
        assert_eq!(state.log.entries(), ["a", "bb", "ccc"]);
        let lengths: Vec<usize> = state
            .log
            .entries()
            .iter()
            .map(|payload| payload_length(payload))
            .collect();
        assert_eq!(lengths, vec![1, 2, 3]);
        assert_eq!(state.counts.received, 3);
    }

    #[test]
    fn test_payload_length_counts_utf16_units() {
        assert_eq!(payload_length(""), 0);
        assert_eq!(payload_length("a"), 1);
        assert_eq!(payload_length("bb"), 2);
        assert_eq!(payload_length("ccc"), 3);
        // Two UTF-8 bytes, one code unit
        assert_eq!(payload_length("é"), 1);
        // Four UTF-8 bytes, a surrogate pair
        assert_eq!(payload_length("😀"), 2);
        assert_eq!(payload_length("hi 😀é"), 6);
    }

    #[tokio::test]
    async fn test_open_does_not_touch_log() {
        let (handler, shared, state_rx) = handler();

        handler.handle(ConnectionEvent::opened("ws://test/ws", 101)).await;

        let state = shared.read().await;
        assert_eq!(state.counts.opened, 1);
        assert_eq!(state.log.len(), 0);
        assert_eq!(*state_rx.borrow(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_close_is_terminal() {
        let (handler, shared, state_rx) = handler();

        handler.handle(ConnectionEvent::opened("ws://test/ws", 101)).await;
        handler.handle(ConnectionEvent::received("before")).await;
        handler
            .handle(ConnectionEvent::closed_cleanly(Some(1000), "bye"))
            .await;
        handler.handle(ConnectionEvent::received("after")).await;
        handler.handle(ConnectionEvent::closed_abnormally()).await;

        let state = shared.read().await;
        assert_eq!(state.log.entries(), ["before"]);
        assert_eq!(state.counts.closed, 1);
        assert_eq!(state.counts.discarded, 2);
        assert_eq!(*state_rx.borrow(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_failure_leaves_log_and_state_alone() {
        let (handler, shared, state_rx) = handler();

        handler.handle(ConnectionEvent::opened("ws://test/ws", 101)).await;
        handler
            .handle(ConnectionEvent::failed(FailureKind::TransportError, "reset"))
            .await;

        let state = shared.read().await;
        assert_eq!(state.counts.failed, 1);
        assert_eq!(state.log.len(), 0);
        assert_eq!(*state_rx.borrow(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_sequence() {
        let (handler, shared, state_rx) = handler();

        handler
            .handle(ConnectionEvent::failed(
                FailureKind::ConnectionOpenFailure,
                "connection refused",
            ))
            .await;
        handler.handle(ConnectionEvent::closed_abnormally()).await;

        let state = shared.read().await;
        assert_eq!(state.counts.opened, 0);
        assert_eq!(state.counts.failed, 1);
        assert_eq!(state.counts.closed, 1);
        assert_eq!(state.log.len(), 0);
        assert_eq!(*state_rx.borrow(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_run_drains_channel_in_order() {
        let (handler, shared, _state_rx) = handler();
        let (event_tx, event_rx) = mpsc::channel(8);

        let task = tokio::spawn(handler.run(event_rx));
        for payload in ["one", "two", "three"] {
            event_tx
                .send(ConnectionEvent::received(payload))
                .await
                .unwrap();
        }
        drop(event_tx);
        task.await.unwrap();

        let state = shared.read().await;
        assert_eq!(state.log.entries(), ["one", "two", "three"]);
    }
}
