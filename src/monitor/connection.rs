//! WebSocket connection monitor
//!
//! Opens one client connection, turns everything the transport sees into
//! [`ConnectionEvent`]s and hands back a [`MonitorContext`] for inspection.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, watch, RwLock};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    ConnectionEvent, ConnectionState, EventCounts, EventHandler, FailureKind, MonitorState,
};
use crate::config::MonitorConfig;

/// Errors returned by [`MonitorContext`] operations
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Connection is not open (state: {0})")]
    NotOpen(ConnectionState),

    #[error("Connection task has stopped")]
    TransportGone,

    #[error("Failed to render message log: {0}")]
    Render(#[from] serde_json::Error),
}

/// Result type for monitor operations
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Point-in-time view of a monitored connection
#[derive(Debug, Clone, Serialize)]
pub struct MonitorSummary {
    pub connection_id: Uuid,
    pub endpoint: String,
    pub state: ConnectionState,
    pub counts: EventCounts,
    pub messages: usize,
    pub bytes: usize,
    pub last_message: Option<String>,
}

/// Requests sent from the context to the transport task
#[derive(Debug)]
enum Command {
    Send(String),
    Close,
}

/// Entry point for monitoring a single WebSocket endpoint
pub struct ConnectionMonitor;

impl ConnectionMonitor {
    /// Start monitoring the configured endpoint.
    ///
    /// Spawns the transport and handler tasks and returns immediately; the
    /// handshake happens in the background. Connection failures are reported
    /// only as diagnostics. Must be called from within a Tokio runtime.
    pub fn initialize(config: &MonitorConfig) -> MonitorContext {
        let connection_id = Uuid::new_v4();
        let shared = Arc::new(RwLock::new(MonitorState::default()));
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (event_tx, event_rx) = mpsc::channel(config.event_buffer.max(1));
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let handler = EventHandler::new(
            connection_id,
            Arc::clone(&shared),
            state_tx,
            config.log_payloads,
        );
        tokio::spawn(handler.run(event_rx));

        let endpoint = config.endpoint.clone();
        tokio::spawn(run_transport(
            connection_id,
            endpoint.clone(),
            event_tx,
            command_rx,
        ));

        MonitorContext {
            connection_id,
            endpoint,
            shared,
            state_rx,
            command_tx,
        }
    }
}

/// Handle to a monitored connection and its message log
#[derive(Clone)]
pub struct MonitorContext {
    connection_id: Uuid,
    endpoint: String,
    shared: Arc<RwLock<MonitorState>>,
    state_rx: watch::Receiver<ConnectionState>,
    command_tx: mpsc::UnboundedSender<Command>,
}

impl MonitorContext {
    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Snapshot of every payload received so far, in arrival order
    pub async fn messages(&self) -> Vec<String> {
        self.shared.read().await.log.entries().to_vec()
    }

    /// The message log as a pretty-printed JSON array
    pub async fn messages_json(&self) -> MonitorResult<String> {
        Ok(self.shared.read().await.log.to_json()?)
    }

    /// Snapshot of the per-event counters
    pub async fn counts(&self) -> EventCounts {
        self.shared.read().await.counts
    }

    /// Current state, counters and log totals in one snapshot
    pub async fn summary(&self) -> MonitorSummary {
        let shared = self.shared.read().await;
        MonitorSummary {
            connection_id: self.connection_id,
            endpoint: self.endpoint.clone(),
            state: self.state(),
            counts: shared.counts,
            messages: shared.log.len(),
            bytes: shared.log.total_bytes(),
            last_message: shared.log.last().map(str::to_string),
        }
    }

    /// Queue a text frame on the open connection
    pub fn send(&self, text: impl Into<String>) -> MonitorResult<()> {
        let state = self.state();
        if !state.is_open() {
            return Err(MonitorError::NotOpen(state));
        }
        self.command_tx
            .send(Command::Send(text.into()))
            .map_err(|_| MonitorError::TransportGone)
    }

    /// Request a normal close. Does nothing once the connection is closed.
    pub fn close(&self) -> MonitorResult<()> {
        if self.state() == ConnectionState::Closed {
            return Ok(());
        }
        self.command_tx
            .send(Command::Close)
            .map_err(|_| MonitorError::TransportGone)
    }

    /// Wait until the connection reaches `target`
    pub async fn wait_for_state(&self, target: ConnectionState) -> MonitorResult<()> {
        let mut state_rx = self.state_rx.clone();
        let reached = state_rx.wait_for(|state| *state == target).await.is_ok();
        if reached {
            Ok(())
        } else {
            Err(MonitorError::TransportGone)
        }
    }

    /// Wait until the connection is closed
    pub async fn wait_closed(&self) {
        if self.wait_for_state(ConnectionState::Closed).await.is_err() {
            debug!(connection = %self.connection_id, "State channel dropped before close");
        }
    }
}

async fn emit(event_tx: &mpsc::Sender<ConnectionEvent>, event: ConnectionEvent) {
    if event_tx.send(event).await.is_err() {
        debug!("Event handler gone, dropping event");
    }
}

/// Connect, then pump frames and commands until the connection ends.
///
/// Always finishes with exactly one `Closed` event.
async fn run_transport(
    connection_id: Uuid,
    endpoint: String,
    event_tx: mpsc::Sender<ConnectionEvent>,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
) {
    info!(connection = %connection_id, %endpoint, "Connecting");

    let (ws_stream, response) = match connect_async(endpoint.as_str()).await {
        Ok(pair) => pair,
        Err(e) => {
            emit(
                &event_tx,
                ConnectionEvent::failed(FailureKind::ConnectionOpenFailure, &e),
            )
            .await;
            emit(&event_tx, ConnectionEvent::closed_abnormally()).await;
            return;
        }
    };

    emit(
        &event_tx,
        ConnectionEvent::opened(endpoint.as_str(), response.status().as_u16()),
    )
    .await;

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let mut commands_open = true;
    let mut close_sent = false;

    loop {
        tokio::select! {
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        emit(&event_tx, ConnectionEvent::received(text)).await;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        warn!(connection = %connection_id, "Received binary message ({} bytes), ignoring", data.len());
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        // Pings are answered by the protocol layer
                    }
                    Some(Ok(Message::Frame(_))) => {
                        // Raw frame, ignore
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let event = match frame {
                            Some(frame) => ConnectionEvent::closed_cleanly(
                                Some(u16::from(frame.code)),
                                frame.reason.into_owned(),
                            ),
                            None => ConnectionEvent::closed_cleanly(None, ""),
                        };
                        emit(&event_tx, event).await;
                        break;
                    }
                    Some(Err(e)) => {
                        emit(&event_tx, ConnectionEvent::failed(FailureKind::TransportError, &e)).await;
                        emit(&event_tx, ConnectionEvent::closed_abnormally()).await;
                        break;
                    }
                    None => {
                        emit(&event_tx, ConnectionEvent::closed_abnormally()).await;
                        break;
                    }
                }
            }
            command = command_rx.recv(), if commands_open => {
                let outgoing = match command {
                    Some(Command::Send(_)) if close_sent => {
                        warn!(connection = %connection_id, "Connection is closing, message not sent");
                        continue;
                    }
                    Some(Command::Send(text)) => {
                        debug!(connection = %connection_id, length = text.len(), "Sending message");
                        Message::Text(text)
                    }
                    Some(Command::Close) if close_sent => {
                        debug!(connection = %connection_id, "Close already requested");
                        continue;
                    }
                    Some(Command::Close) => {
                        info!(connection = %connection_id, "Closing connection");
                        close_sent = true;
                        Message::Close(Some(CloseFrame {
                            code: CloseCode::Normal,
                            reason: "".into(),
                        }))
                    }
                    None => {
                        commands_open = false;
                        continue;
                    }
                };

                if let Err(e) = ws_sender.send(outgoing).await {
                    emit(&event_tx, ConnectionEvent::failed(FailureKind::TransportError, &e)).await;
                    emit(&event_tx, ConnectionEvent::closed_abnormally()).await;
                    break;
                }
            }
        }
    }

    // Flush any pending close reply before the socket is dropped
    if let Err(e) = ws_sender.close().await {
        debug!(connection = %connection_id, "Close after shutdown: {}", e);
    }
    debug!(connection = %connection_id, "Transport task finished");
}
