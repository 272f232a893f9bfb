//! Connection monitor module
//!
//! Observes a single WebSocket connection and keeps every received payload in
//! an in-memory log for inspection.

mod connection;
mod event;
mod handler;
mod log;

pub use connection::*;
pub use event::*;
pub use handler::*;
pub use log::*;
