//! Interactive console
//!
//! Reads commands from stdin so the message log and connection can be
//! inspected while the monitor runs.

mod command;

pub use command::*;

use std::io::BufRead;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::monitor::MonitorContext;

/// What the console should do after a command
#[derive(Debug, PartialEq, Eq)]
pub enum Response {
    /// Print this text
    Print(String),
    /// Nothing to show
    Silent,
    /// Stop reading input
    Quit,
}

/// Why the console stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    /// `:quit` was entered
    Quit,
    /// Input reached end of file
    InputClosed,
}

/// Execute a parsed command against the monitored connection
pub async fn execute(context: &MonitorContext, command: ConsoleCommand) -> Response {
    match command {
        ConsoleCommand::Messages => match context.messages_json().await {
            Ok(json) => Response::Print(json),
            Err(e) => Response::Print(format!("error: {}", e)),
        },
        ConsoleCommand::Count => Response::Print(context.messages().await.len().to_string()),
        ConsoleCommand::State => {
            let summary = context.summary().await;
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => Response::Print(json),
                Err(e) => Response::Print(format!("error: {}", e)),
            }
        }
        ConsoleCommand::Close => match context.close() {
            Ok(()) => Response::Silent,
            Err(e) => Response::Print(format!("error: {}", e)),
        },
        ConsoleCommand::Help => Response::Print(HELP.to_string()),
        ConsoleCommand::Quit => Response::Quit,
        ConsoleCommand::Send(text) => match context.send(text) {
            Ok(()) => Response::Silent,
            Err(e) => {
                warn!("Message not sent: {}", e);
                Response::Print(format!("error: {}", e))
            }
        },
        ConsoleCommand::Unknown(name) => {
            Response::Print(format!("unknown command ':{}' (try :help)", name))
        }
        ConsoleCommand::Empty => Response::Silent,
    }
}

/// Run the console over `lines` until the input ends or `:quit` is entered
pub async fn run(context: &MonitorContext, lines: &mut mpsc::Receiver<String>) -> ConsoleExit {
    while let Some(line) = lines.recv().await {
        match execute(context, ConsoleCommand::parse(&line)).await {
            Response::Print(text) => println!("{}", text),
            Response::Silent => {}
            Response::Quit => {
                debug!("Console quit requested");
                return ConsoleExit::Quit;
            }
        }
    }

    debug!("Console input closed");
    ConsoleExit::InputClosed
}

/// Run the console on the process's stdin.
///
/// Stdin is read on a detached thread so a pending read never holds up
/// runtime shutdown.
pub async fn run_stdin(context: MonitorContext) -> ConsoleExit {
    let (line_tx, mut line_rx) = mpsc::channel(64);

    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });

    println!("{}", HELP);
    run(&context, &mut line_rx).await
}
