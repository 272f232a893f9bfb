//! Console command parsing

/// A single line typed at the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Print the message log as JSON
    Messages,
    /// Print the number of logged messages
    Count,
    /// Print connection state and counters
    State,
    /// Close the connection
    Close,
    /// Print command help
    Help,
    /// Leave the console
    Quit,
    /// Send the line as a text frame
    Send(String),
    /// A `:` command nobody knows about
    Unknown(String),
    /// Blank line
    Empty,
}

impl ConsoleCommand {
    /// Parse one input line.
    ///
    /// Lines starting with `:` are commands. A leading `\:` sends a literal
    /// colon. Everything else is sent as-is.
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);

        if line.trim().is_empty() {
            return ConsoleCommand::Empty;
        }

        if let Some(escaped) = line.strip_prefix('\\') {
            if escaped.starts_with(':') {
                return ConsoleCommand::Send(escaped.to_string());
            }
        }

        let Some(command) = line.trim().strip_prefix(':') else {
            return ConsoleCommand::Send(line.to_string());
        };

        match command.trim().to_ascii_lowercase().as_str() {
            "messages" | "m" => ConsoleCommand::Messages,
            "count" | "c" => ConsoleCommand::Count,
            "state" | "s" => ConsoleCommand::State,
            "close" => ConsoleCommand::Close,
            "help" | "h" | "?" => ConsoleCommand::Help,
            "quit" | "q" | "exit" => ConsoleCommand::Quit,
            other => ConsoleCommand::Unknown(other.to_string()),
        }
    }
}

/// Help text shown by `:help`
pub const HELP: &str = "\
Commands:
  :messages   print received messages as JSON
  :count      print number of received messages
  :state      print connection state and event counts
  :close      close the connection
  :help       show this help
  :quit       exit
Any other line is sent as a text message (prefix with \\ to send a leading ':').";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ConsoleCommand::parse(":messages"), ConsoleCommand::Messages);
        assert_eq!(ConsoleCommand::parse(":m"), ConsoleCommand::Messages);
        assert_eq!(ConsoleCommand::parse(":count\n"), ConsoleCommand::Count);
        assert_eq!(ConsoleCommand::parse(":STATE"), ConsoleCommand::State);
        assert_eq!(ConsoleCommand::parse(":close"), ConsoleCommand::Close);
        assert_eq!(ConsoleCommand::parse(":?"), ConsoleCommand::Help);
        assert_eq!(ConsoleCommand::parse(":q"), ConsoleCommand::Quit);
        assert_eq!(ConsoleCommand::parse("  :quit  "), ConsoleCommand::Quit);
    }

    #[test]
    fn test_parse_send() {
        assert_eq!(
            ConsoleCommand::parse("hello world\r\n"),
            ConsoleCommand::Send("hello world".to_string())
        );
        // Leading whitespace is part of the payload
        assert_eq!(
            ConsoleCommand::parse("  indented"),
            ConsoleCommand::Send("  indented".to_string())
        );
        assert_eq!(
            ConsoleCommand::parse("close"),
            ConsoleCommand::Send("close".to_string())
        );
    }

    #[test]
    fn test_parse_escaped_colon() {
        assert_eq!(
            ConsoleCommand::parse("\\:not a command"),
            ConsoleCommand::Send(":not a command".to_string())
        );
        assert_eq!(
            ConsoleCommand::parse("\\n"),
            ConsoleCommand::Send("\\n".to_string())
        );
    }

    #[test]
    fn test_parse_unknown_and_empty() {
        assert_eq!(
            ConsoleCommand::parse(":frobnicate"),
            ConsoleCommand::Unknown("frobnicate".to_string())
        );
        assert_eq!(ConsoleCommand::parse(""), ConsoleCommand::Empty);
        assert_eq!(ConsoleCommand::parse("   \n"), ConsoleCommand::Empty);
    }
}
