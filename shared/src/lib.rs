pub const DEFAULT_PORT: u16 = 9090;
pub const DEFAULT_NAMES: [&str; 4] = ["John", "Jill", "Smith", "Bella"];
pub const READ_BUFFER_SIZE: usize = 4096;

pub const GREETING_PREFIX: &str = "Your name: ";
pub const SERVER_FULL: &str = "Server is full. You will disconnect\n";

/// Notice sent to a freshly joined client carrying its display name
pub fn greeting(name: &str) -> String {
    format!("{}{}\n", GREETING_PREFIX, name)
}

/// Formats a chat line exactly as it goes over the wire.
///
/// The body is passed through untouched, so a trailing newline sent by the
/// client is the only line terminator.
pub fn chat_line(sender: &str, body: &str) -> String {
    format!("{}:{}", sender, body)
}

/// One newline-terminated line received from the server, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLine {
    Greeting { name: String },
    ServerFull,
    Chat { sender: String, body: String },
    Other(String),
}

impl ServerLine {
    /// Classifies a line with its trailing `\n` (and `\r`) already removed
    pub fn parse(line: &str) -> Self {
        if line == SERVER_FULL.trim_end_matches('\n') {
            return ServerLine::ServerFull;
        }

        if let Some(name) = line.strip_prefix(GREETING_PREFIX) {
            return ServerLine::Greeting {
                name: name.to_string(),
            };
        }

        match line.split_once(':') {
            Some((sender, body)) if !sender.is_empty() => ServerLine::Chat {
                sender: sender.to_string(),
                body: body.to_string(),
            },
            _ => ServerLine::Other(line.to_string()),
        }
    }
}
