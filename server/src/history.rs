//! Append-only record of every chat message since startup

use crate::broadcast::Outbox;

/// A chat message as it was received
///
/// The sender's name is copied at send time, so the record stays valid after
/// the sender leaves and the name is handed to someone else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: String,
    pub body: String,
}

impl Message {
    pub fn new(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
        }
    }

    /// Wire form of the message, `<sender>:<body>`
    pub fn to_line(&self) -> String {
        shared::chat_line(&self.sender, &self.body)
    }
}

/// Messages in arrival order; nothing is ever evicted
#[derive(Debug, Default)]
pub struct HistoryLog {
    messages: Vec<Message>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Queues messages for one client, oldest first, starting at `from`
    ///
    /// Stops once the outbox is full or the log is exhausted and returns the
    /// index of the first message not queued. Writing and error handling are
    /// up to whoever flushes the outbox.
    pub fn replay_into(&self, from: usize, outbox: &mut Outbox) -> usize {
        let mut next = from;
        while next < self.messages.len() && outbox.has_room() {
            outbox.push(&self.messages[next].to_line());
            next += 1;
        }
        next
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::OUTBOX_WINDOW;

    /// Flushes an outbox into a plain buffer
    fn drain(outbox: &mut Outbox) -> Vec<u8> {
        let mut out = Vec::new();
        outbox.flush(&mut out).unwrap();
        out
    }

    #[test]
    fn test_message_line_format() {
        let message = Message::new("John", "hi\n");
        assert_eq!(message.to_line(), "John:hi\n");
    }

    #[test]
    fn test_append_preserves_order() {
        let mut history = HistoryLog::new();
        assert!(history.is_empty());

        history.append(Message::new("John", "one\n"));
        history.append(Message::new("Jill", "two\n"));
        history.append(Message::new("John", "three\n"));

        assert_eq!(history.len(), 3);
        let bodies: Vec<&str> = history.messages().iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["one\n", "two\n", "three\n"]);
    }

    #[test]
    fn test_earlier_snapshot_is_prefix() {
        let mut history = HistoryLog::new();
        history.append(Message::new("John", "a\n"));
        let before = history.messages().to_vec();

        history.append(Message::new("Jill", "b\n"));
        assert!(history.messages().starts_with(&before));
    }

    #[test]
    fn test_replay_queues_everything_in_order() {
        let mut history = HistoryLog::new();
        history.append(Message::new("John", "hi\n"));
        history.append(Message::new("Jill", "hello\n"));

        let mut outbox = Outbox::new();
        assert_eq!(history.replay_into(0, &mut outbox), 2);
        assert_eq!(drain(&mut outbox), b"John:hi\nJill:hello\n");
    }

    #[test]
    fn test_replay_from_cursor() {
        let mut history = HistoryLog::new();
        history.append(Message::new("John", "old\n"));
        history.append(Message::new("Jill", "new\n"));

        let mut outbox = Outbox::new();
        assert_eq!(history.replay_into(1, &mut outbox), 2);
        assert_eq!(drain(&mut outbox), b"Jill:new\n");
        assert_eq!(history.replay_into(2, &mut outbox), 2);
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_replay_empty_history_queues_nothing() {
        let history = HistoryLog::new();
        let mut outbox = Outbox::new();
        assert_eq!(history.replay_into(0, &mut outbox), 0);
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_replay_stops_at_full_outbox() {
        let mut history = HistoryLog::new();
        let body = "z".repeat(4096);
        for _ in 0..40 {
            history.append(Message::new("Smith", body.as_str()));
        }

        let mut outbox = Outbox::new();
        let next = history.replay_into(0, &mut outbox);

        // Each line is 4102 bytes, so the window fills after 16 of them
        assert_eq!(next, 16);
        assert!(!outbox.has_room());
        assert!(outbox.queued_bytes() < OUTBOX_WINDOW + 4102);

        drain(&mut outbox);
        assert_eq!(history.replay_into(next, &mut outbox), 32);
    }
}
