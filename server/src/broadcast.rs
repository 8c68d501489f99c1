//! Writing to one client or to every live session
//!
//! Client sockets are non-blocking, so output for a session goes through its
//! [`Outbox`]. Whatever the socket will not take right now stays queued until
//! the poll reports the socket writable again. History is pulled into the
//! outbox a window at a time, so a client that is far behind costs a cursor
//! into the log rather than a private copy of it.

use crate::error::{ChatError, Result};
use crate::history::HistoryLog;
use crate::session::{Session, SessionRegistry};
use log::warn;
use mio::Token;
use std::collections::VecDeque;
use std::io::{ErrorKind, Write};

/// Queued bytes above which no more history is pulled into an outbox
pub const OUTBOX_WINDOW: usize = 64 * 1024;

/// How far a flush got
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flush {
    /// Everything queued was written
    Drained,
    /// The socket would block; the rest is still queued
    Blocked,
}

/// Bytes waiting to be written to one client, oldest first
#[derive(Debug, Default)]
pub struct Outbox {
    chunks: VecDeque<Vec<u8>>,
    /// Bytes of the front chunk already written
    offset: usize,
    queued: usize,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.queued += text.len();
        self.chunks.push_back(text.as_bytes().to_vec());
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn queued_bytes(&self) -> usize {
        self.queued
    }

    /// True while more history may be pulled in
    pub fn has_room(&self) -> bool {
        self.queued < OUTBOX_WINDOW
    }

    /// Writes queued bytes until the queue is empty or the socket would block
    ///
    /// Only a real I/O error is reported as a failure.
    pub fn flush<W: Write>(&mut self, stream: &mut W) -> Result<Flush> {
        while let Some(front) = self.chunks.front() {
            match stream.write(&front[self.offset..]) {
                Ok(0) => {
                    return Err(ChatError::TransportWrite(ErrorKind::WriteZero.into()));
                }
                Ok(n) => {
                    self.offset += n;
                    self.queued -= n;
                    if self.offset == front.len() {
                        self.chunks.pop_front();
                        self.offset = 0;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(Flush::Blocked),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ChatError::TransportWrite(e)),
            }
        }

        Ok(Flush::Drained)
    }
}

/// Writes one piece of text straight to a client, bypassing any outbox
///
/// Only used for the server-full notice, which goes to a client that never
/// becomes a session.
pub fn send_one<W: Write>(stream: &mut W, text: &str) -> Result<()> {
    stream
        .write_all(text.as_bytes())
        .and_then(|_| stream.flush())
        .map_err(ChatError::TransportWrite)
}

/// Moves as much of a session's pending output as its socket takes right now
///
/// Tops the outbox up from history each time it runs low, so the session
/// receives every message after its greeting in log order.
pub fn pump<S: Write>(session: &mut Session<S>, history: &HistoryLog) -> Result<Flush> {
    loop {
        if session.outbox.has_room() {
            session.delivered = history.replay_into(session.delivered, &mut session.outbox);
        }

        match session.outbox.flush(&mut session.stream)? {
            Flush::Blocked => return Ok(Flush::Blocked),
            Flush::Drained if session.delivered >= history.len() => return Ok(Flush::Drained),
            Flush::Drained => {}
        }
    }
}

/// Delivers the newest history entries to every live session, the sender
/// included
///
/// A failed write never stops delivery to the remaining sessions. The tokens
/// of the sessions that failed are returned so the caller can tear them down.
/// A session whose socket is full keeps its place in the log and is not a
/// failure.
pub fn send_all<S: Write>(sessions: &mut SessionRegistry<S>, history: &HistoryLog) -> Vec<Token> {
    let mut failed = Vec::new();

    for session in sessions.all_sessions_mut() {
        if let Err(e) = pump(session, history) {
            warn!("Failed to send to {} ({}): {}", session.name, session.peer, e);
            failed.push(session.token);
        }
    }

    failed
}
