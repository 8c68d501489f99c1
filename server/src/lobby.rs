//! Session lifecycle for the chat server
//!
//! The lobby owns the name pool, the session registry and the history log,
//! and is the only code that mutates them. It implements three transitions:
//! - join: capacity check, name allocation, greeting, history replay and
//!   read subscription, all or nothing
//! - message: read what a client sent, record it, broadcast it
//! - leave: unsubscribe, unregister, reclaim the name, close the stream
//!
//! Every transition runs to completion on the event loop thread before the
//! next one starts. Output that a socket cannot take yet stays in the
//! session's outbox and is written when the socket becomes writable.

use crate::broadcast::{pump, send_all, send_one};
use crate::error::{ChatError, Result};
use crate::history::{HistoryLog, Message};
use crate::names::NamePool;
use crate::session::{Session, SessionRegistry};
use log::{debug, info, warn};
use mio::{Interest, Token};
use shared::{greeting, READ_BUFFER_SIZE, SERVER_FULL};
use std::io::{self, ErrorKind, Read, Write};
use std::net::SocketAddr;

/// Reads served per readiness notification before other clients get a turn
pub const MAX_READS_PER_PASS: usize = 1;

/// Readiness registration for client streams
///
/// Implemented by the poll registry in production and by a recorder in tests.
pub trait Subscriber<S> {
    fn subscribe(&self, stream: &mut S, token: Token, interest: Interest) -> io::Result<()>;
    fn resubscribe(&self, stream: &mut S, token: Token, interest: Interest) -> io::Result<()>;
    fn unsubscribe(&self, stream: &mut S, token: Token) -> io::Result<()>;
}

fn interest_for(wants_write: bool) -> Interest {
    if wants_write {
        Interest::READABLE | Interest::WRITABLE
    } else {
        Interest::READABLE
    }
}

pub struct Lobby<S> {
    names: NamePool,
    sessions: SessionRegistry<S>,
    history: HistoryLog,
}

impl<S: Read + Write> Lobby<S> {
    pub fn new(names: NamePool) -> Self {
        Self {
            names,
            sessions: SessionRegistry::new(),
            history: HistoryLog::new(),
        }
    }

    /// Admits a freshly accepted connection
    ///
    /// Returns the assigned name. When the server is full the client gets the
    /// server-full notice, the stream is closed and `CapacityExhausted` is
    /// returned without touching the pool. Any failure after a name was
    /// allocated rolls the join back: the name goes back to the pool, no
    /// session stays registered and the stream is closed.
    pub fn join<R: Subscriber<S>>(
        &mut self,
        token: Token,
        mut stream: S,
        peer: SocketAddr,
        subscriber: &R,
    ) -> Result<String> {
        if !self.names.has_capacity() {
            info!("Got new connection from {}, but server is full", peer);
            if let Err(e) = send_one(&mut stream, SERVER_FULL) {
                debug!("Could not deliver server-full notice to {}: {}", peer, e);
            }
            return Err(ChatError::CapacityExhausted);
        }

        let name = self.names.allocate()?;

        if let Err(e) = self
            .sessions
            .insert(Session::new(token, name.clone(), peer, stream))
        {
            warn!("Rejecting connection from {}: {}", peer, e);
            self.names.release(name);
            return Err(e);
        }

        if let Err(e) = self.complete_join(token, subscriber) {
            warn!("Join of {} as {} failed: {}", peer, name, e);
            if let Ok(session) = self.sessions.remove(token) {
                self.names.release(session.name);
            }
            return Err(e);
        }

        info!("{} connected as {}", peer, name);
        info!("Accepted new connection. Places left: {}", self.names.len());
        Ok(name)
    }

    /// Greets a registered session, starts its history replay and subscribes it
    ///
    /// Whatever the socket does not take now is written on later writable
    /// events, greeting first and history after it.
    fn complete_join<R: Subscriber<S>>(&mut self, token: Token, subscriber: &R) -> Result<()> {
        let session = self.sessions.lookup_mut(token)?;

        session.outbox.push(&greeting(&session.name));
        pump(session, &self.history)?;

        let wants_write = !session.outbox.is_empty();
        subscriber.subscribe(&mut session.stream, token, interest_for(wants_write))?;
        session.writable = wants_write;

        Ok(())
    }

    /// Handles a read-readiness notification for a client
    ///
    /// Serves at most [`MAX_READS_PER_PASS`] reads so one busy client cannot
    /// hold the loop. Returns true when the client may still have unread
    /// data; readiness is edge-triggered, so the caller has to come back
    /// without waiting for another notification. End of stream or a read
    /// error tears the session down.
    pub fn on_readable<R: Subscriber<S>>(&mut self, token: Token, subscriber: &R) -> bool {
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        let mut reads = 0;

        while reads < MAX_READS_PER_PASS {
            let session = match self.sessions.lookup_mut(token) {
                Ok(session) => session,
                Err(e) => {
                    debug!("Readable event without a session: {}", e);
                    self.leave(token, subscriber);
                    return false;
                }
            };

            match session.stream.read(&mut buffer) {
                Ok(0) => {
                    self.leave(token, subscriber);
                    return false;
                }
                Ok(n) => {
                    reads += 1;
                    let body = String::from_utf8_lossy(&buffer[..n]).into_owned();
                    let message = Message::new(session.name.clone(), body);
                    self.publish(message, subscriber);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return false,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    let err = ChatError::TransportRead(e);
                    warn!("{} ({}): {}", session.name, session.peer, err);
                    self.leave(token, subscriber);
                    return false;
                }
            }
        }

        self.sessions.contains(token)
    }

    /// Handles a write-readiness notification: flushes queued output
    pub fn on_writable<R: Subscriber<S>>(&mut self, token: Token, subscriber: &R) {
        let session = match self.sessions.lookup_mut(token) {
            Ok(session) => session,
            Err(e) => {
                debug!("Writable event without a session: {}", e);
                return;
            }
        };

        if let Err(e) = pump(session, &self.history) {
            warn!("{} ({}): {}", session.name, session.peer, e);
            self.leave(token, subscriber);
            return;
        }

        if let Err(e) = self.sync_interest(token, subscriber) {
            warn!("Failed to update readiness for {:?}: {}", token, e);
            self.leave(token, subscriber);
        }
    }

    /// Records a message and sends it to every live session
    fn publish<R: Subscriber<S>>(&mut self, message: Message, subscriber: &R) {
        debug!("Message from {} ({} bytes)", message.sender, message.body.len());
        self.history.append(message);

        for token in send_all(&mut self.sessions, &self.history) {
            self.leave(token, subscriber);
        }

        for token in self.sessions.tokens() {
            if let Err(e) = self.sync_interest(token, subscriber) {
                warn!("Failed to update readiness for {:?}: {}", token, e);
                self.leave(token, subscriber);
            }
        }
    }

    /// Asks for write readiness exactly while a session has queued output
    fn sync_interest<R: Subscriber<S>>(&mut self, token: Token, subscriber: &R) -> Result<()> {
        let session = self.sessions.lookup_mut(token)?;
        let wants_write = !session.outbox.is_empty();

        if wants_write != session.writable {
            subscriber.resubscribe(&mut session.stream, token, interest_for(wants_write))?;
            session.writable = wants_write;
            debug!(
                "{} {} output",
                session.name,
                if wants_write { "is queueing" } else { "drained its" }
            );
        }

        Ok(())
    }

    /// Tears a session down
    ///
    /// Returns false when the token has no session, which happens when a
    /// teardown was already triggered for it. Calling this repeatedly for
    /// the same token is harmless.
    pub fn leave<R: Subscriber<S>>(&mut self, token: Token, subscriber: &R) -> bool {
        let mut session = match self.sessions.remove(token) {
            Ok(session) => session,
            Err(e) => {
                debug!("Nothing to tear down: {}", e);
                return false;
            }
        };

        if let Err(e) = subscriber.unsubscribe(&mut session.stream, token) {
            debug!("Failed to unsubscribe {}: {}", session.name, e);
        }

        if !session.outbox.is_empty() {
            debug!(
                "Dropping {} unsent bytes for {}",
                session.outbox.queued_bytes(),
                session.name
            );
        }

        info!(
            "{} ({}) disconnected after {:.1?}",
            session.name,
            session.peer,
            session.connected_for()
        );
        self.names.release(session.name);
        info!("Client disconnected. Places left: {}", self.names.len());

        // Dropping what is left of the session closes the stream
        true
    }

    /// Tears down every live session
    pub fn close_all<R: Subscriber<S>>(&mut self, subscriber: &R) {
        for token in self.sessions.tokens() {
            self.leave(token, subscriber);
        }
    }
}

impl<S> Lobby<S> {
    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn available_names(&self) -> Vec<String> {
        self.names.available()
    }

    pub fn capacity(&self) -> usize {
        self.names.capacity()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Names of every live session, sorted
    pub fn session_names(&self) -> Vec<String> {
        self.sessions.names()
    }

    pub fn name_of(&self, token: Token) -> Option<&str> {
        self.sessions.lookup(token).ok().map(|s| s.name.as_str())
    }

    /// Bytes queued for a session that its socket has not taken yet
    pub fn queued_bytes(&self, token: Token) -> Option<usize> {
        self.sessions
            .lookup(token)
            .ok()
            .map(|s| s.outbox.queued_bytes())
    }
}
