//! Live session tracking for the chat server
//!
//! This module holds the authoritative mapping from a connection token to the
//! session it carries:
//! - Session state (display name, stream, peer address, join time)
//! - Insertion, lookup and removal keyed by connection token
//! - Iteration over every live session for broadcasting
//!
//! The registry is only touched from the event loop thread, so it carries no
//! locking of its own.

use crate::broadcast::Outbox;
use crate::error::{ChatError, Result};
use mio::Token;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// One joined client
///
/// The session owns its stream: dropping the session closes the connection.
#[derive(Debug)]
pub struct Session<S> {
    /// Connection token the stream is registered under
    pub token: Token,
    /// Display name taken from the name pool
    pub name: String,
    /// Remote address, kept for logging
    pub peer: SocketAddr,
    /// When the join completed
    pub joined_at: Instant,
    pub stream: S,
    /// Output the socket has not taken yet
    pub outbox: Outbox,
    /// Number of history messages already queued for this client
    pub delivered: usize,
    /// Whether the stream is registered for write readiness
    pub writable: bool,
}

impl<S> Session<S> {
    pub fn new(token: Token, name: String, peer: SocketAddr, stream: S) -> Self {
        Self {
            token,
            name,
            peer,
            joined_at: Instant::now(),
            stream,
            outbox: Outbox::new(),
            delivered: 0,
            writable: false,
        }
    }

    /// How long the client has been connected
    pub fn connected_for(&self) -> Duration {
        self.joined_at.elapsed()
    }
}

/// Mapping from connection token to live session
///
/// Iteration order is not meaningful; every session is visited exactly once.
pub struct SessionRegistry<S> {
    sessions: HashMap<Token, Session<S>>,
}

impl<S> SessionRegistry<S> {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// Registers a session under its token
    ///
    /// Fails if the token already carries a session; the existing entry is
    /// left untouched and the rejected session is dropped.
    pub fn insert(&mut self, session: Session<S>) -> Result<()> {
        if self.sessions.contains_key(&session.token) {
            return Err(ChatError::HandleInUse(session.token));
        }

        self.sessions.insert(session.token, session);
        Ok(())
    }

    /// Removes and returns the session for a token
    pub fn remove(&mut self, token: Token) -> Result<Session<S>> {
        self.sessions
            .remove(&token)
            .ok_or(ChatError::SessionNotFound(token))
    }

    pub fn lookup(&self, token: Token) -> Result<&Session<S>> {
        self.sessions
            .get(&token)
            .ok_or(ChatError::SessionNotFound(token))
    }

    pub fn lookup_mut(&mut self, token: Token) -> Result<&mut Session<S>> {
        self.sessions
            .get_mut(&token)
            .ok_or(ChatError::SessionNotFound(token))
    }

    pub fn contains(&self, token: Token) -> bool {
        self.sessions.contains_key(&token)
    }

    pub fn all_sessions(&self) -> impl Iterator<Item = &Session<S>> {
        self.sessions.values()
    }

    pub fn all_sessions_mut(&mut self) -> impl Iterator<Item = &mut Session<S>> {
        self.sessions.values_mut()
    }

    pub fn tokens(&self) -> Vec<Token> {
        self.sessions.keys().copied().collect()
    }

    /// Display names of every live session, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sessions.values().map(|s| s.name.clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl<S> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
