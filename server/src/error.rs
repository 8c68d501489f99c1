//! Error types for the chat server

use mio::Token;
use std::io;
use thiserror::Error;

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, ChatError>;

#[derive(Debug, Error)]
pub enum ChatError {
    /// Every display name is in use; the joining client gets the server-full notice
    #[error("no display names left, server is full")]
    CapacityExhausted,

    /// Lookup or removal of a connection that is not (or no longer) registered
    #[error("no session registered for connection {0:?}")]
    SessionNotFound(Token),

    #[error("connection {0:?} already has a session")]
    HandleInUse(Token),

    #[error("failed to write to client: {0}")]
    TransportWrite(#[source] io::Error),

    #[error("failed to read from client: {0}")]
    TransportRead(#[source] io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}
