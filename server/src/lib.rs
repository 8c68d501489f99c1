//! # Chat Server Library
//!
//! This library provides a single-process, line-oriented chat server. Clients
//! connect over TCP, are given a display name and the full message history,
//! and from then on everything a client sends is broadcast to every connected
//! client tagged with the sender's name.
//!
//! ## Core Responsibilities
//!
//! ### Connection Multiplexing
//! One thread waits on a single readiness poll covering the listening socket
//! and every client socket. Accepts and reads are non-blocking, so a slow or
//! silent client never holds up anyone else.
//!
//! ### Session Lifecycle
//! Joining, messaging and leaving are handled by the lobby:
//! - Capacity check and name assignment on join
//! - Greeting and history replay before the client is subscribed for reads
//! - Teardown on end of stream, read errors and failed writes
//!
//! ### Broadcasting
//! Every message is appended to the history and written to every live
//! session. Output a socket cannot take yet waits in that session's outbox
//! until the socket is writable again. A failed write only affects the
//! client it was meant for.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! All state (name pool, session registry, history) is owned by the lobby and
//! only touched from the event loop thread. Handlers run to completion one
//! after another, which gives a single global message order without locks.
//!
//! ## Module Organization
//!
//! - `names`: pool of assignable display names, reused most recent first
//! - `session`: sessions and the registry keyed by connection token
//! - `history`: append-only message log replayed to new clients
//! - `broadcast`: per-session outboxes and fan-out writes
//! - `lobby`: join, message and leave transitions
//! - `network`: the `mio` event loop and shutdown handle
//! - `config`: startup configuration
//! - `error`: error type shared by all of the above
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Listen on 0.0.0.0:9090 with room for four clients
//!     let config = ServerConfig::default();
//!     let mut server = Server::bind(&config)?;
//!
//!     // Runs until a shutdown is requested through `server.shutdown_handle()`
//!     server.run()?;
//!
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod error;
pub mod history;
pub mod lobby;
pub mod names;
pub mod network;
pub mod session;

#[cfg(test)]
mod mock;

pub use config::ServerConfig;
pub use error::{ChatError, Result};
pub use network::{Server, ShutdownHandle};
