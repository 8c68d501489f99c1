//! # Chat Client Library
//!
//! Terminal client for the line-oriented chat server. Everything the server
//! sends is printed verbatim, and every line typed on stdin is sent to the
//! server with its newline.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! - TCP connection to the server
//! - Forwarding of stdin lines and printing of server output
//! - Tracking of the assigned name and server-full rejections
//!
//! ### Lines Module (`lines`)
//! - Reassembly of newline-terminated lines from arbitrary read chunks
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::ChatClient;
//! use tokio::io::{stdin, stdout, BufReader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = ChatClient::connect("127.0.0.1:9090").await?;
//!     client.run(BufReader::new(stdin()), stdout()).await?;
//!     Ok(())
//! }
//! ```

pub mod lines;
pub mod network;
