//! Startup configuration, read once and never changed afterwards

use crate::error::{ChatError, Result};
use crate::names::NamePool;
use shared::{DEFAULT_NAMES, DEFAULT_PORT};
use std::collections::HashSet;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind to
    pub host: String,
    /// Port to listen on, 0 picks a free one
    pub port: u16,
    /// Maximum concurrent clients, which is also the size of the name pool
    pub max_clients: usize,
    /// Names handed out to clients, in allocation order
    pub names: Vec<String>,
    /// Upper bound on one blocking wait for readiness
    pub poll_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_clients: DEFAULT_NAMES.len(),
            names: DEFAULT_NAMES.iter().map(|n| n.to_string()).collect(),
            poll_timeout: Duration::from_millis(500),
        }
    }
}

impl ServerConfig {
    /// Checks that every client can be given a distinct name
    pub fn validate(&self) -> Result<()> {
        if self.names.is_empty() {
            return Err(ChatError::Config("at least one name is required".to_string()));
        }

        let mut seen = HashSet::new();
        for name in &self.names {
            if name.trim().is_empty() {
                return Err(ChatError::Config("names must not be blank".to_string()));
            }
            if !seen.insert(name.as_str()) {
                return Err(ChatError::Config(format!("duplicate name {}", name)));
            }
        }

        if self.max_clients == 0 {
            return Err(ChatError::Config(
                "max clients must be at least 1".to_string(),
            ));
        }

        if self.max_clients > self.names.len() {
            return Err(ChatError::Config(format!(
                "max clients {} exceeds the {} configured names",
                self.max_clients,
                self.names.len()
            )));
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let address = format!("{}:{}", self.host, self.port);
        address
            .to_socket_addrs()
            .map_err(|e| ChatError::Config(format!("invalid address {}: {}", address, e)))?
            .next()
            .ok_or_else(|| ChatError::Config(format!("{} did not resolve", address)))
    }

    /// Name pool holding the first `max_clients` names
    pub fn name_pool(&self) -> NamePool {
        NamePool::new(self.names.iter().take(self.max_clients).cloned())
    }
}
