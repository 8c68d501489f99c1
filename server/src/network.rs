//! Server network layer: the readiness-polling event loop
//!
//! One thread blocks in a single `mio::Poll` over the listening socket, every
//! joined client socket and a shutdown waker. Each readiness notification is
//! turned into [`Event`]s and dispatched to the lobby, which runs each to
//! completion before the next one is looked at. Sockets are non-blocking and
//! a client gets a bounded number of reads per pass, so neither a slow nor a
//! chatty peer can stall the loop. Clients that may still have unread data
//! are served again on the next pass, which then polls without waiting.

use crate::config::ServerConfig;
use crate::error::Result;
use crate::lobby::{Lobby, Subscriber};
use log::{debug, error, info, warn};
use mio::event::Source;
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Registry, Token, Waker};
use std::collections::HashSet;
use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const LISTENER: Token = Token(0);
const WAKER: Token = Token(1);
const FIRST_CLIENT: usize = 2;

const EVENT_CAPACITY: usize = 128;

/// What a readiness notification asks the loop to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The listening socket has connections waiting
    Accept,
    /// A client socket has data, end of stream or an error waiting
    Read(Token),
    /// A client socket can take more of its queued output
    Write(Token),
    /// The shutdown handle woke the poll
    Wake,
}

impl Event {
    /// Translates one notification, writes first so queued output goes out
    /// before anything new is read
    pub fn from_readiness(token: Token, readable: bool, writable: bool) -> Vec<Event> {
        match token {
            LISTENER => vec![Event::Accept],
            WAKER => vec![Event::Wake],
            token => {
                let mut events = Vec::with_capacity(2);
                if writable {
                    events.push(Event::Write(token));
                }
                if readable {
                    events.push(Event::Read(token));
                }
                events
            }
        }
    }
}

impl<S: Source> Subscriber<S> for Registry {
    fn subscribe(&self, stream: &mut S, token: Token, interest: Interest) -> io::Result<()> {
        self.register(stream, token, interest)
    }

    fn resubscribe(&self, stream: &mut S, token: Token, interest: Interest) -> io::Result<()> {
        self.reregister(stream, token, interest)
    }

    fn unsubscribe(&self, stream: &mut S, _token: Token) -> io::Result<()> {
        self.deregister(stream)
    }
}

/// Stops a running [`Server`] from another thread
#[derive(Clone)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    /// Asks the loop to exit after the current pass
    pub fn shutdown(&self) -> Result<()> {
        self.requested.store(true, Ordering::SeqCst);
        self.waker.wake()?;
        Ok(())
    }
}

/// Chat server coordinating the listener, the poll and the lobby
pub struct Server {
    poll: Poll,
    listener: TcpListener,
    lobby: Lobby<TcpStream>,
    poll_timeout: Duration,
    next_token: usize,
    /// Clients whose last pass ended before their socket ran dry
    pending_reads: HashSet<Token>,
    shutdown_requested: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl Server {
    /// Binds the listening socket described by the configuration
    pub fn bind(config: &ServerConfig) -> Result<Self> {
        config.validate()?;
        let addr = config.bind_addr()?;
        let listener = TcpListener::bind(addr)?;
        Self::from_listener(listener, config)
    }

    /// Builds a server around an already bound listener
    pub fn from_listener(mut listener: TcpListener, config: &ServerConfig) -> Result<Self> {
        config.validate()?;

        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKER)?);

        info!("Server is listening on {}", listener.local_addr()?);
        info!("Server can accept {} connections", config.max_clients);

        Ok(Server {
            poll,
            listener,
            lobby: Lobby::new(config.name_pool()),
            poll_timeout: config.poll_timeout,
            next_token: FIRST_CLIENT,
            pending_reads: HashSet::new(),
            shutdown_requested: Arc::new(AtomicBool::new(false)),
            waker,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            requested: Arc::clone(&self.shutdown_requested),
            waker: Arc::clone(&self.waker),
        }
    }

    pub fn lobby(&self) -> &Lobby<TcpStream> {
        &self.lobby
    }

    /// Main server loop
    ///
    /// Runs until a shutdown is requested. Only a failure of the poll itself
    /// ends the loop with an error; client failures are handled per session.
    pub fn run(&mut self) -> Result<()> {
        let mut events = Events::with_capacity(EVENT_CAPACITY);
        info!("Server started successfully");

        loop {
            let timeout = if self.pending_reads.is_empty() {
                self.poll_timeout
            } else {
                Duration::ZERO
            };

            if let Err(e) = self.poll.poll(&mut events, Some(timeout)) {
                if e.kind() == ErrorKind::Interrupted {
                    continue;
                }
                error!("Polling failed: {}", e);
                return Err(e.into());
            }

            let mut carried = std::mem::take(&mut self.pending_reads);

            for event in events.iter() {
                let readable = event.is_readable() || event.is_read_closed() || event.is_error();
                let writable = event.is_writable() || event.is_write_closed();

                for next in Event::from_readiness(event.token(), readable, writable) {
                    if let Event::Read(token) = next {
                        carried.remove(&token);
                    }
                    self.dispatch(next);
                }
            }

            for token in carried {
                self.read_from(token);
            }

            if self.shutdown_requested.load(Ordering::SeqCst) {
                info!("Server shutting down");
                self.lobby.close_all(self.poll.registry());
                break;
            }
        }

        Ok(())
    }

    fn dispatch(&mut self, event: Event) {
        match event {
            Event::Accept => self.accept_pending(),
            Event::Read(token) => self.read_from(token),
            Event::Write(token) => self.lobby.on_writable(token, self.poll.registry()),
            Event::Wake => debug!("Woken for shutdown"),
        }
    }

    fn read_from(&mut self, token: Token) {
        if self.lobby.on_readable(token, self.poll.registry()) {
            self.pending_reads.insert(token);
        }
    }

    /// Accepts every queued connection and hands each to the lobby
    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    let token = Token(self.next_token);
                    self.next_token += 1;

                    if let Err(e) = self
                        .lobby
                        .join(token, stream, peer, self.poll.registry())
                    {
                        debug!("Connection from {} not admitted: {}", peer, e);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::thread;

    #[test]
    fn test_event_from_readiness() {
        assert_eq!(Event::from_readiness(Token(0), true, false), vec![Event::Accept]);
        assert_eq!(Event::from_readiness(Token(1), true, false), vec![Event::Wake]);
        assert_eq!(
            Event::from_readiness(Token(2), true, false),
            vec![Event::Read(Token(2))]
        );
        assert_eq!(
            Event::from_readiness(Token(77), false, true),
            vec![Event::Write(Token(77))]
        );
        assert_eq!(
            Event::from_readiness(Token(5), true, true),
            vec![Event::Write(Token(5)), Event::Read(Token(5))]
        );
        assert!(Event::from_readiness(Token(5), false, false).is_empty());
    }

    fn test_config(names: &[&str]) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_clients: names.len(),
            names: names.iter().map(|n| n.to_string()).collect(),
            poll_timeout: Duration::from_millis(50),
        }
    }

    #[test]
    fn test_bind_ephemeral_port() {
        let server = Server::bind(&test_config(&["John"])).unwrap();
        let addr = server.local_addr().unwrap();

        assert_ne!(addr.port(), 0);
        assert_eq!(server.lobby().capacity(), 1);
        assert_eq!(server.lobby().session_count(), 0);
    }

    #[test]
    fn test_bind_rejects_invalid_config() {
        let mut config = test_config(&["John"]);
        config.max_clients = 0;
        assert!(Server::bind(&config).is_err());
    }

    #[test]
    fn test_run_greets_and_stops_on_shutdown() {
        let mut server = Server::bind(&test_config(&["John", "Jill"])).unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        let handle = thread::spawn(move || server.run());

        let mut client = std::net::TcpStream::connect(addr).unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();

        let mut greeting = [0u8; 16];
        client.read_exact(&mut greeting).unwrap();
        assert_eq!(&greeting, b"Your name: John\n");

        client.write_all(b"ping\n").unwrap();
        let mut echo = [0u8; 10];
        client.read_exact(&mut echo).unwrap();
        assert_eq!(&echo, b"John:ping\n");

        shutdown.shutdown().unwrap();
        assert!(handle.join().unwrap().is_ok());

        // The session was torn down on the way out
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).unwrap();
        assert!(rest.is_empty());
    }
}
