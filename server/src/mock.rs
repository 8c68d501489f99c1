//! In-memory stand-ins for client sockets and readiness registration

use crate::lobby::Subscriber;
use mio::{Interest, Token};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::rc::Rc;

/// What the next read on a [`MockStream`] returns
pub enum Chunk {
    Data(Vec<u8>),
    Eof,
    Error(io::ErrorKind),
}

#[derive(Default)]
struct Inner {
    inbound: VecDeque<Chunk>,
    written: Vec<u8>,
    fail_writes: bool,
    /// Socket buffer full: writes would block
    blocked: bool,
    /// Writes accepted before `fail_writes` kicks in, if limited
    writes_before_failure: Option<usize>,
}

/// A client socket backed by shared buffers
///
/// Clones share state; the test keeps one clone while the lobby owns the
/// other, so `is_closed` turns true once the lobby drops its copy.
#[derive(Clone, Default)]
pub struct MockStream {
    inner: Rc<RefCell<Inner>>,
}

impl MockStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_data(&self, data: &[u8]) {
        self.inner
            .borrow_mut()
            .inbound
            .push_back(Chunk::Data(data.to_vec()));
    }

    pub fn push_eof(&self) {
        self.inner.borrow_mut().inbound.push_back(Chunk::Eof);
    }

    pub fn push_error(&self, kind: io::ErrorKind) {
        self.inner.borrow_mut().inbound.push_back(Chunk::Error(kind));
    }

    pub fn fail_writes(&self) {
        self.inner.borrow_mut().fail_writes = true;
    }

    pub fn block_writes(&self) {
        self.inner.borrow_mut().blocked = true;
    }

    pub fn unblock_writes(&self) {
        self.inner.borrow_mut().blocked = false;
    }

    /// Lets `count` more writes through, then fails the rest
    pub fn fail_writes_after(&self, count: usize) {
        let mut inner = self.inner.borrow_mut();
        inner.fail_writes = true;
        inner.writes_before_failure = Some(count);
    }

    pub fn written(&self) -> String {
        String::from_utf8_lossy(&self.inner.borrow().written).into_owned()
    }

    pub fn clear_written(&self) {
        self.inner.borrow_mut().written.clear();
    }

    pub fn is_closed(&self) -> bool {
        Rc::strong_count(&self.inner) == 1
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        match inner.inbound.pop_front() {
            None => Err(io::ErrorKind::WouldBlock.into()),
            Some(Chunk::Eof) => Ok(0),
            Some(Chunk::Error(kind)) => Err(kind.into()),
            Some(Chunk::Data(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    inner.inbound.push_front(Chunk::Data(data[n..].to_vec()));
                }
                Ok(n)
            }
        }
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        if inner.blocked {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        if inner.fail_writes {
            let remaining = inner.writes_before_failure.unwrap_or(0);
            if remaining == 0 {
                return Err(io::ErrorKind::BrokenPipe.into());
            }
            inner.writes_before_failure = Some(remaining - 1);
        }
        inner.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Records which tokens are subscribed and for what
#[derive(Default)]
pub struct MockSubscriber {
    subscribed: RefCell<HashMap<Token, Interest>>,
    fail_subscribe: Cell<bool>,
}

impl MockSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_subscribe(&self) {
        self.fail_subscribe.set(true);
    }

    pub fn is_subscribed(&self, token: Token) -> bool {
        self.subscribed.borrow().contains_key(&token)
    }

    /// True when the token is registered for write readiness
    pub fn wants_write(&self, token: Token) -> bool {
        self.subscribed
            .borrow()
            .get(&token)
            .map_or(false, |interest| interest.is_writable())
    }

    pub fn count(&self) -> usize {
        self.subscribed.borrow().len()
    }
}

impl Subscriber<MockStream> for MockSubscriber {
    fn subscribe(&self, _stream: &mut MockStream, token: Token, interest: Interest) -> io::Result<()> {
        if self.fail_subscribe.get() {
            return Err(io::Error::new(io::ErrorKind::Other, "registration refused"));
        }
        self.subscribed.borrow_mut().insert(token, interest);
        Ok(())
    }

    fn resubscribe(
        &self,
        _stream: &mut MockStream,
        token: Token,
        interest: Interest,
    ) -> io::Result<()> {
        match self.subscribed.borrow_mut().get_mut(&token) {
            Some(current) => {
                *current = interest;
                Ok(())
            }
            None => Err(io::ErrorKind::NotFound.into()),
        }
    }

    fn unsubscribe(&self, _stream: &mut MockStream, token: Token) -> io::Result<()> {
        match self.subscribed.borrow_mut().remove(&token) {
            Some(_) => Ok(()),
            None => Err(io::ErrorKind::NotFound.into()),
        }
    }
}
