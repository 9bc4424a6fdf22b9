//! `std::net` implementation of the core transport traits.
//!
//! Sockets are blocking; the connection handler runs on its own executor
//! thread, so a blocked accept or read only stalls that thread.

use std::io::{self, Read as _, Write as _};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use embassy_time::Instant;
use embedded_io_async::{ErrorKind, ErrorType, Read, ReadReady, Write};
use log::debug;
use thiserror_no_std::Error;

use picotemp_core::{Connection, Listener};

#[derive(Error, Debug)]
pub enum HostError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("deadline already passed")]
    DeadlinePassed,
}

// thiserror-no-std only derives `Display` and `From` without its `std`
// feature, which the no_std core crate cannot share.
impl std::error::Error for HostError {}

impl embedded_io_async::Error for HostError {
    fn kind(&self) -> ErrorKind {
        match self {
            HostError::DeadlinePassed => ErrorKind::TimedOut,
            HostError::Io(e) => match e.kind() {
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => ErrorKind::TimedOut,
                io::ErrorKind::ConnectionReset => ErrorKind::ConnectionReset,
                io::ErrorKind::ConnectionAborted => ErrorKind::ConnectionAborted,
                io::ErrorKind::BrokenPipe => ErrorKind::BrokenPipe,
                io::ErrorKind::NotConnected => ErrorKind::NotConnected,
                io::ErrorKind::Interrupted => ErrorKind::Interrupted,
                _ => ErrorKind::Other,
            },
        }
    }
}

pub struct HostListener {
    inner: TcpListener,
}

impl HostListener {
    pub fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let inner = TcpListener::bind(addr)?;
        Ok(Self { inner })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

impl Listener for HostListener {
    type Error = HostError;
    type Connection<'a>
        = HostConnection
    where
        Self: 'a;

    async fn accept(&mut self) -> Result<HostConnection, HostError> {
        let (stream, peer) = self.inner.accept()?;
        Ok(HostConnection::new(stream, peer))
    }
}

pub struct HostConnection {
    stream: TcpStream,
    peer: SocketAddr,
    deadline: Option<Instant>,
    closed: bool,
}

impl HostConnection {
    fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            deadline: None,
            closed: false,
        }
    }

    /// Time left before the deadline, or `DeadlinePassed`.
    fn remaining(&self) -> Result<Option<Duration>, HostError> {
        let Some(deadline) = self.deadline else {
            return Ok(None);
        };
        let now = Instant::now();
        if deadline <= now {
            return Err(HostError::DeadlinePassed);
        }
        Ok(Some(Duration::from_micros((deadline - now).as_micros())))
    }

    /// Socket timeouts are per call, so re-arm them before every blocking
    /// operation to keep the deadline absolute.
    fn arm(&self) -> Result<(), HostError> {
        let remaining = self.remaining()?;
        self.stream.set_read_timeout(remaining)?;
        self.stream.set_write_timeout(remaining)?;
        Ok(())
    }
}

impl ErrorType for HostConnection {
    type Error = HostError;
}

impl Read for HostConnection {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, HostError> {
        self.arm()?;
        Ok(self.stream.read(buf)?)
    }
}

impl ReadReady for HostConnection {
    fn read_ready(&mut self) -> Result<bool, HostError> {
        self.remaining()?;
        self.stream.set_nonblocking(true)?;
        let mut peeked = [0u8; 1];
        let ready = match self.stream.peek(&mut peeked) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(HostError::Io(e)),
        };
        self.stream.set_nonblocking(false)?;
        ready
    }
}

impl Write for HostConnection {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, HostError> {
        self.arm()?;
        Ok(self.stream.write(buf)?)
    }

    async fn flush(&mut self) -> Result<(), HostError> {
        self.arm()?;
        Ok(self.stream.flush()?)
    }
}

impl Connection for HostConnection {
    type Peer = SocketAddr;

    fn peer(&self) -> Option<SocketAddr> {
        Some(self.peer)
    }

    fn set_deadline(&mut self, deadline: Instant) -> Result<(), HostError> {
        self.deadline = Some(deadline);
        self.arm()
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            debug!("conn shutdown: {}", e);
        }
    }
}
