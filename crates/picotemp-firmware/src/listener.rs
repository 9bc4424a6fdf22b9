//! Pooled TCP listener over embassy-net sockets
//!
//! embassy-net has no listen backlog: a socket accepts exactly one peer. The
//! [`SocketPool`] keeps every idle socket listening on the port, so up to
//! [`MAX_CONNECTIONS`] clients are admitted while one of them is serviced,
//! and hands established sockets out in the order they were admitted.

use core::future::Future;
use core::task::Poll;

use embassy_futures::poll_once;
use embassy_futures::select::{select, select_array};
use embassy_net::tcp::{self, AcceptError, State, TcpSocket};
use embassy_net::{IpEndpoint, Stack};
use embassy_time::{Instant, Timer, with_deadline};
use embedded_io_async::{ErrorKind, ErrorType, Read, ReadReady, Write};
use log::{debug, warn};
use picotemp_core::config::{CONNECTION_TIMEOUT, MAX_CONNECTIONS, TCP_BUFFER_SIZE};
use picotemp_core::pool::{SlotAction, SlotState, SlotTable};
use picotemp_core::{Connection, Listener};
use thiserror_no_std::Error;

/// Receive and transmit storage for one socket.
pub struct SocketBuffers {
    rx: [u8; TCP_BUFFER_SIZE],
    tx: [u8; TCP_BUFFER_SIZE],
}

impl SocketBuffers {
    pub const fn new() -> Self {
        Self {
            rx: [0; TCP_BUFFER_SIZE],
            tx: [0; TCP_BUFFER_SIZE],
        }
    }
}

impl Default for SocketBuffers {
    fn default() -> Self {
        Self::new()
    }
}

fn slot_state(state: State) -> SlotState {
    match state {
        State::Closed => SlotState::Closed,
        State::Listen | State::SynSent | State::SynReceived => SlotState::Pending,
        State::Established | State::CloseWait => SlotState::Ready,
        State::FinWait1 | State::FinWait2 | State::Closing | State::LastAck => SlotState::Closing,
        State::TimeWait => SlotState::TimeWait,
    }
}

pub struct SocketPool<'d> {
    sockets: [TcpSocket<'d>; MAX_CONNECTIONS],
    slots: SlotTable<MAX_CONNECTIONS>,
    port: u16,
}

impl<'d> SocketPool<'d> {
    pub fn new(
        stack: Stack<'d>,
        buffers: &'d mut [SocketBuffers; MAX_CONNECTIONS],
        port: u16,
    ) -> Self {
        let sockets = buffers.each_mut().map(|buffers| {
            let SocketBuffers { rx, tx } = buffers;
            TcpSocket::new(stack, rx, tx)
        });

        Self {
            sockets,
            slots: SlotTable::new(CONNECTION_TIMEOUT),
            port,
        }
    }

    /// Re-arm idle sockets, reclaim stale ones and number newly established
    /// ones.
    fn admit(&mut self) -> Result<(), AcceptError> {
        let now = Instant::now();
        for (i, socket) in self.sockets.iter_mut().enumerate() {
            let state = socket.state();
            match self.slots.observe(i, slot_state(state), now) {
                SlotAction::Keep => continue,
                SlotAction::Abort => {
                    if state != State::TimeWait {
                        warn!("reclaiming socket {} stuck in {:?}", i, state);
                    }
                    socket.abort();
                }
                SlotAction::Listen => {}
            }
            socket.set_timeout(None);
            // `accept` starts listening on its first poll; the connection
            // itself is picked up by a later `observe`.
            if let Poll::Ready(Err(e)) = poll_once(socket.accept(self.port)) {
                return Err(e);
            }
        }
        Ok(())
    }
}

impl<'d> Listener for SocketPool<'d> {
    type Error = AcceptError;
    type Connection<'a>
        = PooledConnection<'a, 'd>
    where
        Self: 'a;

    async fn accept(&mut self) -> Result<PooledConnection<'_, 'd>, AcceptError> {
        loop {
            self.admit()?;
            if let Some(i) = self.slots.oldest_ready() {
                debug!("handing out socket {}", i);
                return Ok(PooledConnection::new(&mut self.sockets[i], &mut self.slots, i));
            }
            // Every state change wakes the socket's send waker.
            let changed = select_array(self.sockets.each_ref().map(|s| s.wait_write_ready()));
            match self.slots.next_expiry() {
                Some(at) => {
                    select(changed, Timer::at(at)).await;
                }
                None => {
                    changed.await;
                }
            }
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketError {
    #[error("deadline exceeded")]
    TimedOut,
    #[error("connection reset")]
    Reset,
    #[error("not connected")]
    NotConnected,
}

// thiserror-no-std only derives `Display` without its `std` feature.
impl core::error::Error for SocketError {}

impl embedded_io_async::Error for SocketError {
    fn kind(&self) -> ErrorKind {
        match self {
            SocketError::TimedOut => ErrorKind::TimedOut,
            SocketError::Reset => ErrorKind::ConnectionReset,
            SocketError::NotConnected => ErrorKind::NotConnected,
        }
    }
}

impl From<tcp::Error> for SocketError {
    fn from(_: tcp::Error) -> Self {
        SocketError::Reset
    }
}

/// An established socket lent out by the [`SocketPool`].
///
/// Dropping it without [`Connection::close`] aborts the connection.
pub struct PooledConnection<'a, 'd> {
    socket: &'a mut TcpSocket<'d>,
    slots: &'a mut SlotTable<MAX_CONNECTIONS>,
    slot: usize,
    deadline: Option<Instant>,
    closed: bool,
}

impl<'a, 'd> PooledConnection<'a, 'd> {
    fn new(
        socket: &'a mut TcpSocket<'d>,
        slots: &'a mut SlotTable<MAX_CONNECTIONS>,
        slot: usize,
    ) -> Self {
        Self {
            socket,
            slots,
            slot,
            deadline: None,
            closed: false,
        }
    }

    fn expired(&self) -> bool {
        self.deadline.is_some_and(|at| Instant::now() >= at)
    }
}

/// Run `fut` to completion or until `deadline`, whichever comes first.
async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> Result<F::Output, SocketError> {
    match deadline {
        Some(at) => with_deadline(at, fut).await.map_err(|_| SocketError::TimedOut),
        None => Ok(fut.await),
    }
}

impl ErrorType for PooledConnection<'_, '_> {
    type Error = SocketError;
}

impl Read for PooledConnection<'_, '_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, SocketError> {
        Ok(within(self.deadline, self.socket.read(buf)).await??)
    }
}

impl ReadReady for PooledConnection<'_, '_> {
    fn read_ready(&mut self) -> Result<bool, SocketError> {
        if self.expired() {
            return Err(SocketError::TimedOut);
        }
        Ok(self.socket.can_recv())
    }
}

impl Write for PooledConnection<'_, '_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, SocketError> {
        Ok(within(self.deadline, self.socket.write(buf)).await??)
    }

    async fn flush(&mut self) -> Result<(), SocketError> {
        Ok(within(self.deadline, self.socket.flush()).await??)
    }
}

impl Connection for PooledConnection<'_, '_> {
    type Peer = IpEndpoint;

    fn peer(&self) -> Option<IpEndpoint> {
        self.socket.remote_endpoint()
    }

    fn set_deadline(&mut self, deadline: Instant) -> Result<(), SocketError> {
        if !self.socket.may_send() {
            return Err(SocketError::NotConnected);
        }
        let now = Instant::now();
        if deadline <= now {
            return Err(SocketError::TimedOut);
        }
        // Also let the stack drop a peer that stops acknowledging.
        self.socket.set_timeout(Some(deadline - now));
        self.deadline = Some(deadline);
        Ok(())
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        self.socket.close();
        if !matches!(within(self.deadline, self.socket.flush()).await, Ok(Ok(()))) {
            self.socket.abort();
        }
        // A peer may ACK our FIN and never send its own; keep the stack's
        // idle timer running until the pool re-arms the socket.
        self.socket.set_timeout(Some(CONNECTION_TIMEOUT));
        self.slots.release(self.slot, Instant::now());
    }
}

impl Drop for PooledConnection<'_, '_> {
    fn drop(&mut self) {
        if !self.closed {
            self.socket.abort();
            self.slots.release(self.slot, Instant::now());
        }
    }
}
