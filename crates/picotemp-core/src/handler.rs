//! Serialized connection loop
//!
//! One connection is serviced at a time. The request buffer and response
//! header are allocated once, owned by the [`ConnectionHandler`], and lent to
//! each connection in turn after a reset; holding them by `&mut self` is what
//! keeps two connections from ever sharing them.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Instant;
use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{Error as _, ErrorKind};
use log::{debug, error, info};
use thiserror_no_std::Error;

use crate::config::{ACCEPT_BACKOFF, CONNECTION_TIMEOUT, READ_BUFFER_SIZE};
use crate::feedback::{BlinkRequest, BlinkSender};
use crate::header::ResponseHeader;
use crate::request::RequestBuffer;
use crate::responder::{ResponseError, respond};
use crate::temperature::TemperatureSource;
use crate::transport::{Connection, Listener};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("conn set deadline: {0:?}")]
    Deadline(ErrorKind),
    #[error("conn read request: {0:?}")]
    Capture(ErrorKind),
    #[error("conn respond: {0}")]
    Respond(#[from] ResponseError),
}

/// What one iteration of the accept loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Accept failed; the loop backed off before returning.
    AcceptFailed,
    /// The deadline could not be armed; nothing was written.
    DeadlineFailed,
    /// Reading the pending request failed; nothing was written.
    CaptureFailed,
    /// The responder ran but writing the response failed.
    ResponseFailed,
    /// A complete response with this status was written.
    Served(u16),
}

impl From<ConnectionError> for Outcome {
    fn from(e: ConnectionError) -> Self {
        match e {
            ConnectionError::Deadline(_) => Outcome::DeadlineFailed,
            ConnectionError::Capture(_) => Outcome::CaptureFailed,
            ConnectionError::Respond(_) => Outcome::ResponseFailed,
        }
    }
}

impl Outcome {
    /// Whether the connection got as far as the responder.
    pub fn reached_responder(self) -> bool {
        matches!(self, Outcome::Served(_) | Outcome::ResponseFailed)
    }
}

pub struct ConnectionHandler<'q, M: RawMutex, S> {
    request: RequestBuffer<READ_BUFFER_SIZE>,
    header: ResponseHeader,
    sensor: S,
    blink: BlinkSender<'q, M>,
}

impl<'q, M: RawMutex, S: TemperatureSource> ConnectionHandler<'q, M, S> {
    pub fn new(sensor: S, blink: BlinkSender<'q, M>) -> Self {
        Self {
            request: RequestBuffer::new(),
            header: ResponseHeader::new(),
            sensor,
            blink,
        }
    }

    /// Accept and serve connections forever.
    pub async fn run<L: Listener, D: DelayNs>(&mut self, listener: &mut L, delay: &mut D) -> ! {
        loop {
            self.step(listener, delay).await;
        }
    }

    /// One pass of the accept loop.
    ///
    /// Accept errors are logged and followed by [`ACCEPT_BACKOFF`]. An
    /// accepted connection is always closed before this returns, and a blink
    /// is queued if the responder ran, which may wait for room in the queue.
    pub async fn step<L: Listener, D: DelayNs>(&mut self, listener: &mut L, delay: &mut D) -> Outcome {
        let mut conn = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("listener accept: {:?}", e);
                delay.delay_ms(ACCEPT_BACKOFF.as_millis() as u32).await;
                return Outcome::AcceptFailed;
            }
        };

        match conn.peer() {
            Some(peer) => info!("new connection: remote={}", peer),
            None => info!("new connection: remote=unknown"),
        }

        let result = self.serve(&mut conn).await;
        conn.close().await;

        let outcome = match result {
            Ok(status) => Outcome::Served(status),
            Err(e) => {
                error!("{}", e);
                Outcome::from(e)
            }
        };

        if outcome.reached_responder() {
            self.blink.send(BlinkRequest::default()).await;
        }
        outcome
    }

    async fn serve<C: Connection>(&mut self, conn: &mut C) -> Result<u16, ConnectionError> {
        conn.set_deadline(Instant::now() + CONNECTION_TIMEOUT)
            .map_err(|e| ConnectionError::Deadline(e.kind()))?;

        self.request.reset();
        self.request
            .capture(conn)
            .await
            .map_err(|e| ConnectionError::Capture(e.kind()))?;
        if let Some(line) = self.request.request_line() {
            debug!("request: {}", line);
        }

        self.header.reset();
        let status = respond(conn, &mut self.header, &mut self.sensor).await?;
        Ok(status)
    }
}
