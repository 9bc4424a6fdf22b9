//! Transport seams between the connection loop and a TCP stack
//!
//! The firmware implements these over embassy-net sockets and the simulator
//! over `std::net`. A [`Connection`] is owned by the connection handler for
//! its whole life and is closed exactly once.

use core::fmt::{Debug, Display};
use core::future::Future;

use embassy_time::Instant;
use embedded_io_async::{Read, ReadReady, Write};

/// A bound TCP listener that hands out accepted connections one at a time.
pub trait Listener {
    type Error: Debug;

    type Connection<'a>: Connection
    where
        Self: 'a;

    /// Wait for the next admitted connection.
    fn accept(&mut self) -> impl Future<Output = Result<Self::Connection<'_>, Self::Error>>;
}

/// A single accepted TCP stream.
pub trait Connection: Read + Write + ReadReady {
    type Peer: Display;

    /// Remote endpoint, if the stack still knows it.
    fn peer(&self) -> Option<Self::Peer>;

    /// Bound every subsequent read, write and flush by `deadline`.
    ///
    /// Operations still pending at the deadline fail with
    /// [`embedded_io_async::ErrorKind::TimedOut`].
    fn set_deadline(&mut self, deadline: Instant) -> Result<(), Self::Error>;

    /// Shut the stream down. Implementations make repeat calls no-ops.
    fn close(&mut self) -> impl Future<Output = ()>;
}
