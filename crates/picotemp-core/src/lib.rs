//! Hardware-independent core of the picotemp network temperature sensor
//!
//! This crate holds everything about the appliance that does not touch a
//! register: the HTTP response path, the serialized connection loop with its
//! reused buffers and per-connection deadline, the LED feedback controller fed
//! by a bounded blink queue, and the liveness reporter.
//!
//! The network stack, the LED pin and the on-die sensor are reached through
//! the traits in [`transport`], [`feedback`] and [`temperature`], which the
//! ESP32 firmware and the desktop simulator implement.
//!
//! It is `#![no_std]` so it compiles on both the embedded target and desktop
//! hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod feedback;
pub mod handler;
pub mod header;
pub mod liveness;
pub mod pool;
pub mod request;
pub mod responder;
pub mod temperature;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use feedback::{BlinkQueue, BlinkRequest, FeedbackController, LedControl};
pub use handler::{ConnectionHandler, Outcome};
pub use temperature::{TemperatureReading, TemperatureSource};
pub use transport::{Connection, Listener};
