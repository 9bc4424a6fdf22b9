//! LED feedback for served requests
//!
//! The connection handler pushes a [`BlinkRequest`] into a bounded
//! [`BlinkQueue`] after each request. The [`FeedbackController`] drains the
//! queue one burst at a time and always leaves the LED on (its idle state)
//! when a burst ends.
//!
//! The queue blocks senders when full. A burst of 5 half-cycles takes 2.5 s,
//! so a fast client is slowed to the LED's pace rather than having its
//! feedback silently dropped.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embedded_hal::digital::{OutputPin, PinState};
use embedded_hal_async::delay::DelayNs;
use log::{debug, error};

use crate::config::{BLINK_INTERVAL, BLINK_QUEUE_DEPTH, DEFAULT_BLINK_HALF_CYCLES};

/// Bounded queue carrying blink requests from the request path to the LED.
pub type BlinkQueue<M> = Channel<M, BlinkRequest, BLINK_QUEUE_DEPTH>;
pub type BlinkSender<'a, M> = Sender<'a, M, BlinkRequest, BLINK_QUEUE_DEPTH>;
pub type BlinkReceiver<'a, M> = Receiver<'a, M, BlinkRequest, BLINK_QUEUE_DEPTH>;

/// Number of LED half-cycles (individual toggles) to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkRequest(pub u32);

impl Default for BlinkRequest {
    fn default() -> Self {
        Self(DEFAULT_BLINK_HALF_CYCLES)
    }
}

impl BlinkRequest {
    /// Toggles this request produces. A zero count means the default.
    pub fn half_cycles(self) -> u32 {
        if self.0 == 0 {
            DEFAULT_BLINK_HALF_CYCLES
        } else {
            self.0
        }
    }
}

/// Something that can switch the status LED.
pub trait LedControl {
    type Error: core::fmt::Debug;

    fn set(&mut self, on: bool) -> Result<(), Self::Error>;
}

impl<P: OutputPin> LedControl for P {
    type Error = P::Error;

    fn set(&mut self, on: bool) -> Result<(), Self::Error> {
        self.set_state(PinState::from(on))
    }
}

/// LED states of one burst, in order.
///
/// Starts from the idle "on" state, so the first toggle turns the LED off.
/// The closing "on" is not part of the sequence; see
/// [`FeedbackController::blink`].
#[derive(Debug, Clone)]
pub struct BlinkBurst {
    remaining: u32,
    state: bool,
}

impl BlinkBurst {
    pub fn new(request: BlinkRequest) -> Self {
        Self {
            remaining: request.half_cycles(),
            state: true,
        }
    }
}

impl Iterator for BlinkBurst {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.state = !self.state;
        Some(self.state)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for BlinkBurst {}

pub struct FeedbackController<'a, M: RawMutex, L> {
    led: L,
    requests: BlinkReceiver<'a, M>,
}

impl<'a, M: RawMutex, L: LedControl> FeedbackController<'a, M, L> {
    pub fn new(led: L, requests: BlinkReceiver<'a, M>) -> Self {
        Self { led, requests }
    }

    /// Serve blink requests forever, one complete burst at a time.
    pub async fn run<D: DelayNs>(&mut self, delay: &mut D) -> ! {
        loop {
            self.next_burst(delay).await;
        }
    }

    /// Wait for the next request and blink it out. Returns the request served.
    pub async fn next_burst<D: DelayNs>(&mut self, delay: &mut D) -> BlinkRequest {
        let request = self.requests.receive().await;
        self.blink(request, delay).await;
        request
    }

    /// Run one burst to completion, then force the LED back on.
    ///
    /// A failed toggle is logged and the burst carries on.
    pub async fn blink<D: DelayNs>(&mut self, request: BlinkRequest, delay: &mut D) {
        debug!("blinking {} half-cycles", request.half_cycles());
        for state in BlinkBurst::new(request) {
            self.set_led(state);
            delay.delay_ms(BLINK_INTERVAL.as_millis() as u32).await;
        }
        self.set_led(true);
    }

    /// Drive the LED, logging instead of failing.
    pub fn set_led(&mut self, on: bool) {
        if let Err(e) = self.led.set(on) {
            error!("failed to change LED state: {:?}", e);
        }
    }

    pub fn led(&self) -> &L {
        &self.led
    }
}
