//! Fakes shared by the unit tests

use std::cell::RefCell;
use std::collections::VecDeque;
use std::string::{String, ToString};
use std::vec::Vec;

use embassy_time::Instant;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{ErrorKind, ErrorType, Read, ReadReady, Write};
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde::Deserialize;

use crate::temperature::TemperatureSource;
use crate::transport::{Connection, Listener};

pub struct FixedTemperature(pub i32);

impl TemperatureSource for FixedTemperature {
    fn read_millicelsius(&mut self) -> i32 {
        self.0
    }
}

/// Returns the given samples in order, then repeats the last one.
pub struct SequenceTemperature {
    samples: VecDeque<i32>,
    last: i32,
}

impl SequenceTemperature {
    pub fn new(samples: &[i32]) -> Self {
        Self {
            samples: samples.iter().copied().collect(),
            last: 0,
        }
    }
}

impl TemperatureSource for SequenceTemperature {
    fn read_millicelsius(&mut self) -> i32 {
        if let Some(next) = self.samples.pop_front() {
            self.last = next;
        }
        self.last
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeIoError(pub ErrorKind);

impl core::fmt::Display for FakeIoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "fake io error: {:?}", self.0)
    }
}

impl core::error::Error for FakeIoError {}

impl embedded_io_async::Error for FakeIoError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// In-memory connection with scripted input and failure injection.
#[derive(Debug, Default)]
pub struct FakeStream {
    input: Vec<u8>,
    pos: usize,
    written: Vec<u8>,
    read_error: Option<ErrorKind>,
    write_error: Option<ErrorKind>,
    deadline_error: Option<ErrorKind>,
    peer: Option<&'static str>,
    pub deadline: Option<Instant>,
    pub closes: usize,
}

impl FakeStream {
    pub fn with_input(input: &[u8]) -> Self {
        Self {
            input: input.to_vec(),
            ..Self::default()
        }
    }

    pub fn failing_reads(mut self, kind: ErrorKind) -> Self {
        self.read_error = Some(kind);
        self
    }

    pub fn failing_writes(mut self, kind: ErrorKind) -> Self {
        self.write_error = Some(kind);
        self
    }

    pub fn failing_deadline(mut self, kind: ErrorKind) -> Self {
        self.deadline_error = Some(kind);
        self
    }

    pub fn with_peer(mut self, peer: &'static str) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn remaining_input(&self) -> usize {
        self.input.len() - self.pos
    }
}

impl ErrorType for FakeStream {
    type Error = FakeIoError;
}

impl Read for FakeStream {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if let Some(kind) = self.read_error {
            return Err(FakeIoError(kind));
        }
        let n = buf.len().min(self.remaining_input());
        buf[..n].copy_from_slice(&self.input[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl ReadReady for FakeStream {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.remaining_input() > 0)
    }
}

impl Write for FakeStream {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if let Some(kind) = self.write_error {
            return Err(FakeIoError(kind));
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Connection for &mut FakeStream {
    type Peer = &'static str;

    fn peer(&self) -> Option<Self::Peer> {
        self.peer
    }

    fn set_deadline(&mut self, deadline: Instant) -> Result<(), Self::Error> {
        if let Some(kind) = self.deadline_error {
            return Err(FakeIoError(kind));
        }
        self.deadline = Some(deadline);
        Ok(())
    }

    async fn close(&mut self) {
        self.closes += 1;
    }
}

#[derive(Debug)]
pub struct FakeAcceptError;

/// Hands out scripted connections and accept failures in order.
///
/// Accepted connections are kept so tests can inspect them afterwards.
#[derive(Default)]
pub struct ScriptedListener {
    script: VecDeque<Option<FakeStream>>,
    pub accepted: Vec<FakeStream>,
    pub attempts: usize,
}

impl ScriptedListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_connection(&mut self, stream: FakeStream) {
        self.script.push_back(Some(stream));
    }

    pub fn push_accept_error(&mut self) {
        self.script.push_back(None);
    }
}

impl Listener for ScriptedListener {
    type Error = FakeAcceptError;
    type Connection<'a>
        = &'a mut FakeStream
    where
        Self: 'a;

    async fn accept(&mut self) -> Result<&mut FakeStream, FakeAcceptError> {
        self.attempts += 1;
        match self.script.pop_front() {
            Some(Some(stream)) => {
                self.accepted.push(stream);
                Ok(self.accepted.last_mut().expect("just pushed"))
            }
            Some(None) => Err(FakeAcceptError),
            None => core::future::pending().await,
        }
    }
}

#[derive(Debug)]
pub struct LedFault;

impl digital::Error for LedFault {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

/// Records every state successfully written to it.
#[derive(Debug, Default)]
pub struct RecordingLed {
    pub history: Vec<bool>,
    pub calls: usize,
    /// Zero-based call index that fails instead of switching the LED.
    pub fail_on_call: Option<usize>,
}

impl RecordingLed {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, on: bool) -> Result<(), LedFault> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_on_call == Some(call) {
            return Err(LedFault);
        }
        self.history.push(on);
        Ok(())
    }
}

impl digital::ErrorType for RecordingLed {
    type Error = LedFault;
}

impl OutputPin for RecordingLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.record(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.record(true)
    }
}

/// Returns immediately and accumulates the requested delay.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub calls: usize,
    total_ns: u64,
}

impl RecordingDelay {
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.calls += 1;
        self.total_ns += u64::from(ns);
    }

    async fn delay_us(&mut self, us: u32) {
        self.calls += 1;
        self.total_ns += u64::from(us) * 1_000;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.calls += 1;
        self.total_ns += u64::from(ms) * 1_000_000;
    }
}

#[derive(Deserialize)]
struct WireReading {
    #[serde(rename = "tempC:")]
    celsius: f64,
    #[serde(rename = "temF")]
    fahrenheit: f64,
}

/// Minimal parse of a written HTTP response.
pub struct ParsedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ParsedResponse {
    pub fn parse(raw: &[u8]) -> Self {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("header terminator");
        let head = core::str::from_utf8(&raw[..split]).expect("utf-8 header");
        let mut lines = head.split("\r\n");

        let status_line = lines.next().expect("status line");
        let mut parts = status_line.splitn(3, ' ');
        assert_eq!(parts.next(), Some("HTTP/1.1"));
        let status = parts.next().expect("status code").parse().expect("numeric status");

        let headers = lines
            .map(|line| {
                let (name, value) = line.split_once(": ").expect("header separator");
                (name.into(), value.into())
            })
            .collect();

        Self {
            status,
            headers,
            body: raw[split + 4..].to_vec(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_length(&self) -> Option<usize> {
        self.header("Content-Length").map(|v| v.parse().expect("numeric length"))
    }

    /// The body's (Celsius, Fahrenheit) pair, if it is a valid reading.
    pub fn temperatures(&self) -> Option<(f64, f64)> {
        let (reading, _) = serde_json_core::from_slice::<WireReading>(&self.body).ok()?;
        Some((reading.celsius, reading.fahrenheit))
    }
}

std::thread_local! {
    static CAPTURED: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Keeps log records per test thread so parallel tests don't see each
/// other's output.
struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        CAPTURED.with(|logs| {
            logs.borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

/// Start capturing this thread's log records, dropping earlier ones.
pub fn capture_logs() {
    // Another test may have installed it already.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(LevelFilter::Trace);
    CAPTURED.with(|logs| logs.borrow_mut().clear());
}

/// Records captured on this thread at `level`.
pub fn logged(level: Level) -> Vec<String> {
    CAPTURED.with(|logs| {
        logs.borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    })
}
