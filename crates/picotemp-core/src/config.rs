//! Compile-time configuration
//!
//! The appliance has no runtime configuration surface. Every tunable lives
//! here as a constant; Wi-Fi credentials are injected by the firmware build
//! script and grouped in [`NetworkConfig`].

use embassy_time::Duration;

/// DHCP hostname announced by the device.
pub const HOSTNAME: &str = "picotemp";

/// TCP port the HTTP endpoint listens on.
pub const LISTEN_PORT: u16 = 80;

/// Connections the listener admits at once. Only one is serviced at a time,
/// the rest wait in the listener.
pub const MAX_CONNECTIONS: usize = 3;

/// Receive and transmit buffer size of each TCP socket.
pub const TCP_BUFFER_SIZE: usize = 2030;

/// Capacity of the request buffer shared by all connections.
pub const READ_BUFFER_SIZE: usize = 1024;

/// Capacity of the encoded response header.
pub const HEADER_BUFFER_SIZE: usize = 192;

/// Capacity of the JSON body buffer.
pub const RESPONSE_BODY_CAPACITY: usize = 64;

/// Absolute lifetime of a connection, measured from accept.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(3);

/// Pause after a failed accept before trying again.
pub const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Pending blink requests the feedback queue holds before senders block.
pub const BLINK_QUEUE_DEPTH: usize = 3;

/// Half-cycles blinked per served request, and the substitute for a zero count.
pub const DEFAULT_BLINK_HALF_CYCLES: u32 = 5;

/// Time the LED holds each state during a blink burst.
pub const BLINK_INTERVAL: Duration = Duration::from_millis(500);

/// Period of the "still alive" log line.
pub const LIVENESS_PERIOD: Duration = Duration::from_secs(60);

/// Network identity of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig<'a> {
    pub hostname: &'a str,
    pub ssid: &'a str,
    pub password: &'a str,
}

impl<'a> NetworkConfig<'a> {
    /// Credentials for the given network under the default [`HOSTNAME`].
    pub const fn new(ssid: &'a str, password: &'a str) -> Self {
        Self {
            hostname: HOSTNAME,
            ssid,
            password,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_config_uses_default_hostname() {
        let config = NetworkConfig::new("lab", "hunter22");
        assert_eq!(config.hostname, "picotemp");
        assert_eq!(config.ssid, "lab");
    }

    #[test]
    fn test_blink_interval_fits_in_delay_ms() {
        // DelayNs::delay_ms takes a u32
        assert!(BLINK_INTERVAL.as_millis() <= u32::MAX as u64);
        assert!(LIVENESS_PERIOD.as_millis() <= u32::MAX as u64);
    }
}
