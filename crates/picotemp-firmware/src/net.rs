//! Wi-Fi and DHCP bring-up
//!
//! [`bring_up`] joins the configured network, starts the embassy-net stack
//! and waits for a DHCP lease. The device is useless without a network, so
//! the caller treats any [`BootstrapError`] as fatal. After bring-up the
//! `wifi_task` keeps the station associated.

use alloc::string::String;
use core::fmt::{Debug, Write as _};

use embassy_executor::Spawner;
use embassy_net::{Config as NetConfig, DhcpConfig, Stack, StackResources};
use embassy_time::{Duration, Timer, with_timeout};
use esp_hal::peripherals::WIFI;
use esp_hal::rng::Rng;
use esp_radio::Controller as RadioController;
use esp_radio::wifi::{self, ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent};
use log::{error, info, warn};
use picotemp_core::config::NetworkConfig;
use static_cell::StaticCell;
use thiserror_no_std::Error;

/// How long to wait for a DHCP lease after associating.
pub const DHCP_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause between reconnect attempts once the link drops.
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// TCP listener sockets plus DHCP and one spare.
const STACK_SOCKETS: usize = picotemp_core::config::MAX_CONNECTIONS + 2;

static RADIO_CONTROLLER: StaticCell<RadioController<'static>> = StaticCell::new();
static NET_RESOURCES: StaticCell<StackResources<STACK_SOCKETS>> = StaticCell::new();

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("radio init failed: {0}")]
    Radio(heapless::String<64>),
    #[error("wifi configuration failed: {0}")]
    WifiConfig(heapless::String<64>),
    #[error("wifi start failed: {0}")]
    WifiStart(heapless::String<64>),
    #[error("wifi connect failed: {0}")]
    WifiConnect(heapless::String<64>),
    #[error("no DHCP lease within {0} s")]
    DhcpTimeout(u64),
    #[error("task spawn failed: {0}")]
    Spawn(heapless::String<64>),
}

/// Debug-format `e` into a bounded string, truncating if needed.
fn detail(e: impl Debug) -> heapless::String<64> {
    let mut s = heapless::String::new();
    let _ = write!(s, "{:?}", e);
    s
}

fn client_config(config: &NetworkConfig<'_>) -> ModeConfig {
    ModeConfig::Client(
        ClientConfig::default()
            .with_ssid(String::from(config.ssid))
            .with_password(String::from(config.password)),
    )
}

/// Bring the network up and return a stack with an IPv4 address.
pub async fn bring_up(
    spawner: &Spawner,
    wifi_peripheral: WIFI<'static>,
    config: NetworkConfig<'static>,
) -> Result<Stack<'static>, BootstrapError> {
    let radio = esp_radio::init().map_err(|e| BootstrapError::Radio(detail(e)))?;
    let radio = RADIO_CONTROLLER.init(radio);

    let (mut controller, interfaces) = wifi::new(radio, wifi_peripheral, Default::default())
        .map_err(|e| BootstrapError::Radio(detail(e)))?;

    let mut dhcp = DhcpConfig::default();
    dhcp.hostname = config.hostname.try_into().ok();

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    let resources = NET_RESOURCES.init(StackResources::new());
    let (stack, runner) = embassy_net::new(interfaces.sta, NetConfig::dhcpv4(dhcp), resources, seed);

    spawner
        .spawn(net_task(runner))
        .map_err(|e| BootstrapError::Spawn(detail(e)))?;

    controller
        .set_config(&client_config(&config))
        .map_err(|e| BootstrapError::WifiConfig(detail(e)))?;
    info!("Starting Wi-Fi STA");
    controller
        .start_async()
        .await
        .map_err(|e| BootstrapError::WifiStart(detail(e)))?;

    info!("Connecting to Wi-Fi ssid=\"{}\" hostname={}", config.ssid, config.hostname);
    controller
        .connect_async()
        .await
        .map_err(|e| BootstrapError::WifiConnect(detail(e)))?;

    with_timeout(DHCP_TIMEOUT, stack.wait_config_up())
        .await
        .map_err(|_| BootstrapError::DhcpTimeout(DHCP_TIMEOUT.as_secs()))?;

    if let Some(cfg) = stack.config_v4() {
        info!("DHCP lease: addr={}", cfg.address);
    }

    spawner
        .spawn(wifi_task(controller))
        .map_err(|e| BootstrapError::Spawn(detail(e)))?;

    Ok(stack)
}

#[embassy_executor::task]
async fn net_task(mut runner: embassy_net::Runner<'static, WifiDevice<'static>>) {
    runner.run().await;
}

/// Reassociate whenever the station drops off the network.
///
/// Requests fail at accept or I/O while the link is down; the DHCP client
/// inside the stack renews the lease once it is back.
#[embassy_executor::task]
async fn wifi_task(mut controller: WifiController<'static>) {
    loop {
        controller.wait_for_event(WifiEvent::StaDisconnected).await;
        warn!("Wi-Fi STA disconnected; will retry");

        loop {
            Timer::after(RECONNECT_BACKOFF).await;
            match controller.connect_async().await {
                Ok(()) => {
                    info!("Wi-Fi reconnected");
                    break;
                }
                Err(e) => error!("wifi reconnect: {:?}", e),
            }
        }
    }
}
