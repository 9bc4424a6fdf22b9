//! Wi-Fi credentials baked in by `build.rs` from `.env` (see `.env.example`)

use picotemp_core::config::NetworkConfig;

pub const WIFI_SSID: &str = env!("WIFI_SSID", "WIFI_SSID not set; create .env from .env.example");
pub const WIFI_PASSWORD: &str = env!(
    "WIFI_PASSWORD",
    "WIFI_PASSWORD not set; create .env from .env.example"
);

pub const NETWORK: NetworkConfig<'static> = NetworkConfig::new(WIFI_SSID, WIFI_PASSWORD);
