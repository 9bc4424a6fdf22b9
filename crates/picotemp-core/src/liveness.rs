//! Periodic "still alive" log line

use embedded_hal_async::delay::DelayNs;
use log::info;

use crate::config::LIVENESS_PERIOD;

pub const LIVENESS_MESSAGE: &str = "Waiting for connection...";

/// Log [`LIVENESS_MESSAGE`] once per [`LIVENESS_PERIOD`], forever.
pub async fn report_liveness<D: DelayNs>(delay: &mut D) -> ! {
    loop {
        liveness_tick(delay).await;
    }
}

/// Wait out one period and log.
pub async fn liveness_tick<D: DelayNs>(delay: &mut D) {
    delay.delay_ms(LIVENESS_PERIOD.as_millis() as u32).await;
    info!("{}", LIVENESS_MESSAGE);
}
