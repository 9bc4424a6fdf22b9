//! Desktop simulator for the picotemp network temperature sensor.
//!
//! Serves the same JSON endpoint as the firmware over `std::net`, reads the
//! host's thermal zone in place of the on-die sensor and prints LED changes
//! to the log.
//!
//! ```text
//! RUST_LOG=debug cargo run -p picotemp-simulator
//! curl http://127.0.0.1:8080/
//! ```

mod host;

use std::f64::consts::TAU;
use std::path::PathBuf;
use std::time::Instant as StdInstant;
use std::{env, fs};

use embassy_executor::{Executor, Spawner};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Delay;
use embedded_hal::digital::{ErrorType, OutputPin};
use log::{debug, error, info, warn};

use picotemp_core::liveness::report_liveness;
use picotemp_core::{BlinkQueue, ConnectionHandler, FeedbackController, TemperatureSource};

use host::HostListener;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Port 80 needs privileges on most hosts.
const DEFAULT_ADDR: &str = "0.0.0.0:8080";

const DEFAULT_THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Synthetic reading when the host has no thermal zone: 23 °C ± 3 °C.
const SYNTHETIC_BASE_MILLICELSIUS: f64 = 23_000.0;
const SYNTHETIC_SWING_MILLICELSIUS: f64 = 3_000.0;
const SYNTHETIC_PERIOD_SECS: f64 = 120.0;

static BLINK_QUEUE: BlinkQueue<CriticalSectionRawMutex> = BlinkQueue::new();

// ---------------------------------------------------------------------------
// Host devices
// ---------------------------------------------------------------------------

/// Reads the Linux thermal zone, falling back to a synthetic curve.
struct ThermalZoneSensor {
    path: PathBuf,
    started: StdInstant,
    warned: bool,
}

impl ThermalZoneSensor {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            started: StdInstant::now(),
            warned: false,
        }
    }

    fn read_zone(&self) -> Option<i32> {
        fs::read_to_string(&self.path).ok()?.trim().parse().ok()
    }

    fn synthetic(&self) -> i32 {
        let t = self.started.elapsed().as_secs_f64();
        let phase = TAU * t / SYNTHETIC_PERIOD_SECS;
        (SYNTHETIC_BASE_MILLICELSIUS + SYNTHETIC_SWING_MILLICELSIUS * phase.sin()) as i32
    }
}

impl TemperatureSource for ThermalZoneSensor {
    fn read_millicelsius(&mut self) -> i32 {
        match self.read_zone() {
            Some(millicelsius) => millicelsius,
            None => {
                if !self.warned {
                    warn!(
                        "thermal zone {} unreadable, serving synthetic temperatures",
                        self.path.display()
                    );
                    self.warned = true;
                }
                self.synthetic()
            }
        }
    }
}

/// LED that only exists in the log.
#[derive(Default)]
struct ConsoleLed {
    on: bool,
}

impl ErrorType for ConsoleLed {
    type Error = core::convert::Infallible;
}

impl ConsoleLed {
    fn set(&mut self, on: bool) {
        if self.on != on {
            debug!("LED {}", if on { "on" } else { "off" });
        }
        self.on = on;
    }
}

impl OutputPin for ConsoleLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[embassy_executor::task]
async fn connection_task(mut listener: HostListener, sensor: ThermalZoneSensor) {
    let mut handler = ConnectionHandler::new(sensor, BLINK_QUEUE.sender());
    handler.run(&mut listener, &mut Delay).await
}

#[embassy_executor::task]
async fn feedback_task(led: ConsoleLed) {
    let mut controller = FeedbackController::new(led, BLINK_QUEUE.receiver());
    controller.run(&mut Delay).await
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting picotemp simulator");

    let addr = env::var("PICOTEMP_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = match HostListener::bind(addr.as_str()) {
        Ok(listener) => listener,
        Err(e) => {
            error!("listen on {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    match listener.local_addr() {
        Ok(local) => info!("listening addr=http://{}", local),
        Err(_) => info!("listening addr=http://{}", addr),
    }

    let zone = env::var_os("PICOTEMP_THERMAL_ZONE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_THERMAL_ZONE));
    let sensor = ThermalZoneSensor::new(zone);

    // Blocking socket calls must not stall the LED and liveness tasks.
    std::thread::spawn(move || {
        let executor: &'static mut Executor = Box::leak(Box::new(Executor::new()));
        executor.run(|spawner| {
            spawner
                .spawn(connection_task(listener, sensor))
                .expect("connection_task spawn");
        })
    });

    let mut led = ConsoleLed::default();
    let _ = led.set_high();
    spawner.spawn(feedback_task(led)).expect("feedback_task spawn");

    report_liveness(&mut Delay).await
}
