#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Delay;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::interrupt::software::SoftwareInterruptControl;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::tsens::{Config as TsensConfig, TemperatureSensor};
use log::info;
use static_cell::ConstStaticCell;

use picotemp_core::config::{LISTEN_PORT, MAX_CONNECTIONS};
use picotemp_core::liveness::report_liveness;
use picotemp_core::{BlinkQueue, ConnectionHandler, FeedbackController};
use picotemp_firmware::listener::{SocketBuffers, SocketPool};
use picotemp_firmware::net;
use picotemp_firmware::sensor::OnDieSensor;
use picotemp_firmware::wifi_secrets::NETWORK;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

/// Blink requests from the connection loop to the LED.
static BLINK_QUEUE: BlinkQueue<CriticalSectionRawMutex> = BlinkQueue::new();

static SOCKET_BUFFERS: ConstStaticCell<[SocketBuffers; MAX_CONNECTIONS]> =
    ConstStaticCell::new([const { SocketBuffers::new() }; MAX_CONNECTIONS]);

/// Status LED, active high.
type Led = Output<'static>;

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!(log::LevelFilter::Info);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Wi-Fi needs a heap
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 65536);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_interrupt = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_interrupt.software_interrupt0);

    info!("Embassy initialized!");

    let stack = net::bring_up(&spawner, peripherals.WIFI, NETWORK)
        .await
        .unwrap_or_else(|e| panic!("setup DHCP: {}", e));

    let mut led: Led = Output::new(peripherals.GPIO15, Level::Low, OutputConfig::default());
    led.set_high();

    let tsens = TemperatureSensor::new(peripherals.TSENS, TsensConfig::default())
        .unwrap_or_else(|e| panic!("temperature sensor init: {:?}", e));
    let sensor = OnDieSensor::new(tsens);

    let listener = SocketPool::new(stack, SOCKET_BUFFERS.take(), LISTEN_PORT);
    match stack.config_v4() {
        Some(cfg) => info!("listening addr=http://{}:{}", cfg.address.address(), LISTEN_PORT),
        None => info!("listening port={}", LISTEN_PORT),
    }

    spawner.spawn(feedback_task(led)).expect("feedback_task spawn");
    spawner
        .spawn(connection_task(listener, sensor))
        .expect("connection_task spawn");

    report_liveness(&mut Delay).await
}

#[embassy_executor::task]
async fn connection_task(mut listener: SocketPool<'static>, sensor: OnDieSensor<'static>) {
    let mut handler = ConnectionHandler::new(sensor, BLINK_QUEUE.sender());
    handler.run(&mut listener, &mut Delay).await
}

#[embassy_executor::task]
async fn feedback_task(led: Led) {
    let mut controller = FeedbackController::new(led, BLINK_QUEUE.receiver());
    controller.run(&mut Delay).await
}
