#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use canopy_core::alarm::AlarmController;
use canopy_core::config::{MAIN_LOOP_DELAY, POST_PATH, SENSOR_SETTLE_DELAY, SERVER_HOST};
use canopy_core::filter::{EnvSmoother, SmoothedEnv};
use canopy_core::modem::{ModemLink, RxChannel, RxProducer, UplinkHealth};
use canopy_core::telemetry::EnvReport;
use canopy_firmware::buzzer::Buzzer;
use canopy_firmware::sensors::{Dht11, LightSensor};
use embassy_executor::Spawner;
use embassy_time::{Duration, Instant, Timer};
use embedded_io_async::{Read as _, Write};
use esp_hal::Async;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Flex, Level, Output, OutputConfig};
use esp_hal::timer::timg::TimerGroup;
use esp_hal::uart::{Config as UartConfig, Uart, UartRx};
use rtt_target::rprintln;
use static_cell::StaticCell;

const MODEM_BAUD: u32 = 115_200;

/// Extra settle time after a forced modem restart, before the next cycle.
const POST_RESTART_DELAY: Duration = Duration::from_millis(3000);

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

static RX_CHANNEL: StaticCell<RxChannel> = StaticCell::new();

/// Drains the modem UART into the byte channel. This is the task-context
/// analogue of a receive interrupt: it must never block on the consumer.
#[embassy_executor::task]
async fn modem_rx(mut rx: UartRx<'static, Async>, mut producer: RxProducer<'static>) {
    let mut buf = [0u8; 64];
    loop {
        match rx.read(&mut buf).await {
            Ok(n) => {
                for &byte in &buf[..n] {
                    producer.push(byte);
                }
            }
            Err(err) => rprintln!("modem uart read error: {:?}", err),
        }
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_print!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    rprintln!("Embassy initialized!");

    // Modem UART and its receive channel
    let uart_config = UartConfig::default().with_baudrate(MODEM_BAUD);
    let uart = Uart::new(peripherals.UART1, uart_config)
        .expect("Failed to initialize modem UART")
        .with_tx(peripherals.GPIO17)
        .with_rx(peripherals.GPIO18)
        .into_async();
    let (uart_rx, uart_tx) = uart.split();

    let (producer, consumer) = RX_CHANNEL.init(RxChannel::new()).split();
    spawner
        .spawn(modem_rx(uart_rx, producer))
        .expect("Failed to spawn modem receive task");

    let mut link = ModemLink::new(uart_tx, consumer);

    // Sensors and alarm output
    let mut dht = Dht11::new(Flex::new(peripherals.GPIO4));
    let mut light = LightSensor::new(peripherals.ADC1, peripherals.GPIO1);
    let mut buzzer = Buzzer::new(Output::new(
        peripherals.GPIO5,
        Level::High,
        OutputConfig::default(),
    ));

    Timer::after(SENSOR_SETTLE_DELAY).await;

    if let Err(err) = link.initialize().await {
        rprintln!("modem bring-up failed: {}", err);
    }

    let mut smoother = EnvSmoother::new();
    let mut alarm = AlarmController::new();
    let mut health = UplinkHealth::new();

    loop {
        match dht.read().await {
            Ok(frame) => {
                health.record_sensor_success();

                let smoothed =
                    smoother.smooth(frame.temperature(), frame.humidity(), light.read_level());
                rprintln!(
                    "T:{:.1}C H:{:.1}% Lux:{}",
                    smoothed.temperature,
                    smoothed.humidity,
                    smoothed.light
                );

                buzzer.apply(alarm.update(
                    smoothed.light,
                    smoothed.temperature as i16,
                    smoothed.humidity as i16,
                    Instant::now(),
                ));

                if health.should_upload(Instant::now()) {
                    upload(&mut link, &mut health, &smoothed).await;
                } else {
                    rprintln!("upload held off, waiting out the retry interval");
                }
            }
            Err(err) => {
                rprintln!("sensor read failed: {}", err);
                if health.record_sensor_failure() {
                    rprintln!("reinitializing sensor after repeated failures");
                    Timer::after(Duration::from_millis(1000)).await;
                }
            }
        }

        Timer::after(MAIN_LOOP_DELAY).await;
    }
}

/// One upload attempt: render the telemetry frame, post it, and feed the
/// outcome into the health record. Three consecutive failures force a full
/// modem restart before the next cycle.
async fn upload<W: Write>(
    link: &mut ModemLink<'_, W>,
    health: &mut UplinkHealth,
    smoothed: &SmoothedEnv,
) {
    let report = EnvReport {
        temperature: smoothed.temperature,
        humidity: smoothed.humidity,
        light: smoothed.light,
    };
    let json = match report.to_json() {
        Ok(json) => json,
        Err(_) => {
            rprintln!("telemetry body did not fit its buffer");
            return;
        }
    };

    match link.post(POST_PATH, SERVER_HOST, &json).await {
        Ok(code) => {
            rprintln!("upload accepted: {}", code);
            health.record_upload_success(Instant::now());
        }
        Err(err) => {
            rprintln!("upload failed: {}", err);
            if health.record_upload_failure(Instant::now()) {
                rprintln!("restarting modem after repeated upload failures");
                if let Err(err) = link.restart().await {
                    rprintln!("modem restart failed: {}", err);
                }
                health.note_restart();
                Timer::after(POST_RESTART_DELAY).await;
            }
        }
    }
}
