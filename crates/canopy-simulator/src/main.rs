//! Desktop simulator for the canopy-rs monitoring node.
//!
//! Runs the real protocol stack against a scripted in-process modem, so the
//! whole bring-up / upload / restart cycle can be exercised without
//! hardware. Sensor data is synthetic; smoothing, alarming, telemetry
//! rendering, and the HTTP exchange all run exactly as on-device.
//!
//! The link uses its production timing, so expect the startup sequence to
//! take a few seconds. Run with `RUST_LOG=debug` to watch the modem side.

mod modem_sim;

use std::sync::mpsc;

use canopy_core::alarm::AlarmController;
use canopy_core::config::{POST_PATH, SERVER_HOST};
use canopy_core::filter::{EnvSmoother, SmoothedEnv};
use canopy_core::modem::{ModemLink, RxChannel, UplinkHealth};
use canopy_core::telemetry::EnvReport;
use embassy_time::{Duration, Instant, Timer};
use log::{error, info, warn};

use modem_sim::SimTx;

/// Sampling cycles to run before the forced restart.
const CYCLES: u32 = 5;

/// Pause between simulated cycles (compressed from the on-device loop delay).
const CYCLE_DELAY: Duration = Duration::from_millis(250);

/// Generates synthetic environmental readings that vary over time.
struct MockEnvGenerator {
    /// Monotonic seconds counter used as the fake timebase.
    elapsed_secs: f64,
}

impl MockEnvGenerator {
    fn new() -> Self {
        Self { elapsed_secs: 0.0 }
    }

    /// Advance the internal clock and return (temperature, humidity, light).
    fn next_sample(&mut self, dt_secs: f64) -> (f64, f64, f64) {
        self.elapsed_secs += dt_secs;
        let t = self.elapsed_secs;

        // Temperature: 20–26 °C sinusoidal with slow drift
        let temperature = 23.0 + 3.0 * (t / 120.0).sin() + 0.5 * (t / 37.0).cos();

        // Humidity: 40–60 % with a different period
        let humidity = 50.0 + 10.0 * (t / 180.0).sin() + 2.0 * (t / 23.0).cos();

        // Light: 400–800 on the display scale, longer cycle
        let light = 600.0 + 200.0 * (t / 300.0).sin() + 30.0 * (t / 41.0).cos();

        (temperature, humidity, light)
    }
}

fn main() {
    env_logger::init();
    info!("Starting canopy-rs simulator");

    // The channel outlives both the link and the modem thread.
    let channel: &'static mut RxChannel = Box::leak(Box::new(RxChannel::new()));
    let (producer, consumer) = channel.split();

    let (writes_tx, writes_rx) = mpsc::channel();
    let modem = modem_sim::spawn(writes_rx, producer);

    let link = ModemLink::new(SimTx::new(writes_tx), consumer);
    embassy_futures::block_on(run(link));

    // Dropping the link closed the write channel; the modem thread follows.
    let _ = modem.join();
    info!("Simulator exiting");
}

async fn run(mut link: ModemLink<'static, SimTx>) {
    if let Err(err) = link.initialize().await {
        error!("modem bring-up failed: {err}");
        return;
    }

    let mut generator = MockEnvGenerator::new();
    let mut smoother = EnvSmoother::new();
    let mut alarm = AlarmController::new();
    let mut health = UplinkHealth::new();

    for cycle in 1..=CYCLES {
        let (temperature, humidity, light) = generator.next_sample(1.0);
        let smoothed = smoother.smooth(temperature, humidity, light);
        info!(
            "cycle {cycle}: T:{:.1}C H:{:.1}% Lux:{}",
            smoothed.temperature, smoothed.humidity, smoothed.light
        );

        if alarm.update(
            smoothed.light,
            smoothed.temperature as i16,
            smoothed.humidity as i16,
            Instant::now(),
        ) {
            warn!("alarm sounding: readings out of range");
        }

        if health.should_upload(Instant::now()) {
            upload(&mut link, &mut health, &smoothed).await;
        } else {
            info!("upload held off, waiting out the retry interval");
        }

        Timer::after(CYCLE_DELAY).await;
    }

    // Exercise the recovery path: escape, reset, full bring-up, then prove
    // the relink with one more exchange.
    info!("forcing a link restart");
    if let Err(err) = link.restart().await {
        error!("restart failed: {err}");
        return;
    }
    info!("link re-established");

    let (temperature, humidity, light) = generator.next_sample(1.0);
    let smoothed = smoother.smooth(temperature, humidity, light);
    upload(&mut link, &mut health, &smoothed).await;
}

async fn upload(link: &mut ModemLink<'static, SimTx>, health: &mut UplinkHealth, smoothed: &SmoothedEnv) {
    let report = EnvReport {
        temperature: smoothed.temperature,
        humidity: smoothed.humidity,
        light: smoothed.light,
    };
    let json = match report.to_json() {
        Ok(json) => json,
        Err(_) => {
            warn!("telemetry body did not fit its buffer");
            return;
        }
    };

    match link.post(POST_PATH, SERVER_HOST, &json).await {
        Ok(code) => {
            info!("upload accepted: {code}");
            health.record_upload_success(Instant::now());
        }
        Err(err) => {
            warn!("upload failed: {err}");
            if health.record_upload_failure(Instant::now()) {
                warn!("restarting modem after repeated upload failures");
                if let Err(err) = link.restart().await {
                    error!("modem restart failed: {err}");
                }
                health.note_restart();
            }
        }
    }
}
