//! Fixed design-time configuration for the monitoring node.
//!
//! These are compile-time constants, not runtime-tunable parameters. The
//! remote endpoint must match the TCP target opened by the modem startup
//! sequence in [`crate::modem::command`].

use embassy_time::Duration;

/// Host header value for uploads (address and port of the ingest server).
pub const SERVER_HOST: &str = "117.72.118.76:3000";

/// Request path for telemetry uploads.
pub const POST_PATH: &str = "/api/data";

/// Delay between application loop cycles.
pub const MAIN_LOOP_DELAY: Duration = Duration::from_millis(1000);

/// Settle time after peripheral bring-up before the first sample.
pub const SENSOR_SETTLE_DELAY: Duration = Duration::from_millis(100);
