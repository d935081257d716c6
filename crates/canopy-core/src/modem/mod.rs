//! Serial transport and device-protocol layer for the external WiFi modem.
//!
//! The modem (ESP8266-class, AT command set) is driven over a full-duplex
//! UART. Received bytes arrive asynchronously and are parked in a
//! single-producer/single-consumer [`channel`] until the application-context
//! consumer polls them out. On top of that sit the startup [`command`]
//! sequencer, the transparent-mode [`session`], the minimal HTTP exchange
//! ([`http`]), and the restart path plus failure accounting
//! ([`supervisor`]).
//!
//! The modem is used in a single persistent transparent-mode TCP session;
//! there is no multi-socket support and no general AT-command surface.

pub mod channel;
pub mod command;
pub mod http;
pub mod scanner;
pub mod session;
pub mod supervisor;

#[cfg(test)]
mod testutil;

pub use channel::{RxChannel, RxConsumer, RxProducer};
pub use session::{LinkTiming, ModemLink, SessionState};
pub use supervisor::UplinkHealth;

use thiserror_no_std::Error;

/// Failures surfaced by the modem link.
///
/// Channel overflow is deliberately absent: dropped receive bytes are a
/// counted, non-fatal outcome (see [`channel::RxConsumer::dropped`]), not an
/// error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// A command step did not see its acknowledgement token in time.
    /// Recovered internally by the sequencer's retry loop.
    #[error("command step timed out waiting for acknowledgement")]
    StepTimeout,
    /// Every startup attempt failed; the session is left [`SessionState::Faulted`]
    /// and only [`ModemLink::restart`] can recover it.
    #[error("startup sequence exhausted all attempts")]
    SequenceExhausted,
    /// The underlying byte-output primitive reported failure.
    #[error("write to modem failed")]
    Write,
    /// No header terminator arrived before the inactivity window elapsed.
    #[error("no response before inactivity timeout")]
    ResponseTimeout,
    /// The response status line was absent or malformed.
    #[error("malformed HTTP status line")]
    Parse,
    /// An exchange was attempted while the modem is not in transparent mode.
    #[error("session is not in transparent mode")]
    NotTransparent,
    /// The rendered request does not fit the transmit buffer.
    #[error("request exceeds transmit buffer")]
    RequestOverflow,
}
