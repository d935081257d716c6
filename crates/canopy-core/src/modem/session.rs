//! Modem session state and the startup command sequencer.
//!
//! All waits here are bounded polling loops against the receive channel:
//! pop a byte if one is pending, otherwise sleep one poll tick and charge it
//! against the window. That keeps millisecond-scale responsiveness while
//! guaranteeing every wait terminates. None of the waits are cancellable;
//! each runs to success or to its own timeout, and no layer inherits time
//! already spent by another.

use embassy_time::{Duration, Timer};
use embedded_io_async::Write;
use log::{debug, info, warn};

use super::LinkError;
use super::channel::RxConsumer;
use super::command::{CommandStep, ESCAPE_SEQUENCE, RESET_COMMAND, STARTUP_SEQUENCE};
use super::scanner::TokenScanner;

/// Attempts the startup sequencer makes before declaring the link faulted.
pub const STARTUP_ATTEMPTS: u8 = 3;

/// Where the modem currently is in its mode progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No bring-up has been attempted yet.
    Uninitialized,
    /// A command sequence is in flight; bytes on the wire are AT framing.
    CommandMode,
    /// Pass-through established: writes are raw payload to the remote peer.
    Transparent,
    /// Startup exhausted all attempts. Terminal until [`ModemLink::restart`].
    Faulted,
}

/// Delay and window constants for the link, expressed as deadlines against
/// the monotonic clock. Production code uses [`LinkTiming::DESIGN`]; tests
/// inject shorter windows through the same struct.
#[derive(Debug, Clone, Copy)]
pub struct LinkTiming {
    /// Granularity of every polling loop.
    pub poll: Duration,
    /// Settle delay between writing a command and scanning for its ack.
    pub settle: Duration,
    /// Accumulated-idle budget for one command acknowledgement.
    pub token_window: Duration,
    /// Pause between failed startup attempts.
    pub retry_backoff: Duration,
    /// Pause after the escape sequence before the reset command.
    pub escape_settle: Duration,
    /// Time granted to the modem's own reboot after reset.
    pub reboot_wait: Duration,
    /// Consecutive-idle budget while collecting an HTTP response.
    pub response_idle: Duration,
}

impl LinkTiming {
    pub const DESIGN: Self = Self {
        poll: Duration::from_millis(1),
        settle: Duration::from_millis(1000),
        token_window: Duration::from_millis(1000),
        retry_backoff: Duration::from_millis(2000),
        escape_settle: Duration::from_millis(500),
        reboot_wait: Duration::from_millis(3000),
        response_idle: Duration::from_millis(15_000),
    };
}

/// Command/response and transparent-mode session with the WiFi modem.
///
/// Owns the transmit port and the consumer half of the receive channel; the
/// producer half stays with the UART receive path. Everything here runs in
/// one cooperative context, so no locking is involved past the channel
/// boundary.
pub struct ModemLink<'ch, W> {
    pub(crate) port: W,
    pub(crate) rx: RxConsumer<'ch>,
    pub(crate) state: SessionState,
    pub(crate) timing: LinkTiming,
}

impl<'ch, W: Write> ModemLink<'ch, W> {
    pub fn new(port: W, rx: RxConsumer<'ch>) -> Self {
        Self::with_timing(port, rx, LinkTiming::DESIGN)
    }

    pub fn with_timing(port: W, rx: RxConsumer<'ch>, timing: LinkTiming) -> Self {
        Self {
            port,
            rx,
            state: SessionState::Uninitialized,
            timing,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Hands raw bytes to the transmit port, blocking until all are queued.
    ///
    /// In transparent mode this is payload; during bring-up it is command
    /// framing. Success means the port accepted the bytes, nothing more.
    pub async fn write_bytes(&mut self, buf: &[u8]) -> Result<(), LinkError> {
        self.port.write_all(buf).await.map_err(|_| LinkError::Write)?;
        self.port.flush().await.map_err(|_| LinkError::Write)
    }

    /// Polls the receive channel until the acknowledgement token shows up,
    /// charging idle poll ticks against the token window.
    pub(crate) async fn await_acknowledgement(&mut self) -> Result<(), LinkError> {
        let mut scanner = TokenScanner::new();
        let mut idle = Duration::from_millis(0);

        while idle < self.timing.token_window {
            match self.rx.try_pop() {
                Some(byte) => {
                    if scanner.accept(byte) {
                        return Ok(());
                    }
                }
                None => {
                    Timer::after(self.timing.poll).await;
                    idle += self.timing.poll;
                }
            }
        }
        Err(LinkError::StepTimeout)
    }

    /// Runs an ordered command sequence, retrying the whole list with
    /// backoff. A step that times out abandons the rest of its attempt.
    pub(crate) async fn run_sequence(
        &mut self,
        sequence: &[CommandStep],
        attempts: u8,
    ) -> Result<(), LinkError> {
        for attempt in 1..=attempts {
            let mut failed_step = None;

            for step in sequence {
                self.write_bytes(step.text.as_bytes()).await?;
                Timer::after(self.timing.settle).await;

                if let Err(err) = self.await_acknowledgement().await {
                    debug!("step {:?} not acknowledged on attempt {attempt}", step.text);
                    failed_step = Some(err);
                    break;
                }
            }

            match failed_step {
                None => return Ok(()),
                Some(_) if attempt < attempts => {
                    Timer::after(self.timing.retry_backoff).await;
                }
                Some(_) => {}
            }
        }
        Err(LinkError::SequenceExhausted)
    }

    /// Brings the modem from scratch to an armed transparent session.
    ///
    /// On failure the session lands in [`SessionState::Faulted`] and stays
    /// there; only [`ModemLink::restart`] leaves that state.
    pub async fn initialize(&mut self) -> Result<(), LinkError> {
        self.rx.drain();
        self.state = SessionState::CommandMode;

        match self.run_sequence(STARTUP_SEQUENCE, STARTUP_ATTEMPTS).await {
            Ok(()) => {
                info!("modem link up, transparent mode armed");
                self.state = SessionState::Transparent;
                Ok(())
            }
            Err(err) => {
                warn!("modem startup failed: {err}");
                self.state = SessionState::Faulted;
                Err(err)
            }
        }
    }

    /// Escapes transparent mode, soft-resets the modem, and reruns the full
    /// startup sequence once. Works from any prior state; the caller is
    /// blocked for the escape and reboot delays plus the bring-up itself.
    pub async fn restart(&mut self) -> Result<(), LinkError> {
        info!("restarting modem link");
        self.write_bytes(ESCAPE_SEQUENCE.as_bytes()).await?;
        Timer::after(self.timing.escape_settle).await;
        self.write_bytes(RESET_COMMAND.as_bytes()).await?;
        Timer::after(self.timing.reboot_wait).await;
        self.initialize().await
    }
}
