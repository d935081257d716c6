//! Outbound command text for modem bring-up and recovery.
//!
//! Every step is acknowledged by the shared success token within the
//! sequencer's per-step window; there are no step-specific predicates.

/// One outbound command line, terminated by `\r\n` on the wire.
#[derive(Debug, Clone, Copy)]
pub struct CommandStep {
    pub text: &'static str,
}

impl CommandStep {
    pub const fn new(text: &'static str) -> Self {
        Self { text }
    }
}

/// Startup sequence run once at boot and after every restart: probe the
/// modem, open the TCP session, enter transparent mode, arm sending.
///
/// The endpoint baked into the open command must stay in step with
/// [`crate::config::SERVER_HOST`].
pub const STARTUP_SEQUENCE: &[CommandStep] = &[
    CommandStep::new("AT\r\n"),
    CommandStep::new("AT+CIPSTART=\"TCP\",\"117.72.118.76\",3000\r\n"),
    CommandStep::new("AT+CIPMODE=1\r\n"),
    CommandStep::new("AT+CIPSEND\r\n"),
];

/// Escape sequence that drops the modem out of transparent mode. Sent raw,
/// with no line terminator, and not acknowledged.
pub const ESCAPE_SEQUENCE: &str = "+++";

/// Soft-reset command issued after escaping transparent mode.
pub const RESET_COMMAND: &str = "AT+RST\r\n";
