//! Scripted transmit port for protocol tests.
//!
//! Plays the modem's role: records every outbound write and, when a reply
//! rule matches, feeds the canned response straight into the receive
//! channel's producer half, just as the UART interrupt would.

use std::boxed::Box;
use std::vec::Vec;

use embassy_time::Duration;
use embedded_io_async::ErrorKind;

use super::channel::RxProducer;
use super::session::LinkTiming;

/// Shortened windows so timeout paths resolve in milliseconds. Same shape
/// as [`LinkTiming::DESIGN`], same poll granularity.
pub(crate) const TEST_TIMING: LinkTiming = LinkTiming {
    poll: Duration::from_millis(1),
    settle: Duration::from_millis(1),
    token_window: Duration::from_millis(30),
    retry_backoff: Duration::from_millis(2),
    escape_settle: Duration::from_millis(1),
    reboot_wait: Duration::from_millis(1),
    response_idle: Duration::from_millis(40),
};

pub(crate) type ReplyRule = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>> + Send>;

/// Replies with the acknowledgement token to every write.
pub(crate) fn ack_all() -> ReplyRule {
    Box::new(|_| Some(b"\r\nOK\r\n".to_vec()))
}

/// Replies only to writes exactly matching `command`.
pub(crate) fn ack_only(command: &'static [u8]) -> ReplyRule {
    Box::new(move |written| (written == command).then(|| b"\r\nOK\r\n".to_vec()))
}

/// Never replies.
pub(crate) fn silent() -> ReplyRule {
    Box::new(|_| None)
}

/// Replies to every write with one fixed byte string.
pub(crate) fn reply_with(response: &'static [u8]) -> ReplyRule {
    Box::new(move |_| Some(response.to_vec()))
}

/// Transmit port that accepts and discards everything. Used when the
/// response side is scripted by a producer thread instead of reply rules.
pub(crate) struct NullPort;

impl embedded_io_async::ErrorType for NullPort {
    type Error = ErrorKind;
}

impl embedded_io_async::Write for NullPort {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub(crate) struct ScriptedPort<'a> {
    producer: RxProducer<'a>,
    reply: ReplyRule,
    pub writes: Vec<Vec<u8>>,
    pub fail_writes: bool,
}

impl<'a> ScriptedPort<'a> {
    pub fn new(producer: RxProducer<'a>, reply: ReplyRule) -> Self {
        Self {
            producer,
            reply,
            writes: Vec::new(),
            fail_writes: false,
        }
    }
}

impl embedded_io_async::ErrorType for ScriptedPort<'_> {
    type Error = ErrorKind;
}

impl embedded_io_async::Write for ScriptedPort<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.fail_writes {
            return Err(ErrorKind::Other);
        }
        self.writes.push(buf.to_vec());
        if let Some(response) = (self.reply)(buf) {
            for byte in response {
                self.producer.push(byte);
            }
        }
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
