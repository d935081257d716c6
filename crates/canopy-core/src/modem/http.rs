//! Minimal HTTP exchange over the transparent-mode session.
//!
//! Requests are hand-built byte sequences, not validated against RFC
//! grammar; responses are read only far enough to recover the status code.
//! The response body is never read or checked.

use core::fmt::Write as _;

use embassy_time::{Duration, Timer};
use embedded_io_async::Write;
use log::debug;

use super::LinkError;
use super::session::{ModemLink, SessionState};

/// Accumulation bound for one response's status line and headers.
pub const RESPONSE_CAPACITY: usize = 256;

/// Transmit buffer bound for one rendered request.
pub const REQUEST_CAPACITY: usize = 512;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const STATUS_LINE_PREFIX: &[u8] = b"HTTP/1.1 ";

/// Renders a POST request with a JSON body into a single transmit buffer.
///
/// `Content-Length` is the body's byte length; the trailing `\r\n` after
/// the body is sent but not counted, matching what the server-side framing
/// tolerates.
pub(crate) fn render_request(
    path: &str,
    host: &str,
    body: &str,
) -> Result<heapless::String<REQUEST_CAPACITY>, LinkError> {
    let mut request = heapless::String::new();
    write!(
        request,
        "POST {path} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Connection: keep-alive\r\n\
         User-Agent: ESP8266\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {length}\r\n\
         \r\n\
         {body}\r\n",
        length = body.len(),
    )
    .map_err(|_| LinkError::RequestOverflow)?;
    Ok(request)
}

/// Extracts the 3-digit status code following the first `HTTP/1.1 ` in the
/// accumulated response. Exactly three ASCII digits are required.
pub(crate) fn parse_status_code(response: &[u8]) -> Result<u16, LinkError> {
    let at = find_subslice(response, STATUS_LINE_PREFIX).ok_or(LinkError::Parse)?;
    let digits_at = at + STATUS_LINE_PREFIX.len();
    let digits = response.get(digits_at..digits_at + 3).ok_or(LinkError::Parse)?;
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(LinkError::Parse);
    }
    Ok(digits
        .iter()
        .fold(0u16, |code, &d| code * 10 + u16::from(d - b'0')))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

impl<W: Write> ModemLink<'_, W> {
    /// Sends a JSON POST through the transparent session and returns the
    /// response status code.
    ///
    /// Write success only means the port accepted the bytes; the returned
    /// code is the first status line the modem relays back.
    pub async fn post(&mut self, path: &str, host: &str, json: &str) -> Result<u16, LinkError> {
        if self.state != SessionState::Transparent {
            return Err(LinkError::NotTransparent);
        }

        let request = render_request(path, host, json)?;
        self.write_bytes(request.as_bytes()).await?;

        let response = self.read_response().await?;
        let code = parse_status_code(&response)?;
        debug!("POST {path} answered {code}");
        Ok(code)
    }

    /// Collects response bytes until the header terminator appears, the
    /// buffer fills, or the inactivity window passes with nothing received.
    /// Only the inactivity exit is an error; a full buffer is handed to the
    /// parser as-is.
    async fn read_response(&mut self) -> Result<heapless::Vec<u8, RESPONSE_CAPACITY>, LinkError> {
        let mut response = heapless::Vec::new();
        let mut idle = Duration::from_millis(0);

        loop {
            match self.rx.try_pop() {
                Some(byte) => {
                    idle = Duration::from_millis(0);
                    if response.push(byte).is_err() || response.is_full() {
                        break;
                    }
                    if response.ends_with(HEADER_TERMINATOR) {
                        break;
                    }
                }
                None => {
                    if idle >= self.timing.response_idle {
                        return Err(LinkError::ResponseTimeout);
                    }
                    Timer::after(self.timing.poll).await;
                    idle += self.timing.poll;
                }
            }
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::string::String;
    use std::vec::Vec;

    use embassy_futures::block_on;
    use embassy_time::Instant;

    use super::super::channel::RxChannel;
    use super::super::testutil::{NullPort, ScriptedPort, TEST_TIMING, reply_with, silent};
    use super::*;

    fn transparent_link<'a>(
        channel: &'a mut RxChannel,
        reply: super::super::testutil::ReplyRule,
    ) -> ModemLink<'a, ScriptedPort<'a>> {
        let (producer, consumer) = channel.split();
        let mut link =
            ModemLink::with_timing(ScriptedPort::new(producer, reply), consumer, TEST_TIMING);
        link.state = SessionState::Transparent;
        link
    }

    #[test]
    fn parses_status_from_captured_response() {
        assert_eq!(
            parse_status_code(b"HTTP/1.1 404 Not Found\r\n\r\n"),
            Ok(404)
        );
    }

    #[test]
    fn rejects_response_without_status_line() {
        assert_eq!(
            parse_status_code(b"garbage with no status"),
            Err(LinkError::Parse)
        );
    }

    #[test]
    fn rejects_truncated_or_nonnumeric_codes() {
        assert_eq!(parse_status_code(b"HTTP/1.1 20"), Err(LinkError::Parse));
        assert_eq!(parse_status_code(b"HTTP/1.1 2x0 OK"), Err(LinkError::Parse));
    }

    #[test]
    fn content_length_matches_body_byte_length() {
        let body = "{\"temperature\": 23.4, \"humidity\": 51.0, \"light\": 640}";
        let request = render_request("/api/data", "117.72.118.76:3000", body).unwrap();
        let text = request.as_str();

        // Recover the declared length and the actual body and re-measure.
        let declared: usize = text
            .lines()
            .find_map(|line| line.strip_prefix("Content-Length: "))
            .and_then(|v| v.trim().parse().ok())
            .unwrap();
        let sent_body = text
            .split_once("\r\n\r\n")
            .map(|(_, rest)| rest.strip_suffix("\r\n").unwrap())
            .unwrap();

        assert_eq!(declared, body.len());
        assert_eq!(sent_body.len(), declared);
        assert_eq!(sent_body, body);
    }

    #[test]
    fn request_is_rendered_field_for_field() {
        let request = render_request("/api/data", "example.test:80", "{}").unwrap();
        assert_eq!(
            request.as_str(),
            "POST /api/data HTTP/1.1\r\n\
             Host: example.test:80\r\n\
             Connection: keep-alive\r\n\
             User-Agent: ESP8266\r\n\
             Content-Type: application/json\r\n\
             Content-Length: 2\r\n\
             \r\n\
             {}\r\n"
        );
    }

    #[test]
    fn oversized_request_is_refused() {
        let body: String = core::iter::repeat('x').take(REQUEST_CAPACITY).collect();
        assert_eq!(
            render_request("/api/data", "h", &body),
            Err(LinkError::RequestOverflow)
        );
    }

    #[test]
    fn post_parses_status_from_scripted_response() {
        let mut channel = RxChannel::new();
        let mut link = transparent_link(
            &mut channel,
            reply_with(b"HTTP/1.1 404 Not Found\r\n\r\n"),
        );

        let code = block_on(link.post("/api/data", "example.test:80", "{}"));
        assert_eq!(code, Ok(404));
    }

    #[test]
    fn post_times_out_after_full_inactivity_window() {
        let mut channel = RxChannel::new();
        let mut link = transparent_link(&mut channel, silent());

        let started = Instant::now();
        let result = block_on(link.post("/api/data", "example.test:80", "{}"));
        assert_eq!(result, Err(LinkError::ResponseTimeout));
        assert!(started.elapsed() >= TEST_TIMING.response_idle);
    }

    #[test]
    fn post_refused_outside_transparent_mode() {
        let mut channel = RxChannel::new();
        let (producer, consumer) = channel.split();
        let mut link = ModemLink::with_timing(
            ScriptedPort::new(producer, silent()),
            consumer,
            TEST_TIMING,
        );

        let result = block_on(link.post("/api/data", "example.test:80", "{}"));
        assert_eq!(result, Err(LinkError::NotTransparent));
        assert!(link.port.writes.is_empty());
    }

    #[test]
    fn full_buffer_without_terminator_still_parses() {
        // A status line followed by enough header bytes to overrun the
        // accumulation buffer, with the terminator never arriving. Trickled
        // in from a thread so the consumer drains the channel as it fills.
        let mut response: Vec<u8> = b"HTTP/1.1 200 OK\r\nX-Padding: ".to_vec();
        response.resize(RESPONSE_CAPACITY + 32, b'a');

        let channel = std::boxed::Box::leak(std::boxed::Box::new(RxChannel::new()));
        let (mut producer, consumer) = channel.split();

        let handle = std::thread::spawn(move || {
            for chunk in response.chunks(64) {
                for &byte in chunk {
                    producer.push(byte);
                }
                std::thread::sleep(std::time::Duration::from_millis(5));
            }
        });

        let mut link = ModemLink::with_timing(NullPort, consumer, TEST_TIMING);
        link.state = SessionState::Transparent;

        let code = block_on(link.post("/api/data", "example.test:80", "{}"));
        assert_eq!(code, Ok(200));
        handle.join().unwrap();
    }

    #[test]
    fn late_bytes_keep_resetting_the_idle_window() {
        // Producer trickles the response in from a thread with gaps shorter
        // than the idle window; the exchange must still complete.
        let channel = std::boxed::Box::leak(std::boxed::Box::new(RxChannel::new()));
        let (mut producer, consumer) = channel.split();

        let handle = std::thread::spawn(move || {
            for chunk in [&b"HTTP/1.1 2"[..], b"01 Created", b"\r\n\r\n"] {
                std::thread::sleep(std::time::Duration::from_millis(10));
                for &byte in chunk {
                    producer.push(byte);
                }
            }
        });

        let mut link = ModemLink::with_timing(NullPort, consumer, TEST_TIMING);
        link.state = SessionState::Transparent;

        let code = block_on(link.post("/api/data", "example.test:80", "{}"));
        assert_eq!(code, Ok(201));
        handle.join().unwrap();
    }
}
