//! Scripted in-process modem.
//!
//! Plays the WiFi modem's role on its own thread, mirroring the
//! interrupt/application split of the real device: the link's writes arrive
//! over an mpsc channel, and responses are pushed straight into the
//! producer half of the byte channel. Understands just enough of the AT
//! dialect for bring-up, transparent-mode HTTP, escape, and reset.

use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use canopy_core::modem::RxProducer;
use log::debug;

/// Transmit port handed to the link. Every write is forwarded to the modem
/// thread as one chunk.
pub struct SimTx {
    chunks: Sender<Vec<u8>>,
}

impl SimTx {
    pub fn new(chunks: Sender<Vec<u8>>) -> Self {
        Self { chunks }
    }
}

impl embedded_io_async::ErrorType for SimTx {
    type Error = embedded_io_async::ErrorKind;
}

impl embedded_io_async::Write for SimTx {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.chunks
            .send(buf.to_vec())
            .map_err(|_| embedded_io_async::ErrorKind::BrokenPipe)?;
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

enum Mode {
    Command,
    Transparent,
}

/// Starts the modem thread. It exits once the write channel closes, i.e.
/// when the link (and its `SimTx`) is dropped.
pub fn spawn(writes: Receiver<Vec<u8>>, mut producer: RxProducer<'static>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut mode = Mode::Command;
        let mut pending: Vec<u8> = Vec::new();

        while let Ok(chunk) = writes.recv() {
            pending.extend_from_slice(&chunk);
            match mode {
                Mode::Command => handle_commands(&mut pending, &mut mode, &mut producer),
                Mode::Transparent => handle_transparent(&mut pending, &mut mode, &mut producer),
            }
        }
        debug!("modem: write channel closed, shutting down");
    })
}

/// Consumes complete `\r\n`-terminated command lines from the buffer.
fn handle_commands(pending: &mut Vec<u8>, mode: &mut Mode, producer: &mut RxProducer<'static>) {
    while let Some(end) = find(pending, b"\r\n") {
        let line: Vec<u8> = pending.drain(..end + 2).collect();
        let line = String::from_utf8_lossy(&line);
        let line = line.trim();
        debug!("modem: command {line:?}");

        if line == "AT+RST" {
            // Reboot: some binary boot chatter, then the ready banner.
            // Deliberately free of the acknowledgement token.
            thread::sleep(Duration::from_millis(100));
            feed(producer, b"\x00\x82rl\xc3\n\r\nready\r\n");
        } else if line.starts_with("AT+CIPSEND") {
            feed(producer, b"\r\nOK\r\n> ");
            *mode = Mode::Transparent;
        } else if line.starts_with("AT") {
            feed(producer, b"\r\nOK\r\n");
        }
    }
}

/// Transparent mode: bytes are payload for the fake remote server, except
/// for the escape sequence.
fn handle_transparent(pending: &mut Vec<u8>, mode: &mut Mode, producer: &mut RxProducer<'static>) {
    if find(pending, b"+++").is_some() {
        debug!("modem: escape sequence, back to command mode");
        pending.clear();
        *mode = Mode::Command;
        return;
    }

    // One request per exchange; answer as soon as its header block is
    // complete and discard the rest (the node never reads a body anyway).
    if find(pending, b"\r\n\r\n").is_some() {
        debug!("modem: forwarding request, relaying server response");
        pending.clear();
        feed(producer, b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
    }
}

fn feed(producer: &mut RxProducer<'static>, bytes: &[u8]) {
    for &byte in bytes {
        producer.push(byte);
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
