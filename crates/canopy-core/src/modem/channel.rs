//! Interrupt-fed receive channel between the UART and the protocol layer.
//!
//! A lock-free single-producer/single-consumer byte ring: the producer half
//! runs in interrupt (or interrupt-analogue task) context and must never
//! block, the consumer half is polled from application context. The queue
//! indices are advanced atomically, so no further synchronization is needed
//! across the boundary.
//!
//! When the ring is full, newly arriving bytes are dropped. That is a bound
//! on memory, not an error; the drop count is kept in an atomic counter so
//! the consumer side can observe gaps instead of them disappearing silently.

use core::sync::atomic::{AtomicU32, Ordering};

use heapless::spsc::{Consumer, Producer, Queue};

/// Ring size in bytes. Like the hardware ring it replaces, one slot is kept
/// free to distinguish full from empty, so `RX_CHANNEL_CAPACITY - 1` bytes
/// can be in flight at once.
pub const RX_CHANNEL_CAPACITY: usize = 256;

/// Receive channel storage. Lives in a `static` (firmware) or a leaked
/// allocation (host); [`RxChannel::split`] hands out the two halves.
pub struct RxChannel {
    queue: Queue<u8, RX_CHANNEL_CAPACITY>,
    dropped: AtomicU32,
}

impl RxChannel {
    pub const fn new() -> Self {
        Self {
            queue: Queue::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Splits the channel into its producer and consumer halves.
    pub fn split(&mut self) -> (RxProducer<'_>, RxConsumer<'_>) {
        let (producer, consumer) = self.queue.split();
        (
            RxProducer {
                inner: producer,
                dropped: &self.dropped,
            },
            RxConsumer {
                inner: consumer,
                dropped: &self.dropped,
            },
        )
    }
}

impl Default for RxChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer half, owned by the receive interrupt (or its task analogue).
pub struct RxProducer<'a> {
    inner: Producer<'a, u8>,
    dropped: &'a AtomicU32,
}

impl RxProducer<'_> {
    /// Commits one received byte. Never blocks: if the ring is full the byte
    /// is discarded and the drop counter advances.
    pub fn push(&mut self, byte: u8) {
        if self.inner.enqueue(byte).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Consumer half, polled from application context.
pub struct RxConsumer<'a> {
    inner: Consumer<'a, u8>,
    dropped: &'a AtomicU32,
}

impl RxConsumer<'_> {
    /// Takes the oldest pending byte, if any. Non-blocking.
    pub fn try_pop(&mut self) -> Option<u8> {
        self.inner.dequeue()
    }

    /// Discards everything currently queued. Used before a fresh command
    /// sequence so stale modem chatter cannot satisfy a token wait.
    pub fn drain(&mut self) {
        while self.inner.dequeue().is_some() {}
    }

    /// Total bytes dropped on the producer side since creation.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_bytes_in_arrival_order() {
        let mut channel = RxChannel::new();
        let (mut producer, mut consumer) = channel.split();

        for byte in 0..100u8 {
            producer.push(byte);
        }
        for expected in 0..100u8 {
            assert_eq!(consumer.try_pop(), Some(expected));
        }
        assert_eq!(consumer.try_pop(), None);
    }

    #[test]
    fn never_duplicates_across_wraparound() {
        let mut channel = RxChannel::new();
        let (mut producer, mut consumer) = channel.split();

        // Push/pop more total bytes than the ring holds so both indices wrap.
        let mut received = std::vec::Vec::new();
        for round in 0..8u32 {
            for i in 0..200u32 {
                producer.push(((round * 200 + i) % 251) as u8);
            }
            while let Some(byte) = consumer.try_pop() {
                received.push(byte);
            }
        }

        let expected: std::vec::Vec<u8> = (0..8 * 200u32).map(|n| (n % 251) as u8).collect();
        assert_eq!(received, expected);
        assert_eq!(consumer.dropped(), 0);
    }

    #[test]
    fn overflow_drops_newest_and_counts() {
        let mut channel = RxChannel::new();
        let (mut producer, mut consumer) = channel.split();

        // One slot stays free, so the ring holds RX_CHANNEL_CAPACITY - 1.
        for byte in 0..(RX_CHANNEL_CAPACITY as u32 + 40) {
            producer.push(byte as u8);
        }
        assert_eq!(consumer.dropped(), 41);

        // Everything that fit comes out in order, with no stale survivors.
        for expected in 0..(RX_CHANNEL_CAPACITY as u32 - 1) {
            assert_eq!(consumer.try_pop(), Some(expected as u8));
        }
        assert_eq!(consumer.try_pop(), None);
    }

    #[test]
    fn drain_discards_pending_bytes() {
        let mut channel = RxChannel::new();
        let (mut producer, mut consumer) = channel.split();

        for byte in b"stale chatter" {
            producer.push(*byte);
        }
        consumer.drain();
        assert_eq!(consumer.try_pop(), None);

        producer.push(b'x');
        assert_eq!(consumer.try_pop(), Some(b'x'));
    }

    #[test]
    fn concurrent_producer_preserves_order() {
        // The producer half is moved to another thread, mirroring the
        // interrupt/application split of the real device.
        let channel = std::boxed::Box::leak(std::boxed::Box::new(RxChannel::new()));
        let (mut producer, mut consumer) = channel.split();

        let handle = std::thread::spawn(move || {
            for byte in 0..200u8 {
                producer.push(byte);
                std::thread::yield_now();
            }
        });

        let mut received = std::vec::Vec::new();
        while received.len() < 200 {
            if let Some(byte) = consumer.try_pop() {
                received.push(byte);
            }
        }
        handle.join().unwrap();

        let expected: std::vec::Vec<u8> = (0..200u8).collect();
        assert_eq!(received, expected);
    }
}
