//! Lock-free SPSC ring buffers: the outbound MIDI byte ring and the GUI
//! capture ring. Both are built on `ringbuf`'s heap-backed ring (the same
//! crate and lock-free style used for audio-thread-safe queues elsewhere
//! in the retrieved corpus), wrapped to match this engine's exact
//! reject-on-full and sentinel-on-empty contracts.

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Default capacity of the outbound MIDI byte ring.
pub const OUTBOUND_RING_CAPACITY: usize = 3072;

/// Capacity of the control-thread injection ring (the `send_*` API's
/// backing store). Synthetic sends are rare compared to routed traffic,
/// so this is deliberately much smaller than the outbound ring.
pub const INJECT_RING_CAPACITY: usize = 256;

/// Number of slots in the GUI capture ring.
pub const CAPTURE_RING_CAPACITY: usize = 32;

/// Anything the output phase can drain a framed byte stream from: the
/// callback's own outbound ring, or a split-off consumer half fed by a
/// different producer (the control thread's injection ring).
pub trait ByteSource {
    fn read_into(&mut self, buf: &mut [u8]) -> usize;
}

/// Anything a framed message can be written into: the callback's own
/// outbound ring, or a split-off producer half (the control thread's
/// injection ring). Lets `send.rs`'s helpers serve both the RT callback
/// and the control-thread Send API from one implementation.
pub trait ByteSink {
    fn write(&mut self, bytes: &[u8]) -> bool;
}

/// Byte-granular SPSC ring feeding the output phase of the process
/// callback. A short (1-3 byte) message is written atomically or
/// rejected outright; there are never partial writes.
pub struct OutboundRing {
    prod: HeapProd<u8>,
    cons: HeapCons<u8>,
}

impl OutboundRing {
    pub fn new(capacity: usize) -> Self {
        let (prod, cons) = HeapRb::<u8>::new(capacity).split();
        Self { prod, cons }
    }

    /// Write `bytes` atomically, or reject if there isn't room for the
    /// whole message. Never writes a prefix of `bytes`.
    pub fn write(&mut self, bytes: &[u8]) -> bool {
        if self.prod.vacant_len() < bytes.len() {
            return false;
        }
        self.prod.push_slice(bytes) == bytes.len()
    }

    pub fn occupied_len(&self) -> usize {
        self.cons.occupied_len()
    }

    /// Copy up to `buf.len()` occupied bytes out, returning how many were
    /// read. Used by the output phase to drain the ring each period.
    pub fn read_into(&mut self, buf: &mut [u8]) -> usize {
        self.cons.pop_slice(buf)
    }

    /// Split into a producer, handed to whichever thread originates
    /// synthetic sends, and a consumer drained by the process callback.
    /// Unlike the callback's own bundled ring, this is for a second,
    /// independent SPSC channel (the injection ring) — not for sharing
    /// one ring between two producers, which `ringbuf` does not support.
    pub fn split(self) -> (OutboundProducer, OutboundConsumer) {
        (OutboundProducer { prod: self.prod }, OutboundConsumer { cons: self.cons })
    }
}

impl ByteSource for OutboundRing {
    fn read_into(&mut self, buf: &mut [u8]) -> usize {
        self.cons.pop_slice(buf)
    }
}

impl ByteSink for OutboundRing {
    fn write(&mut self, bytes: &[u8]) -> bool {
        OutboundRing::write(self, bytes)
    }
}

/// Producer half of a split `OutboundRing`, held by the control thread's
/// `send_*` API.
pub struct OutboundProducer {
    prod: HeapProd<u8>,
}

impl OutboundProducer {
    pub fn write(&mut self, bytes: &[u8]) -> bool {
        if self.prod.vacant_len() < bytes.len() {
            return false;
        }
        self.prod.push_slice(bytes) == bytes.len()
    }
}

impl ByteSink for OutboundProducer {
    fn write(&mut self, bytes: &[u8]) -> bool {
        OutboundProducer::write(self, bytes)
    }
}

/// Consumer half of a split `OutboundRing`, drained by the process
/// callback's output phase alongside its own filtered-output ring.
pub struct OutboundConsumer {
    cons: HeapCons<u8>,
}

impl ByteSource for OutboundConsumer {
    fn read_into(&mut self, buf: &mut [u8]) -> usize {
        self.cons.pop_slice(buf)
    }
}

/// Sink half of the GUI capture ring, implemented by anything the process
/// callback can push a captured word into. Lets `callback::input_phase`
/// take either the bundled `CaptureRing` (unit tests) or a
/// `CaptureProducer` split off and handed to the real-time thread while
/// its `CaptureConsumer` lives on the GUI poll thread.
pub trait CaptureSink {
    /// Push a captured event. Returns `false` (drops silently) if the
    /// consumer hasn't kept up and the ring is full.
    fn write(&mut self, event: u32) -> bool;
}

/// 32-slot SPSC ring of packed MIDI words feeding the GUI poll. `0` is
/// the empty sentinel: no valid captured event produces a zero status
/// byte, so reading 0 unambiguously means "nothing new".
pub struct CaptureRing {
    prod: HeapProd<u32>,
    cons: HeapCons<u32>,
}

impl CaptureRing {
    pub fn new() -> Self {
        let (prod, cons) = HeapRb::<u32>::new(CAPTURE_RING_CAPACITY).split();
        Self { prod, cons }
    }

    /// Pop the next captured event, or `0` if the ring is empty.
    pub fn read(&mut self) -> u32 {
        self.cons.try_pop().unwrap_or(0)
    }

    /// Split into a producer, handed to the real-time callback, and a
    /// consumer, handed to the GUI poll thread.
    pub fn split(self) -> (CaptureProducer, CaptureConsumer) {
        (CaptureProducer { prod: self.prod }, CaptureConsumer { cons: self.cons })
    }
}

impl Default for CaptureRing {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSink for CaptureRing {
    fn write(&mut self, event: u32) -> bool {
        self.prod.try_push(event).is_ok()
    }
}

/// Producer half of a split `CaptureRing`. `Send` so it can move into the
/// real-time callback's owning struct.
pub struct CaptureProducer {
    prod: HeapProd<u32>,
}

impl CaptureSink for CaptureProducer {
    fn write(&mut self, event: u32) -> bool {
        self.prod.try_push(event).is_ok()
    }
}

/// Consumer half of a split `CaptureRing`, polled by the GUI/watch thread.
pub struct CaptureConsumer {
    cons: HeapCons<u32>,
}

impl CaptureConsumer {
    pub fn read(&mut self) -> u32 {
        self.cons.try_pop().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_ring_rejects_when_full_without_partial_write() {
        let mut ring = OutboundRing::new(4);
        assert!(ring.write(&[1, 2, 3]));
        assert!(!ring.write(&[4, 5]));
        let mut buf = [0u8; 8];
        let n = ring.read_into(&mut buf);
        assert_eq!(n, 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
    }

    #[test]
    fn outbound_ring_full_at_exact_capacity_boundary() {
        let mut ring = OutboundRing::new(OUTBOUND_RING_CAPACITY);
        for _ in 0..1024 {
            assert!(ring.write(&[0x90, 60, 100]));
        }
        // ring is now exactly full (3072 bytes); one more byte must be rejected
        assert!(!ring.write(&[1]));
    }

    #[test]
    fn capture_ring_sentinel_on_empty_then_one_write_one_read() {
        let mut ring = CaptureRing::new();
        assert_eq!(ring.read(), 0);
        assert!(ring.write(0xB0_07_40));
        assert_eq!(ring.read(), 0xB0_07_40);
        assert_eq!(ring.read(), 0);
    }

    #[test]
    fn outbound_ring_split_producer_and_consumer_see_the_same_bytes() {
        let (mut producer, mut consumer) = OutboundRing::new(16).split();
        assert!(producer.write(&[0x90, 60, 100]));
        let mut buf = [0u8; 8];
        assert_eq!(consumer.read_into(&mut buf), 3);
        assert_eq!(&buf[..3], &[0x90, 60, 100]);
    }
}
