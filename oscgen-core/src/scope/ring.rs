//! Overwrite-oldest frame ring
//!
//! A fixed arena of `SLOTS` frame slots shared by one producer (the
//! acquisition interrupt) and one consumer (the main loop). The producer
//! never blocks and never reads the consumer's position: it always fills
//! slot `written % SLOTS` in place and publishes it by bumping `written`.
//! The consumer notices when it has fallen more than `SLOTS - 1` frames
//! behind and skips to the oldest frame still intact.
//!
//! Samples are stored in atomics so a slot can be read while the producer
//! is overwriting it. A copy is only accepted if the write counter shows
//! the producer had not started on that slot again by the time the copy
//! finished; otherwise the consumer skips ahead and retries.
//!
//! Counters wrap at `u32::MAX`; `SLOTS` must be a power of two so slot
//! indices stay continuous across the wrap.

use core::sync::atomic::{fence, Ordering};

use portable_atomic::{AtomicU16, AtomicU32};

use super::AcquisitionFrame;
use crate::config::{FRAME_POINTS, RING_SLOTS};
use oscgen_protocol::scope::MAX_FRAME_SAMPLES;

/// Returned by [`RingConsumer::pop_into`] when nothing is unread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RingEmpty;

struct FrameSlot<const P: usize> {
    sample_rate_hz: AtomicU32,
    sample_count: AtomicU16,
    pretrigger_count: AtomicU16,
    samples: [AtomicU16; P],
}

impl<const P: usize> FrameSlot<P> {
    const fn new() -> Self {
        Self {
            sample_rate_hz: AtomicU32::new(0),
            sample_count: AtomicU16::new(0),
            pretrigger_count: AtomicU16::new(0),
            samples: [const { AtomicU16::new(0) }; P],
        }
    }
}

/// Lock-free single-producer single-consumer frame ring
///
/// Holds up to `SLOTS - 1` sealed frames; the remaining slot is the one
/// being filled.
pub struct FrameRing<const SLOTS: usize = RING_SLOTS, const P: usize = FRAME_POINTS> {
    slots: [FrameSlot<P>; SLOTS],
    /// Frames sealed so far, written only by the producer
    written: AtomicU32,
    /// Frames consumed or skipped, written only by the consumer
    read: AtomicU32,
}

impl<const SLOTS: usize, const P: usize> Default for FrameRing<SLOTS, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SLOTS: usize, const P: usize> FrameRing<SLOTS, P> {
    /// Sealed frames the ring retains
    pub const CAPACITY: usize = SLOTS - 1;

    /// Create an empty ring
    ///
    /// Usable in a `static`.
    pub const fn new() -> Self {
        assert!(SLOTS >= 2 && SLOTS.is_power_of_two(), "slot count must be a power of two");
        assert!(P > 0 && P <= MAX_FRAME_SAMPLES, "frame must fit one data frame");
        Self {
            slots: [const { FrameSlot::new() }; SLOTS],
            written: AtomicU32::new(0),
            read: AtomicU32::new(0),
        }
    }

    /// Sealed frames the ring retains
    pub const fn capacity(&self) -> usize {
        Self::CAPACITY
    }

    /// Split into the producer and consumer halves
    pub fn split(&mut self) -> (RingProducer<'_, SLOTS, P>, RingConsumer<'_, SLOTS, P>) {
        let written = self.written.load(Ordering::Relaxed);
        let read = self.read.load(Ordering::Relaxed);
        let ring: &Self = self;
        (
            RingProducer { ring, written },
            RingConsumer {
                ring,
                read,
                dropped: 0,
            },
        )
    }

    fn slot(&self, count: u32) -> &FrameSlot<P> {
        &self.slots[count as usize % SLOTS]
    }
}

/// Writing half of a [`FrameRing`]
pub struct RingProducer<'a, const SLOTS: usize = RING_SLOTS, const P: usize = FRAME_POINTS> {
    ring: &'a FrameRing<SLOTS, P>,
    written: u32,
}

impl<const SLOTS: usize, const P: usize> RingProducer<'_, SLOTS, P> {
    /// Frames sealed so far
    pub fn sealed(&self) -> u32 {
        self.written
    }

    /// Store samples into the frame being filled, starting at `offset`
    ///
    /// Returns how many fit before the frame is full.
    pub fn write_samples(&mut self, offset: usize, samples: &[u16]) -> usize {
        let slot = self.ring.slot(self.written);
        let Some(free) = slot.samples.get(offset..) else {
            return 0;
        };
        let n = free.len().min(samples.len());
        for (cell, &sample) in free[..n].iter().zip(samples) {
            cell.store(sample, Ordering::Relaxed);
        }
        n
    }

    /// Publish the frame being filled and move to the next slot
    ///
    /// If the consumer is `SLOTS - 1` frames behind, the oldest unread frame
    /// is lost.
    pub fn seal(&mut self, sample_count: u16, sample_rate_hz: u32, pretrigger_count: u16) {
        let slot = self.ring.slot(self.written);
        slot.sample_count
            .store(sample_count.min(P as u16), Ordering::Relaxed);
        slot.sample_rate_hz.store(sample_rate_hz, Ordering::Relaxed);
        slot.pretrigger_count
            .store(pretrigger_count, Ordering::Relaxed);

        self.written = self.written.wrapping_add(1);
        self.ring.written.store(self.written, Ordering::Release);
        // stores into the next slot must not become visible before the count
        fence(Ordering::Release);
    }

    /// Copy a complete frame in and seal it
    pub fn push(&mut self, frame: &AcquisitionFrame<P>) {
        let n = self.write_samples(0, frame.samples());
        self.seal(n as u16, frame.sample_rate_hz, frame.pretrigger_count);
    }
}

/// Reading half of a [`FrameRing`]
pub struct RingConsumer<'a, const SLOTS: usize = RING_SLOTS, const P: usize = FRAME_POINTS> {
    ring: &'a FrameRing<SLOTS, P>,
    read: u32,
    dropped: u32,
}

impl<const SLOTS: usize, const P: usize> RingConsumer<'_, SLOTS, P> {
    /// Unread frames still intact
    pub fn len(&self) -> usize {
        let written = self.ring.written.load(Ordering::Acquire);
        (written.wrapping_sub(self.read) as usize).min(FrameRing::<SLOTS, P>::CAPACITY)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frames overwritten before they could be read
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Discard every unread frame
    pub fn clear(&mut self) {
        self.read = self.ring.written.load(Ordering::Acquire);
        self.ring.read.store(self.read, Ordering::Release);
    }

    /// Copy the oldest unread frame into `dst`
    ///
    /// `dst` is only meaningful when this returns `Ok`.
    pub fn pop_into(&mut self, dst: &mut AcquisitionFrame<P>) -> Result<(), RingEmpty> {
        let capacity = FrameRing::<SLOTS, P>::CAPACITY as u32;

        loop {
            let written = self.ring.written.load(Ordering::Acquire);
            let unread = written.wrapping_sub(self.read);
            if unread == 0 {
                return Err(RingEmpty);
            }
            if unread > capacity {
                let lost = unread - capacity;
                self.dropped = self.dropped.wrapping_add(lost);
                self.read = self.read.wrapping_add(lost);
            }

            let slot = self.ring.slot(self.read);
            let count = slot.sample_count.load(Ordering::Relaxed);
            dst.sample_rate_hz = slot.sample_rate_hz.load(Ordering::Relaxed);
            dst.pretrigger_count = slot.pretrigger_count.load(Ordering::Relaxed);
            for (out, cell) in dst.fill(count).iter_mut().zip(slot.samples.iter()) {
                *out = cell.load(Ordering::Relaxed);
            }

            fence(Ordering::Acquire);
            let now = self.ring.written.load(Ordering::Relaxed);
            if now.wrapping_sub(self.read) > capacity {
                // producer came round to this slot mid-copy
                continue;
            }

            self.read = self.read.wrapping_add(1);
            self.ring.read.store(self.read, Ordering::Release);
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    type SmallRing = FrameRing<4, 8>;

    fn frame(tag: u16) -> AcquisitionFrame<8> {
        AcquisitionFrame::from_samples(tag as u32 * 1000, tag, &[tag; 8])
    }

    fn drain(consumer: &mut RingConsumer<'_, 4, 8>) -> Vec<u16> {
        let mut out = AcquisitionFrame::new();
        let mut tags = Vec::new();
        while consumer.pop_into(&mut out).is_ok() {
            assert!(out.samples().iter().all(|&s| s == out.pretrigger_count));
            tags.push(out.pretrigger_count);
        }
        tags
    }

    #[test]
    fn test_empty_ring() {
        let mut ring = SmallRing::new();
        let (_, mut consumer) = ring.split();
        let mut out = AcquisitionFrame::new();
        assert_eq!(consumer.pop_into(&mut out), Err(RingEmpty));
        assert!(consumer.is_empty());
    }

    #[test]
    fn test_fifo_order() {
        let mut ring = SmallRing::new();
        let (mut producer, mut consumer) = ring.split();
        producer.push(&frame(1));
        producer.push(&frame(2));

        assert_eq!(consumer.len(), 2);
        let mut out = AcquisitionFrame::new();
        consumer.pop_into(&mut out).unwrap();
        assert_eq!(out.sample_rate_hz, 1000);
        assert_eq!(out.samples(), &[1; 8]);
        assert_eq!(drain(&mut consumer), [2]);
    }

    #[test]
    fn test_overwrite_oldest() {
        let mut ring = SmallRing::new();
        let (mut producer, mut consumer) = ring.split();
        for tag in 1..=5 {
            producer.push(&frame(tag));
        }

        assert_eq!(consumer.len(), 3);
        assert_eq!(drain(&mut consumer), [3, 4, 5]);
        assert_eq!(consumer.dropped(), 2);
    }

    #[test]
    fn test_partial_frame_written_in_place() {
        let mut ring = SmallRing::new();
        let (mut producer, mut consumer) = ring.split();

        assert_eq!(producer.write_samples(0, &[7; 5]), 5);
        assert_eq!(producer.write_samples(5, &[7; 5]), 3);
        assert_eq!(producer.write_samples(8, &[7]), 0);
        assert!(consumer.is_empty());

        producer.seal(8, 500, 7);
        let mut out = AcquisitionFrame::new();
        consumer.pop_into(&mut out).unwrap();
        assert_eq!(out.samples(), &[7; 8]);
        assert_eq!(out.sample_rate_hz, 500);
    }

    #[test]
    fn test_clear_discards_unread() {
        let mut ring = SmallRing::new();
        let (mut producer, mut consumer) = ring.split();
        producer.push(&frame(1));
        producer.push(&frame(2));
        consumer.clear();
        assert!(consumer.is_empty());

        producer.push(&frame(3));
        assert_eq!(drain(&mut consumer), [3]);
    }

    #[test]
    fn test_positions_survive_resplit() {
        let mut ring = SmallRing::new();
        {
            let (mut producer, mut consumer) = ring.split();
            producer.push(&frame(1));
            producer.push(&frame(2));
            assert_eq!(drain(&mut consumer), [1, 2]);
        }
        let (mut producer, mut consumer) = ring.split();
        assert!(consumer.is_empty());
        producer.push(&frame(3));
        assert_eq!(drain(&mut consumer), [3]);
    }

    #[test]
    fn test_counter_wrap() {
        let mut ring = SmallRing::new();
        ring.written = AtomicU32::new(u32::MAX - 1);
        ring.read = AtomicU32::new(u32::MAX - 1);

        let (mut producer, mut consumer) = ring.split();
        for tag in 1..=4 {
            producer.push(&frame(tag));
        }
        assert_eq!(drain(&mut consumer), [2, 3, 4]);
        assert_eq!(consumer.dropped(), 1);
    }

    #[test]
    fn test_concurrent_frames_complete() {
        let mut ring = FrameRing::<4, 256>::new();
        let (mut producer, mut consumer) = ring.split();

        std::thread::scope(|s| {
            s.spawn(move || {
                for tag in 1..=2000u16 {
                    producer.push(&AcquisitionFrame::from_samples(0, tag, &[tag; 256]));
                }
            });

            let mut out = AcquisitionFrame::new();
            let mut last = 0;
            let mut seen = 0;
            while last < 2000 {
                if consumer.pop_into(&mut out).is_ok() {
                    let tag = out.pretrigger_count;
                    assert!(out.samples().iter().all(|&s| s == tag), "torn frame {tag}");
                    assert!(tag > last);
                    last = tag;
                    seen += 1;
                }
            }
            assert_eq!(seen + consumer.dropped(), 2000);
        });
    }

    proptest! {
        #[test]
        fn test_keeps_newest(pushes in 0u16..40, reads in 0usize..6) {
            let mut ring = SmallRing::new();
            let (mut producer, mut consumer) = ring.split();

            let mut out = AcquisitionFrame::new();
            let mut expected_first = 1;
            // interleave a few early reads
            for tag in 1..=pushes {
                producer.push(&frame(tag));
                if (tag as usize) <= reads && consumer.pop_into(&mut out).is_ok() {
                    prop_assert_eq!(out.pretrigger_count, tag);
                    expected_first = tag + 1;
                }
            }

            let first = expected_first.max(pushes.saturating_sub(3) + 1);
            let expected: Vec<u16> = (first..=pushes).collect();
            prop_assert_eq!(drain(&mut consumer), expected);
        }
    }
}
