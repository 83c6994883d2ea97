//! Acquisition frame assembler
//!
//! Runs in the ADC DMA interrupt. Each half-transfer hands over one block;
//! blocks are written straight into the ring's fill slot and the frame is
//! sealed when it reaches capacity.

use super::{AcquisitionControl, RingProducer};
use crate::config::{FRAME_POINTS, RING_SLOTS};

/// Which half of a circular DMA buffer just completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaHalf {
    First,
    Second,
}

/// Builds frames from sample blocks
pub struct FrameAssembler<'a, const SLOTS: usize = RING_SLOTS, const P: usize = FRAME_POINTS> {
    producer: RingProducer<'a, SLOTS, P>,
    control: &'a AcquisitionControl,
    /// Next sample position in the frame being filled
    cursor: usize,
    epoch: u32,
}

impl<'a, const SLOTS: usize, const P: usize> FrameAssembler<'a, SLOTS, P> {
    pub fn new(producer: RingProducer<'a, SLOTS, P>, control: &'a AcquisitionControl) -> Self {
        Self {
            producer,
            control,
            cursor: 0,
            epoch: control.epoch(),
        }
    }

    /// Samples already in the frame being filled
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Frames sealed so far
    pub fn sealed(&self) -> u32 {
        self.producer.sealed()
    }

    /// Accept one block of raw ADC samples
    ///
    /// Discarded while streaming is off. A block that runs past the end of
    /// the frame continues in the next one.
    pub fn push_block(&mut self, block: &[u16]) {
        if !self.control.is_streaming() {
            return;
        }
        let epoch = self.control.epoch();
        if epoch != self.epoch {
            self.epoch = epoch;
            self.cursor = 0;
        }

        let mut rest = block;
        while !rest.is_empty() {
            let n = self.producer.write_samples(self.cursor, rest);
            self.cursor += n;
            rest = &rest[n..];

            if self.cursor >= P {
                self.producer.seal(
                    P as u16,
                    self.control.sample_rate_hz(),
                    self.control.pretrigger_count(),
                );
                self.cursor = 0;
            }
        }
    }

    /// Hand over the completed half of a circular DMA buffer
    pub fn on_dma_half(&mut self, half: DmaHalf, buffer: &[u16]) {
        let (first, second) = buffer.split_at(buffer.len() / 2);
        match half {
            DmaHalf::First => self.push_block(first),
            DmaHalf::Second => self.push_block(second),
        }
    }
}
