//! Sequence gap diagnostics
//!
//! The device numbers its data frames consecutively. Frames lost to the
//! device ring overwriting them, or to corruption on the wire, show up here
//! as gaps.

/// Counts frames missing from a sequence-numbered stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceTracker {
    last: Option<u16>,
    received: u64,
    missed: u64,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a received sequence number; returns how many were skipped
    ///
    /// A repeated or older number (a device restart) resynchronizes without
    /// counting a gap.
    pub fn observe(&mut self, sequence: u16) -> u16 {
        self.received += 1;
        let gap = match self.last {
            Some(last) => {
                let step = sequence.wrapping_sub(last);
                if step == 0 || step > u16::MAX / 2 {
                    0
                } else {
                    step - 1
                }
            }
            None => 0,
        };
        self.missed += gap as u64;
        self.last = Some(sequence);
        gap
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn missed(&self) -> u64 {
        self.missed
    }

    pub fn last(&self) -> Option<u16> {
        self.last
    }
}
