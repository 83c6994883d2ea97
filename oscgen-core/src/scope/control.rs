//! Streaming settings shared between the main loop and the acquisition
//! interrupt

use core::sync::atomic::Ordering;

use portable_atomic::{AtomicBool, AtomicU16, AtomicU32};

use crate::config::DEFAULT_SAMPLE_RATE_HZ;

/// Live acquisition settings
///
/// Written only by the [`ScopeDevice`](super::ScopeDevice), read by the
/// [`FrameAssembler`](super::FrameAssembler) at every DMA hand-off.
pub struct AcquisitionControl {
    streaming: AtomicBool,
    /// Bumped on every stream start so the assembler drops its partial frame
    epoch: AtomicU32,
    sample_rate_hz: AtomicU32,
    pretrigger_count: AtomicU16,
}

impl Default for AcquisitionControl {
    fn default() -> Self {
        Self::new()
    }
}

impl AcquisitionControl {
    /// Stopped, at the default sample rate
    pub const fn new() -> Self {
        Self {
            streaming: AtomicBool::new(false),
            epoch: AtomicU32::new(0),
            sample_rate_hz: AtomicU32::new(DEFAULT_SAMPLE_RATE_HZ),
            pretrigger_count: AtomicU16::new(0),
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }

    /// Stream start counter
    pub fn epoch(&self) -> u32 {
        self.epoch.load(Ordering::Acquire)
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz.load(Ordering::Relaxed)
    }

    pub fn pretrigger_count(&self) -> u16 {
        self.pretrigger_count.load(Ordering::Relaxed)
    }

    /// Begin a new stream; the next block starts a fresh frame
    pub(crate) fn start(&self) {
        let epoch = self.epoch.load(Ordering::Relaxed).wrapping_add(1);
        self.epoch.store(epoch, Ordering::Release);
        self.streaming.store(true, Ordering::Release);
    }

    /// Stop accepting blocks at the next hand-off
    pub(crate) fn stop(&self) {
        self.streaming.store(false, Ordering::Release);
    }

    pub(crate) fn set_sample_rate_hz(&self, hz: u32) {
        self.sample_rate_hz.store(hz, Ordering::Relaxed);
    }

    pub(crate) fn set_pretrigger_count(&self, count: u16) {
        self.pretrigger_count.store(count, Ordering::Relaxed);
    }
}
