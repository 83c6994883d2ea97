//! Oscilloscope client and background receiver
//!
//! [`ScopeReceiver`] owns the read side of the port on its own thread. It
//! reassembles frames and publishes each complete capture into a
//! [`LatestCapture`], replacing the previous one; readers only ever see
//! whole, CRC-checked frames.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use oscgen_core::config::{DAC_MAX_CODE, VREF_MV};
use oscgen_protocol::commands::{CMD_SCOPE_DATA, CMD_SET_SAMPLE_RATE, CMD_SET_TRIGGER, CMD_STREAM};
use oscgen_protocol::{
    frame_size, ReassemblerStats, ScopeData, ScopeDataHeader, StreamReassembler,
    MAX_PAYLOAD_SIZE,
};
use tracing::{debug, info, warn};

use crate::error::{HostError, Result};
use crate::link::{is_idle, CommandLink};
use crate::sequence::SequenceTracker;

/// Receive buffer; fits the largest frame the wire format allows
pub const RX_BUFFER: usize = frame_size(MAX_PAYLOAD_SIZE);

/// Sends oscilloscope commands
pub struct ScopeClient<T> {
    link: CommandLink<T>,
}

impl<T: Write> ScopeClient<T> {
    pub fn new(port: T) -> Self {
        Self {
            link: CommandLink::new(port),
        }
    }

    pub fn start(&mut self) -> Result<u16> {
        self.link.send(CMD_STREAM, &[1])
    }

    pub fn stop(&mut self) -> Result<u16> {
        self.link.send(CMD_STREAM, &[0])
    }

    pub fn set_sample_rate(&mut self, hz: u32) -> Result<u16> {
        self.link.send(CMD_SET_SAMPLE_RATE, &hz.to_le_bytes())
    }

    /// Forward a board-specific trigger configuration
    pub fn set_trigger(&mut self, config: &[u8]) -> Result<u16> {
        self.link.send(CMD_SET_TRIGGER, config)
    }

    pub fn into_inner(self) -> T {
        self.link.into_inner()
    }
}

/// One acquisition received from the board
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub sequence: u16,
    pub header: ScopeDataHeader,
    pub samples: Vec<u16>,
    pub received_at: Instant,
}

impl Capture {
    fn from_data(sequence: u16, data: &ScopeData<'_>) -> Self {
        Self {
            sequence,
            header: data.header,
            samples: data.samples().collect(),
            received_at: Instant::now(),
        }
    }

    /// Time covered by the samples
    pub fn duration(&self) -> Duration {
        match self.header.sample_rate_hz {
            0 => Duration::ZERO,
            rate => Duration::from_secs_f64(self.samples.len() as f64 / rate as f64),
        }
    }

    /// Samples converted to millivolts
    pub fn millivolts(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples
            .iter()
            .map(|&code| code as f64 * VREF_MV as f64 / DAC_MAX_CODE as f64)
    }

    /// Smallest and largest raw sample
    pub fn range(&self) -> Option<(u16, u16)> {
        let min = self.samples.iter().copied().min()?;
        let max = self.samples.iter().copied().max()?;
        Some((min, max))
    }
}

/// Single-slot holder for the newest capture
#[derive(Debug, Clone, Default)]
pub struct LatestCapture(Arc<Mutex<Option<Capture>>>);

impl LatestCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held capture
    pub fn publish(&self, capture: Capture) {
        *self.lock() = Some(capture);
    }

    /// Copy of the newest capture
    pub fn latest(&self) -> Option<Capture> {
        self.lock().clone()
    }

    /// Take the newest capture, leaving the slot empty
    pub fn take(&self) -> Option<Capture> {
        self.lock().take()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Capture>> {
        // a panicked writer cannot leave a half-written capture behind
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Counters reported when the receiver stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub captures: u64,
    /// Data frames the sequence numbers say never arrived
    pub missed: u64,
    /// Valid frames that were not oscilloscope data
    pub ignored: u64,
    pub link: ReassemblerStats,
}

/// Background thread turning port bytes into captures
pub struct ScopeReceiver {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Result<ReceiverStats>>,
}

impl ScopeReceiver {
    /// Start receiving from `port`
    ///
    /// The thread ends when [`stop`](Self::stop) is called, the port reports
    /// end of stream, or a read fails.
    pub fn spawn<R>(port: R, latest: LatestCapture) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("oscgen-scope-rx".into())
            .spawn(move || receive_loop(port, latest, &flag))?;
        Ok(Self { stop, handle })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Ask the thread to stop and wait for it
    pub fn stop(self) -> Result<ReceiverStats> {
        self.stop.store(true, Ordering::Relaxed);
        self.join()
    }

    /// Wait for the thread to end on its own
    pub fn join(self) -> Result<ReceiverStats> {
        self.handle.join().map_err(|_| HostError::ReceiverPanicked)?
    }
}

fn receive_loop<R: Read>(
    mut port: R,
    latest: LatestCapture,
    stop: &AtomicBool,
) -> Result<ReceiverStats> {
    let mut rx: Box<StreamReassembler<RX_BUFFER>> = Box::default();
    let mut tracker = SequenceTracker::new();
    let mut stats = ReceiverStats::default();
    let mut buf = vec![0u8; 4096];

    info!("scope receiver started");
    while !stop.load(Ordering::Relaxed) {
        let n = match port.read(&mut buf) {
            Ok(0) => {
                debug!("port closed");
                break;
            }
            Ok(n) => n,
            Err(e) if is_idle(&e) => continue,
            Err(e) => {
                warn!("read failed: {e}");
                return Err(e.into());
            }
        };

        rx.push(&buf[..n], |frame| {
            if frame.command != CMD_SCOPE_DATA {
                stats.ignored += 1;
                return;
            }
            match ScopeData::parse(frame.payload) {
                Ok(data) => {
                    let gap = tracker.observe(frame.sequence);
                    if gap > 0 {
                        debug!(sequence = frame.sequence, gap, "data frames missed");
                    }
                    stats.captures += 1;
                    latest.publish(Capture::from_data(frame.sequence, &data));
                }
                Err(e) => warn!(sequence = frame.sequence, "bad data payload: {e}"),
            }
        });
    }

    stats.missed = tracker.missed();
    stats.link = rx.stats();
    info!(
        captures = stats.captures,
        missed = stats.missed,
        crc_errors = stats.link.crc_errors,
        "scope receiver stopped"
    );
    Ok(stats)
}
