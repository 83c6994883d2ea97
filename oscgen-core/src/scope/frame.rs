//! Sealed acquisition frames

use embedded_io::Write;
use oscgen_protocol::commands::CMD_SCOPE_DATA;
use oscgen_protocol::scope::MAX_FRAME_SAMPLES;
use oscgen_protocol::{FrameEncoder, ScopeDataHeader};

use crate::config::FRAME_POINTS;

/// Samples encoded per write when streaming a frame out
const TX_CHUNK_SAMPLES: usize = 32;

/// One complete acquisition as handed to the transmit path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionFrame<const P: usize = FRAME_POINTS> {
    pub sample_rate_hz: u32,
    /// Samples captured before the trigger point
    pub pretrigger_count: u16,
    sample_count: u16,
    samples: [u16; P],
}

impl<const P: usize> Default for AcquisitionFrame<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const P: usize> AcquisitionFrame<P> {
    /// Create an empty frame
    pub const fn new() -> Self {
        Self {
            sample_rate_hz: 0,
            pretrigger_count: 0,
            sample_count: 0,
            samples: [0; P],
        }
    }

    /// Build a frame from captured samples, keeping at most `P`
    pub fn from_samples(sample_rate_hz: u32, pretrigger_count: u16, samples: &[u16]) -> Self {
        let mut frame = Self::new();
        frame.sample_rate_hz = sample_rate_hz;
        frame.pretrigger_count = pretrigger_count;
        frame.set_samples(samples);
        frame
    }

    /// Capacity in samples
    pub const fn capacity(&self) -> usize {
        P
    }

    pub fn sample_count(&self) -> u16 {
        self.sample_count
    }

    pub fn samples(&self) -> &[u16] {
        &self.samples[..self.sample_count as usize]
    }

    /// Replace the samples, truncating to capacity
    pub fn set_samples(&mut self, samples: &[u16]) {
        let n = samples.len().min(P).min(MAX_FRAME_SAMPLES);
        self.samples[..n].copy_from_slice(&samples[..n]);
        self.sample_count = n as u16;
    }

    /// Storage for the ring to copy a slot into
    pub(crate) fn fill(&mut self, sample_count: u16) -> &mut [u16] {
        let n = (sample_count as usize).min(P);
        self.sample_count = n as u16;
        &mut self.samples[..n]
    }

    /// Data payload header for this frame
    pub fn data_header(&self, channel: u8) -> ScopeDataHeader {
        ScopeDataHeader {
            sample_rate_hz: self.sample_rate_hz,
            channel,
            sample_count: self.sample_count,
            pretrigger_count: self.pretrigger_count,
        }
    }

    /// Stream this frame out as one data frame
    ///
    /// Samples are encoded in small chunks so no second frame-sized buffer
    /// is needed.
    pub fn write_data_frame<W: Write>(
        &self,
        writer: &mut W,
        sequence: u16,
        channel: u8,
    ) -> Result<(), W::Error> {
        let header = self.data_header(channel);
        let mut encoder =
            FrameEncoder::begin(writer, CMD_SCOPE_DATA, sequence, header.payload_len() as u16)?;
        encoder.write_payload(&header.to_bytes())?;

        let mut chunk = [0u8; TX_CHUNK_SAMPLES * 2];
        for block in self.samples().chunks(TX_CHUNK_SAMPLES) {
            for (out, sample) in chunk.chunks_exact_mut(2).zip(block) {
                out.copy_from_slice(&sample.to_le_bytes());
            }
            encoder.write_payload(&chunk[..block.len() * 2])?;
        }
        encoder.finish()
    }
}
