//! Oscilloscope data frame payload
//!
//! ```text
//! ┌────────────────┬─────────┬──────────────┬────────────┬─────────────────────┐
//! │ SAMPLE_RATE_HZ │ CHANNEL │ SAMPLE_COUNT │ PRETRIGGER │ SAMPLES             │
//! │ 4B             │ 1B      │ 2B           │ 2B         │ SAMPLE_COUNT × 2B   │
//! └────────────────┴─────────┴──────────────┴────────────┴─────────────────────┘
//! ```

use crate::commands::CommandError;
use crate::frame::MAX_PAYLOAD_SIZE;

/// Fixed part of the data payload
pub const SCOPE_HEADER_SIZE: usize = 9;

/// Most samples a single data frame can carry
pub const MAX_FRAME_SAMPLES: usize = (MAX_PAYLOAD_SIZE - SCOPE_HEADER_SIZE) / 2;

/// Metadata preceding the samples in a data frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScopeDataHeader {
    pub sample_rate_hz: u32,
    pub channel: u8,
    pub sample_count: u16,
    /// Samples captured before the trigger point
    pub pretrigger_count: u16,
}

impl ScopeDataHeader {
    /// Total payload length including samples
    pub fn payload_len(&self) -> usize {
        SCOPE_HEADER_SIZE + self.sample_count as usize * 2
    }

    /// Serialize the fixed part of the payload
    pub fn to_bytes(&self) -> [u8; SCOPE_HEADER_SIZE] {
        let mut out = [0u8; SCOPE_HEADER_SIZE];
        out[..4].copy_from_slice(&self.sample_rate_hz.to_le_bytes());
        out[4] = self.channel;
        out[5..7].copy_from_slice(&self.sample_count.to_le_bytes());
        out[7..9].copy_from_slice(&self.pretrigger_count.to_le_bytes());
        out
    }
}

/// Parsed data payload borrowing its samples from the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeData<'a> {
    pub header: ScopeDataHeader,
    samples: &'a [u8],
}

impl<'a> ScopeData<'a> {
    /// Parse a data payload
    ///
    /// Fails if the payload is shorter than the sample count it announces.
    pub fn parse(payload: &'a [u8]) -> Result<Self, CommandError> {
        if payload.len() < SCOPE_HEADER_SIZE {
            return Err(CommandError::Truncated);
        }
        let header = ScopeDataHeader {
            sample_rate_hz: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
            channel: payload[4],
            sample_count: u16::from_le_bytes([payload[5], payload[6]]),
            pretrigger_count: u16::from_le_bytes([payload[7], payload[8]]),
        };
        let end = header.payload_len();
        if payload.len() < end {
            return Err(CommandError::Truncated);
        }

        Ok(Self {
            header,
            samples: &payload[SCOPE_HEADER_SIZE..end],
        })
    }

    /// Iterate over raw ADC readings
    pub fn samples(&self) -> impl Iterator<Item = u16> + 'a {
        self.samples
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = ScopeDataHeader {
            sample_rate_hz: 100_000,
            channel: 1,
            sample_count: 2,
            pretrigger_count: 0,
        };
        assert_eq!(header.to_bytes(), [0xA0, 0x86, 0x01, 0x00, 1, 2, 0, 0, 0]);
        assert_eq!(header.payload_len(), 13);
    }

    #[test]
    fn test_parse_data_payload() {
        let payload = [0xA0, 0x86, 0x01, 0x00, 0, 3, 0, 1, 0, 1, 0, 0xFF, 0x0F, 0x00, 0x08];
        let data = ScopeData::parse(&payload).unwrap();
        assert_eq!(data.header.sample_rate_hz, 100_000);
        assert_eq!(data.header.sample_count, 3);
        assert_eq!(data.header.pretrigger_count, 1);

        let mut samples = data.samples();
        assert_eq!(samples.next(), Some(1));
        assert_eq!(samples.next(), Some(0x0FFF));
        assert_eq!(samples.next(), Some(0x0800));
        assert_eq!(samples.next(), None);
    }

    #[test]
    fn test_parse_short_sample_block() {
        // announces 4 samples, carries 1
        let payload = [0, 0, 0, 0, 0, 4, 0, 0, 0, 1, 0];
        assert_eq!(ScopeData::parse(&payload), Err(CommandError::Truncated));
    }

    #[test]
    fn test_parse_short_header() {
        assert_eq!(ScopeData::parse(&[0; 8]), Err(CommandError::Truncated));
    }
}
