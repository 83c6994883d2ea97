//! Configuration value definitions

use oscgen_protocol::commands::MAX_USER_POINTS;
use oscgen_protocol::WaveKind;

/// DAC/ADC reference voltage in millivolts
pub const VREF_MV: u16 = 3300;

/// Full-scale 12-bit converter code
pub const DAC_MAX_CODE: u16 = 4095;

/// Points in a synthesized table
pub const SYNTH_TABLE_POINTS: usize = 256;

/// Largest table the output engine can hold
pub const MAX_TABLE_POINTS: usize = MAX_USER_POINTS;

/// Samples per acquisition frame
pub const FRAME_POINTS: usize = 8192;

/// Slots in the acquisition ring (one is always being filled)
pub const RING_SLOTS: usize = 4;

/// Samples delivered per DMA half-transfer
pub const DMA_BLOCK_POINTS: usize = 2048;

/// Sample rate reported until the host sets one
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 100_000;

/// Oscilloscope channel stamped into data frames
pub const DEFAULT_SCOPE_CHANNEL: u8 = 0;

/// Receive buffer for generator commands
///
/// Holds a full 1024-point upload frame plus a partial follow-up.
pub const GENERATOR_RX_BUFFER: usize = 4096;

/// Receive buffer for oscilloscope commands
pub const SCOPE_RX_BUFFER: usize = 256;

/// Generator settings applied at power-on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GeneratorDefaults {
    pub kind: WaveKind,
    pub frequency_mhz: u32,
    pub amplitude_mv_pp: u16,
    pub offset_mv: i16,
    pub duty_per_mille: u16,
}

impl GeneratorDefaults {
    /// 1 kHz sine, 1 Vpp, no offset, 50% duty
    pub const fn new() -> Self {
        Self {
            kind: WaveKind::Sine,
            frequency_mhz: 1_000_000,
            amplitude_mv_pp: 1000,
            offset_mv: 0,
            duty_per_mille: 500,
        }
    }
}

impl Default for GeneratorDefaults {
    fn default() -> Self {
        Self::new()
    }
}
