//! Function generator engine
//!
//! [`CommandProcessor`] applies decoded commands to the [`GeneratorState`]
//! and drives the output hardware. [`GeneratorDevice`] wraps it with the
//! receive reassembler and the reply path.

mod device;
mod processor;

pub use device::GeneratorDevice;
pub use processor::CommandProcessor;

use oscgen_protocol::{GeneratorStatus, WaveKind};

use crate::config::GeneratorDefaults;
use crate::waveform::{WaveParams, WaveformTable};

/// Everything the generator is currently producing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorState {
    pub kind: WaveKind,
    /// Waveform frequency in millihertz
    pub frequency_mhz: u32,
    pub amplitude_mv_pp: u16,
    pub offset_mv: i16,
    pub duty_per_mille: u16,
    /// Table being played out
    pub table: WaveformTable,
    /// Last uploaded user table, kept while a built-in kind is active
    pub user_table: WaveformTable,
}

impl GeneratorState {
    /// State before anything is synthesized
    pub fn new(defaults: &GeneratorDefaults) -> Self {
        Self {
            kind: defaults.kind,
            frequency_mhz: defaults.frequency_mhz,
            amplitude_mv_pp: defaults.amplitude_mv_pp,
            offset_mv: defaults.offset_mv,
            duty_per_mille: defaults.duty_per_mille,
            table: WaveformTable::new(),
            user_table: WaveformTable::new(),
        }
    }

    /// Synthesis inputs
    pub fn params(&self) -> WaveParams {
        WaveParams {
            kind: self.kind,
            amplitude_mv_pp: self.amplitude_mv_pp,
            offset_mv: self.offset_mv,
            duty_per_mille: self.duty_per_mille,
        }
    }

    /// Snapshot for a status reply
    pub fn status(&self) -> GeneratorStatus {
        GeneratorStatus {
            kind: self.kind,
            frequency_mhz: self.frequency_mhz,
            amplitude_mv_pp: self.amplitude_mv_pp,
            offset_mv: self.offset_mv,
            duty_per_mille: self.duty_per_mille,
            table_len: self.table.points(),
        }
    }
}

impl Default for GeneratorState {
    fn default() -> Self {
        Self::new(&GeneratorDefaults::new())
    }
}
