//! Waveform tables
//!
//! A table is one period of output codes. Synthesized kinds are recomputed
//! from the generator parameters on every change; user tables are uploaded
//! by the host and played back verbatim.

mod synth;
mod table;

pub use synth::{millivolts_to_code, sample_millivolts, synthesize, WaveParams};
pub use table::WaveformTable;
