//! Table synthesis for the built-in wave kinds

use core::f32::consts::PI;

use oscgen_protocol::WaveKind;

use super::WaveformTable;
use crate::config::{DAC_MAX_CODE, SYNTH_TABLE_POINTS, VREF_MV};

/// Parameters that shape a synthesized table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WaveParams {
    pub kind: WaveKind,
    pub amplitude_mv_pp: u16,
    pub offset_mv: i16,
    /// High fraction of a square period in 1/1000
    pub duty_per_mille: u16,
}

/// Map an output voltage to a DAC code
///
/// Voltages outside the reference range saturate.
pub fn millivolts_to_code(mv: f32) -> u16 {
    let mv = mv.clamp(0.0, VREF_MV as f32);
    libm::roundf(mv * DAC_MAX_CODE as f32 / VREF_MV as f32) as u16
}

/// Unclamped output voltage at point `index` of a `points`-long period
///
/// Returns `None` for [`WaveKind::User`], which has no formula.
pub fn sample_millivolts(params: &WaveParams, index: usize, points: usize) -> Option<f32> {
    let a = params.amplitude_mv_pp as f32 / 2.0;
    let offset = params.offset_mv as f32;
    let phase = index as f32 / points as f32;
    let sin = libm::sinf(2.0 * PI * phase);

    let v = match params.kind {
        WaveKind::Sine => offset + a * sin,
        WaveKind::FullRectified => offset + a * libm::fabsf(sin),
        WaveKind::HalfRectified => {
            let lobe = a * sin;
            offset + if lobe > 0.0 { lobe } else { 0.0 }
        }
        WaveKind::Sawtooth => offset + a * (2.0 * phase - 1.0),
        WaveKind::Triangle => {
            let ramp = if phase < 0.5 { 2.0 * phase } else { 2.0 - 2.0 * phase };
            offset + a * (2.0 * ramp - 1.0)
        }
        WaveKind::Square => {
            // index/points < duty/1000, kept in integers so 500 splits 256 exactly
            let high = index as u64 * 1000 < params.duty_per_mille as u64 * points as u64;
            if high {
                offset + a
            } else {
                offset - a
            }
        }
        WaveKind::User => return None,
    };
    Some(v)
}

/// Recompute `table` for `params`
///
/// Returns false and leaves the table alone for [`WaveKind::User`].
pub fn synthesize(params: &WaveParams, table: &mut WaveformTable) -> bool {
    if !params.kind.is_synthesized() {
        return false;
    }

    let samples = table.reset(params.kind, SYNTH_TABLE_POINTS);
    for (i, code) in samples.iter_mut().enumerate() {
        *code = sample_millivolts(params, i, SYNTH_TABLE_POINTS)
            .map(millivolts_to_code)
            .unwrap_or(0);
    }
    true
}
