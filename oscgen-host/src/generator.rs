//! Generator board client

use std::io::{Read, Write};

use clap::ValueEnum;
use oscgen_core::config::GeneratorDefaults;
use oscgen_protocol::commands::{
    encode_user_table, user_table_payload_len, CMD_GEN_STATUS, CMD_SET_AMPLITUDE, CMD_SET_DUTY,
    CMD_SET_FREQUENCY, CMD_SET_OFFSET, CMD_SET_WAVE, CMD_UPLOAD_TABLE, DUTY_RANGE,
};
use oscgen_protocol::{GeneratorStatus, StreamReassembler, WaveKind};
use serde::Deserialize;
use tracing::info;

use crate::error::{HostError, Result};
use crate::link::CommandLink;

/// Idle reads before a status query gives up
const STATUS_ATTEMPTS: usize = 10;

/// Wave shape as named in config files and on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Shape {
    #[default]
    Sine,
    FullRectified,
    HalfRectified,
    Sawtooth,
    Triangle,
    Square,
    /// Last uploaded table
    User,
}

impl From<Shape> for WaveKind {
    fn from(shape: Shape) -> Self {
        match shape {
            Shape::Sine => WaveKind::Sine,
            Shape::FullRectified => WaveKind::FullRectified,
            Shape::HalfRectified => WaveKind::HalfRectified,
            Shape::Sawtooth => WaveKind::Sawtooth,
            Shape::Triangle => WaveKind::Triangle,
            Shape::Square => WaveKind::Square,
            Shape::User => WaveKind::User,
        }
    }
}

/// A full generator setup
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorSettings {
    pub shape: Shape,
    pub frequency_hz: f64,
    pub amplitude_mv_pp: u16,
    pub offset_mv: i16,
    pub duty_per_mille: u16,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        let defaults = GeneratorDefaults::new();
        Self {
            shape: Shape::Sine,
            frequency_hz: defaults.frequency_mhz as f64 / 1000.0,
            amplitude_mv_pp: defaults.amplitude_mv_pp,
            offset_mv: defaults.offset_mv,
            duty_per_mille: defaults.duty_per_mille,
        }
    }
}

/// Convert a frequency in hertz to the wire's millihertz
pub fn hz_to_millihertz(hz: f64) -> Result<u32> {
    let mhz = (hz * 1000.0).round();
    if !mhz.is_finite() || mhz < 0.0 || mhz > u32::MAX as f64 {
        return Err(HostError::InvalidSetting(format!(
            "frequency {hz} Hz is outside 0..={} Hz",
            u32::MAX as f64 / 1000.0
        )));
    }
    Ok(mhz as u32)
}

/// Drives the generator board
pub struct GeneratorClient<T> {
    link: CommandLink<T>,
    rx: StreamReassembler<64>,
}

impl<T> GeneratorClient<T> {
    pub fn new(port: T) -> Self {
        Self {
            link: CommandLink::new(port),
            rx: StreamReassembler::new(),
        }
    }

    pub fn link(&mut self) -> &mut CommandLink<T> {
        &mut self.link
    }
}

impl<T: Write> GeneratorClient<T> {
    pub fn set_wave(&mut self, shape: Shape) -> Result<u16> {
        self.link
            .send(CMD_SET_WAVE, &[WaveKind::from(shape).to_byte()])
    }

    pub fn set_frequency_mhz(&mut self, frequency_mhz: u32) -> Result<u16> {
        self.link
            .send(CMD_SET_FREQUENCY, &frequency_mhz.to_le_bytes())
    }

    pub fn set_frequency(&mut self, hz: f64) -> Result<u16> {
        self.set_frequency_mhz(hz_to_millihertz(hz)?)
    }

    pub fn set_amplitude(&mut self, mv_pp: u16) -> Result<u16> {
        self.link.send(CMD_SET_AMPLITUDE, &mv_pp.to_le_bytes())
    }

    pub fn set_offset(&mut self, mv: i16) -> Result<u16> {
        self.link.send(CMD_SET_OFFSET, &mv.to_le_bytes())
    }

    /// Square wave duty cycle; the board ignores values outside 1..=999
    pub fn set_duty(&mut self, per_mille: u16) -> Result<u16> {
        if !DUTY_RANGE.contains(&per_mille) {
            return Err(HostError::InvalidSetting(format!(
                "duty {per_mille} is outside {}..={} per mille",
                DUTY_RANGE.start(),
                DUTY_RANGE.end()
            )));
        }
        self.link.send(CMD_SET_DUTY, &per_mille.to_le_bytes())
    }

    /// Upload raw DAC codes; the board switches to the user kind
    pub fn upload_table(&mut self, codes: &[u16]) -> Result<u16> {
        let mut payload = vec![0u8; user_table_payload_len(codes.len())];
        encode_user_table(codes, &mut payload)?;
        self.link.send(CMD_UPLOAD_TABLE, &payload)
    }

    /// Send every setting, shape first
    pub fn apply(&mut self, settings: &GeneratorSettings) -> Result<()> {
        info!(?settings, "applying generator settings");
        self.set_wave(settings.shape)?;
        self.set_frequency(settings.frequency_hz)?;
        self.set_amplitude(settings.amplitude_mv_pp)?;
        self.set_offset(settings.offset_mv)?;
        self.set_duty(settings.duty_per_mille)?;
        Ok(())
    }
}

impl<T: Read + Write> GeneratorClient<T> {
    /// Ask the board what it is producing
    pub fn query_status(&mut self) -> Result<GeneratorStatus> {
        self.link.send(CMD_GEN_STATUS, &[])?;
        let payload = self
            .link
            .wait_for(&mut self.rx, CMD_GEN_STATUS, STATUS_ATTEMPTS)?;
        Ok(GeneratorStatus::parse(&payload)?)
    }
}

/// Parse DAC codes from text: numbers separated by whitespace or commas
pub fn parse_codes(text: &str) -> Result<Vec<u16>> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<u16>()
                .map_err(|e| HostError::InvalidSetting(format!("bad code {t:?}: {e}")))
        })
        .collect()
}
