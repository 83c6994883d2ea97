//! Command types for the oscgen protocol
//!
//! Commands are divided into two categories:
//! - Host → Generator: waveform parameters, user table upload, status query
//! - Host → Oscilloscope: stream control, sample rate, trigger
//!
//! Payload fields are little-endian. Payloads longer than a command needs are
//! accepted (trailing bytes ignored); shorter ones are rejected as
//! `CommandError::Truncated`.

use core::fmt;

use crate::frame::{Frame, FrameError};

// Command IDs: Host → Generator
pub const CMD_SET_WAVE: u8 = 0x10;
pub const CMD_SET_FREQUENCY: u8 = 0x11;
pub const CMD_SET_AMPLITUDE: u8 = 0x12;
pub const CMD_SET_OFFSET: u8 = 0x13;
pub const CMD_SET_DUTY: u8 = 0x14;
pub const CMD_UPLOAD_TABLE: u8 = 0x15;
/// Status query (host → generator) and status reply (generator → host)
pub const CMD_GEN_STATUS: u8 = 0x1F;

// Command IDs: Host → Oscilloscope
pub const CMD_SET_SAMPLE_RATE: u8 = 0x20;
pub const CMD_SET_TRIGGER: u8 = 0x22;
pub const CMD_STREAM: u8 = 0x24;

// Command IDs: Oscilloscope → Host
pub const CMD_SCOPE_DATA: u8 = 0x40;

/// Largest user-defined table the generator accepts
pub const MAX_USER_POINTS: usize = 1024;

/// Valid duty cycle range in per-mille
pub const DUTY_RANGE: core::ops::RangeInclusive<u16> = 1..=999;

/// Reasons a command payload is refused
///
/// Refused commands leave device state untouched and are never answered on
/// the wire; the variants exist for local diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Payload shorter than the command requires
    Truncated,
    /// Command ID not handled by this device
    UnknownCommand(u8),
    /// Wave kind code outside the known set
    UnknownWaveKind(u8),
    /// Duty cycle outside 1..=999 per-mille
    DutyOutOfRange(u16),
    /// User table point count of 0 or above `MAX_USER_POINTS`
    TableLength(u16),
    /// User wave selected before any table was uploaded
    NoUserTable,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Truncated => f.write_str("payload too short"),
            CommandError::UnknownCommand(c) => write!(f, "unknown command 0x{c:02X}"),
            CommandError::UnknownWaveKind(k) => write!(f, "unknown wave kind {k}"),
            CommandError::DutyOutOfRange(d) => write!(f, "duty {d} outside 1..=999"),
            CommandError::TableLength(n) => write!(f, "table length {n} outside 1..=1024"),
            CommandError::NoUserTable => f.write_str("no user table uploaded"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CommandError {}

/// Waveform shapes the generator can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaveKind {
    Sine,
    /// |sin|
    FullRectified,
    /// max(0, sin)
    HalfRectified,
    Sawtooth,
    Triangle,
    /// Square wave with adjustable duty
    Square,
    /// Table uploaded verbatim by the host
    User,
}

// Wire format values
const WAVE_SINE: u8 = 0;
const WAVE_FULL_RECTIFIED: u8 = 1;
const WAVE_HALF_RECTIFIED: u8 = 2;
const WAVE_SAWTOOTH: u8 = 3;
const WAVE_TRIANGLE: u8 = 4;
const WAVE_SQUARE: u8 = 5;
const WAVE_USER: u8 = 6;

impl WaveKind {
    /// Parse a kind from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            WAVE_SINE => Some(WaveKind::Sine),
            WAVE_FULL_RECTIFIED => Some(WaveKind::FullRectified),
            WAVE_HALF_RECTIFIED => Some(WaveKind::HalfRectified),
            WAVE_SAWTOOTH => Some(WaveKind::Sawtooth),
            WAVE_TRIANGLE => Some(WaveKind::Triangle),
            WAVE_SQUARE => Some(WaveKind::Square),
            WAVE_USER => Some(WaveKind::User),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            WaveKind::Sine => WAVE_SINE,
            WaveKind::FullRectified => WAVE_FULL_RECTIFIED,
            WaveKind::HalfRectified => WAVE_HALF_RECTIFIED,
            WaveKind::Sawtooth => WAVE_SAWTOOTH,
            WaveKind::Triangle => WAVE_TRIANGLE,
            WaveKind::Square => WAVE_SQUARE,
            WaveKind::User => WAVE_USER,
        }
    }

    /// Returns true if the table for this kind is computed on the device
    pub fn is_synthesized(&self) -> bool {
        !matches!(self, WaveKind::User)
    }
}

/// User table payload: `count:2` followed by `count` 16-bit codes
///
/// Borrows the raw code bytes from the frame; codes are decoded lazily.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserTable<'a> {
    codes: &'a [u8],
}

impl<'a> UserTable<'a> {
    /// Validate an upload payload
    pub fn parse(payload: &'a [u8]) -> Result<Self, CommandError> {
        if payload.len() < 2 {
            return Err(CommandError::Truncated);
        }
        let count = u16::from_le_bytes([payload[0], payload[1]]);
        if count == 0 || count as usize > MAX_USER_POINTS {
            return Err(CommandError::TableLength(count));
        }
        let end = 2 + count as usize * 2;
        if payload.len() < end {
            return Err(CommandError::Truncated);
        }

        Ok(Self {
            codes: &payload[2..end],
        })
    }

    /// Number of points in the table
    pub fn len(&self) -> usize {
        self.codes.len() / 2
    }

    /// Always false for a parsed table
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Iterate over the raw output codes
    pub fn codes(&self) -> impl Iterator<Item = u16> + 'a {
        self.codes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
    }

    /// Raw little-endian code bytes
    pub fn as_bytes(&self) -> &'a [u8] {
        self.codes
    }
}

/// Size of an upload payload carrying `points` codes
pub const fn user_table_payload_len(points: usize) -> usize {
    2 + points * 2
}

/// Serialize a user table upload payload
///
/// Returns the number of bytes written.
pub fn encode_user_table(codes: &[u16], out: &mut [u8]) -> Result<usize, CommandError> {
    if codes.is_empty() || codes.len() > MAX_USER_POINTS {
        return Err(CommandError::TableLength(codes.len().min(u16::MAX as usize) as u16));
    }
    let len = user_table_payload_len(codes.len());
    if out.len() < len {
        return Err(CommandError::Truncated);
    }

    out[..2].copy_from_slice(&(codes.len() as u16).to_le_bytes());
    for (dst, code) in out[2..len].chunks_exact_mut(2).zip(codes) {
        dst.copy_from_slice(&code.to_le_bytes());
    }
    Ok(len)
}

/// Commands consumed by the waveform generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorCommand<'a> {
    /// Select the waveform shape
    SetWaveKind(WaveKind),
    /// Output frequency in milli-hertz
    SetFrequency(u32),
    /// Peak-to-peak amplitude in millivolts
    SetAmplitude(u16),
    /// DC offset in millivolts
    SetOffset(i16),
    /// Square wave duty cycle in per-mille
    SetDuty(u16),
    /// Replace the user-defined table
    UploadTable(UserTable<'a>),
    /// Ask for a status reply
    GetStatus,
}

impl<'a> GeneratorCommand<'a> {
    /// Parse a command from a frame
    pub fn from_frame(frame: &Frame<'a>) -> Result<Self, CommandError> {
        let p = frame.payload;
        match frame.command {
            CMD_SET_WAVE => {
                let byte = *p.first().ok_or(CommandError::Truncated)?;
                let kind = WaveKind::from_byte(byte).ok_or(CommandError::UnknownWaveKind(byte))?;
                Ok(GeneratorCommand::SetWaveKind(kind))
            }
            CMD_SET_FREQUENCY => Ok(GeneratorCommand::SetFrequency(u32::from_le_bytes(
                read_array(p)?,
            ))),
            CMD_SET_AMPLITUDE => Ok(GeneratorCommand::SetAmplitude(u16::from_le_bytes(
                read_array(p)?,
            ))),
            CMD_SET_OFFSET => Ok(GeneratorCommand::SetOffset(i16::from_le_bytes(read_array(
                p,
            )?))),
            CMD_SET_DUTY => {
                let duty = u16::from_le_bytes(read_array(p)?);
                if !DUTY_RANGE.contains(&duty) {
                    return Err(CommandError::DutyOutOfRange(duty));
                }
                Ok(GeneratorCommand::SetDuty(duty))
            }
            CMD_UPLOAD_TABLE => Ok(GeneratorCommand::UploadTable(UserTable::parse(p)?)),
            CMD_GEN_STATUS => Ok(GeneratorCommand::GetStatus),
            other => Err(CommandError::UnknownCommand(other)),
        }
    }

    /// Command ID for this command
    pub fn command(&self) -> u8 {
        match self {
            GeneratorCommand::SetWaveKind(_) => CMD_SET_WAVE,
            GeneratorCommand::SetFrequency(_) => CMD_SET_FREQUENCY,
            GeneratorCommand::SetAmplitude(_) => CMD_SET_AMPLITUDE,
            GeneratorCommand::SetOffset(_) => CMD_SET_OFFSET,
            GeneratorCommand::SetDuty(_) => CMD_SET_DUTY,
            GeneratorCommand::UploadTable(_) => CMD_UPLOAD_TABLE,
            GeneratorCommand::GetStatus => CMD_GEN_STATUS,
        }
    }

    /// Payload size in bytes
    pub fn payload_len(&self) -> usize {
        match self {
            GeneratorCommand::SetWaveKind(_) => 1,
            GeneratorCommand::SetFrequency(_) => 4,
            GeneratorCommand::SetAmplitude(_)
            | GeneratorCommand::SetOffset(_)
            | GeneratorCommand::SetDuty(_) => 2,
            GeneratorCommand::UploadTable(table) => user_table_payload_len(table.len()),
            GeneratorCommand::GetStatus => 0,
        }
    }

    /// Serialize the payload into `out`
    ///
    /// Returns the number of bytes written
    pub fn write_payload(&self, out: &mut [u8]) -> Result<usize, FrameError> {
        let len = self.payload_len();
        if out.len() < len {
            return Err(FrameError::BufferTooSmall);
        }
        match self {
            GeneratorCommand::SetWaveKind(kind) => out[0] = kind.to_byte(),
            GeneratorCommand::SetFrequency(mhz) => out[..4].copy_from_slice(&mhz.to_le_bytes()),
            GeneratorCommand::SetAmplitude(mv) => out[..2].copy_from_slice(&mv.to_le_bytes()),
            GeneratorCommand::SetOffset(mv) => out[..2].copy_from_slice(&mv.to_le_bytes()),
            GeneratorCommand::SetDuty(duty) => out[..2].copy_from_slice(&duty.to_le_bytes()),
            GeneratorCommand::UploadTable(table) => {
                out[..2].copy_from_slice(&(table.len() as u16).to_le_bytes());
                out[2..len].copy_from_slice(table.as_bytes());
            }
            GeneratorCommand::GetStatus => {}
        }
        Ok(len)
    }
}

/// Commands consumed by the oscilloscope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeCommand<'a> {
    /// Start (true) or stop (false) streaming data frames
    Stream(bool),
    /// Requested sample rate in hertz
    SetSampleRate(u32),
    /// Trigger configuration, interpreted by the acquisition hardware
    SetTrigger(&'a [u8]),
}

impl<'a> ScopeCommand<'a> {
    /// Parse a command from a frame
    pub fn from_frame(frame: &Frame<'a>) -> Result<Self, CommandError> {
        let p = frame.payload;
        match frame.command {
            CMD_STREAM => {
                let byte = *p.first().ok_or(CommandError::Truncated)?;
                Ok(ScopeCommand::Stream(byte != 0))
            }
            CMD_SET_SAMPLE_RATE => Ok(ScopeCommand::SetSampleRate(u32::from_le_bytes(
                read_array(p)?,
            ))),
            CMD_SET_TRIGGER => Ok(ScopeCommand::SetTrigger(p)),
            other => Err(CommandError::UnknownCommand(other)),
        }
    }

    /// Command ID for this command
    pub fn command(&self) -> u8 {
        match self {
            ScopeCommand::Stream(_) => CMD_STREAM,
            ScopeCommand::SetSampleRate(_) => CMD_SET_SAMPLE_RATE,
            ScopeCommand::SetTrigger(_) => CMD_SET_TRIGGER,
        }
    }

    /// Payload size in bytes
    pub fn payload_len(&self) -> usize {
        match self {
            ScopeCommand::Stream(_) => 1,
            ScopeCommand::SetSampleRate(_) => 4,
            ScopeCommand::SetTrigger(raw) => raw.len(),
        }
    }

    /// Serialize the payload into `out`
    ///
    /// Returns the number of bytes written
    pub fn write_payload(&self, out: &mut [u8]) -> Result<usize, FrameError> {
        let len = self.payload_len();
        if out.len() < len {
            return Err(FrameError::BufferTooSmall);
        }
        match self {
            ScopeCommand::Stream(on) => out[0] = *on as u8,
            ScopeCommand::SetSampleRate(hz) => out[..4].copy_from_slice(&hz.to_le_bytes()),
            ScopeCommand::SetTrigger(raw) => out[..len].copy_from_slice(raw),
        }
        Ok(len)
    }
}

/// Generator status reply payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GeneratorStatus {
    pub kind: WaveKind,
    pub frequency_mhz: u32,
    pub amplitude_mv_pp: u16,
    pub offset_mv: i16,
    pub duty_per_mille: u16,
    /// Points in the active table
    pub table_len: u16,
}

impl GeneratorStatus {
    /// Encoded payload size
    pub const SIZE: usize = 13;

    /// Serialize to the reply payload
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0] = self.kind.to_byte();
        out[1..5].copy_from_slice(&self.frequency_mhz.to_le_bytes());
        out[5..7].copy_from_slice(&self.amplitude_mv_pp.to_le_bytes());
        out[7..9].copy_from_slice(&self.offset_mv.to_le_bytes());
        out[9..11].copy_from_slice(&self.duty_per_mille.to_le_bytes());
        out[11..13].copy_from_slice(&self.table_len.to_le_bytes());
        out
    }

    /// Parse a reply payload
    pub fn parse(payload: &[u8]) -> Result<Self, CommandError> {
        if payload.len() < Self::SIZE {
            return Err(CommandError::Truncated);
        }
        let kind =
            WaveKind::from_byte(payload[0]).ok_or(CommandError::UnknownWaveKind(payload[0]))?;

        Ok(Self {
            kind,
            frequency_mhz: u32::from_le_bytes(read_array(&payload[1..])?),
            amplitude_mv_pp: u16::from_le_bytes(read_array(&payload[5..])?),
            offset_mv: i16::from_le_bytes(read_array(&payload[7..])?),
            duty_per_mille: u16::from_le_bytes(read_array(&payload[9..])?),
            table_len: u16::from_le_bytes(read_array(&payload[11..])?),
        })
    }
}

/// Copy the first `N` payload bytes into an array
fn read_array<const N: usize>(payload: &[u8]) -> Result<[u8; N], CommandError> {
    payload
        .get(..N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(CommandError::Truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(command: u8, payload: &[u8]) -> Frame<'_> {
        Frame::new(command, 1, payload).unwrap()
    }

    #[test]
    fn test_wave_kind_roundtrip() {
        for byte in 0..=6u8 {
            let kind = WaveKind::from_byte(byte).unwrap();
            assert_eq!(kind.to_byte(), byte);
        }
        assert!(WaveKind::from_byte(7).is_none());
        assert!(!WaveKind::User.is_synthesized());
        assert!(WaveKind::Square.is_synthesized());
    }

    #[test]
    fn test_parse_set_wave() {
        let cmd = GeneratorCommand::from_frame(&frame(CMD_SET_WAVE, &[5])).unwrap();
        assert_eq!(cmd, GeneratorCommand::SetWaveKind(WaveKind::Square));
    }

    #[test]
    fn test_parse_unknown_wave_kind() {
        let result = GeneratorCommand::from_frame(&frame(CMD_SET_WAVE, &[0x42]));
        assert_eq!(result, Err(CommandError::UnknownWaveKind(0x42)));
    }

    #[test]
    fn test_parse_set_frequency() {
        let payload = 1_000_000u32.to_le_bytes();
        let cmd = GeneratorCommand::from_frame(&frame(CMD_SET_FREQUENCY, &payload)).unwrap();
        assert_eq!(cmd, GeneratorCommand::SetFrequency(1_000_000));
    }

    #[test]
    fn test_parse_truncated_commands() {
        let cases: [(u8, &[u8]); 5] = [
            (CMD_SET_WAVE, &[]),
            (CMD_SET_FREQUENCY, &[1, 2, 3]),
            (CMD_SET_AMPLITUDE, &[1]),
            (CMD_SET_OFFSET, &[]),
            (CMD_SET_DUTY, &[0xF4]),
        ];
        for (command, payload) in cases {
            let result = GeneratorCommand::from_frame(&frame(command, payload));
            assert_eq!(result, Err(CommandError::Truncated));
        }
    }

    #[test]
    fn test_parse_negative_offset() {
        let payload = (-250i16).to_le_bytes();
        let cmd = GeneratorCommand::from_frame(&frame(CMD_SET_OFFSET, &payload)).unwrap();
        assert_eq!(cmd, GeneratorCommand::SetOffset(-250));
    }

    #[test]
    fn test_parse_duty_range() {
        let ok_bytes = 999u16.to_le_bytes();
        let ok = GeneratorCommand::from_frame(&frame(CMD_SET_DUTY, &ok_bytes));
        assert_eq!(ok, Ok(GeneratorCommand::SetDuty(999)));

        let zero_bytes = 0u16.to_le_bytes();
        let zero = GeneratorCommand::from_frame(&frame(CMD_SET_DUTY, &zero_bytes));
        assert_eq!(zero, Err(CommandError::DutyOutOfRange(0)));

        let full_bytes = 1000u16.to_le_bytes();
        let full = GeneratorCommand::from_frame(&frame(CMD_SET_DUTY, &full_bytes));
        assert_eq!(full, Err(CommandError::DutyOutOfRange(1000)));
    }

    #[test]
    fn test_parse_user_table() {
        let payload = [3, 0, 10, 0, 20, 0, 30, 0];
        let cmd = GeneratorCommand::from_frame(&frame(CMD_UPLOAD_TABLE, &payload)).unwrap();
        let GeneratorCommand::UploadTable(table) = cmd else {
            panic!("expected upload, got {:?}", cmd);
        };
        assert_eq!(table.len(), 3);
        let mut codes = table.codes();
        assert_eq!(codes.next(), Some(10));
        assert_eq!(codes.next(), Some(20));
        assert_eq!(codes.next(), Some(30));
        assert_eq!(codes.next(), None);
    }

    #[test]
    fn test_user_table_rejects_bad_lengths() {
        assert_eq!(UserTable::parse(&[0, 0]), Err(CommandError::TableLength(0)));
        assert_eq!(
            UserTable::parse(&1025u16.to_le_bytes()),
            Err(CommandError::TableLength(1025))
        );
        // count says 3, only two codes follow
        assert_eq!(
            UserTable::parse(&[3, 0, 1, 0, 2, 0]),
            Err(CommandError::Truncated)
        );
        assert_eq!(UserTable::parse(&[1]), Err(CommandError::Truncated));
    }

    #[test]
    fn test_encode_user_table() {
        let mut out = [0u8; 16];
        let len = encode_user_table(&[10, 20, 0x1234], &mut out).unwrap();
        assert_eq!(len, 8);
        assert_eq!(&out[..8], &[3, 0, 10, 0, 20, 0, 0x34, 0x12]);

        let table = UserTable::parse(&out[..len]).unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_encode_user_table_rejects_empty() {
        let mut out = [0u8; 4];
        assert_eq!(encode_user_table(&[], &mut out), Err(CommandError::TableLength(0)));
    }

    #[test]
    fn test_generator_command_payload_roundtrip() {
        let commands = [
            GeneratorCommand::SetWaveKind(WaveKind::Triangle),
            GeneratorCommand::SetFrequency(123_456),
            GeneratorCommand::SetAmplitude(2000),
            GeneratorCommand::SetOffset(-1500),
            GeneratorCommand::SetDuty(250),
            GeneratorCommand::GetStatus,
        ];
        for original in commands {
            let mut buf = [0u8; 8];
            let len = original.write_payload(&mut buf).unwrap();
            let parsed = GeneratorCommand::from_frame(&frame(original.command(), &buf[..len]));
            assert_eq!(parsed, Ok(original));
        }
    }

    #[test]
    fn test_scope_commands() {
        assert_eq!(
            ScopeCommand::from_frame(&frame(CMD_STREAM, &[1])),
            Ok(ScopeCommand::Stream(true))
        );
        assert_eq!(
            ScopeCommand::from_frame(&frame(CMD_STREAM, &[0])),
            Ok(ScopeCommand::Stream(false))
        );
        assert_eq!(
            ScopeCommand::from_frame(&frame(CMD_STREAM, &[])),
            Err(CommandError::Truncated)
        );
        assert_eq!(
            ScopeCommand::from_frame(&frame(CMD_SET_SAMPLE_RATE, &250_000u32.to_le_bytes())),
            Ok(ScopeCommand::SetSampleRate(250_000))
        );
        assert_eq!(
            ScopeCommand::from_frame(&frame(CMD_SET_TRIGGER, &[1, 2, 3])),
            Ok(ScopeCommand::SetTrigger(&[1, 2, 3]))
        );
        assert_eq!(
            ScopeCommand::from_frame(&frame(CMD_SET_WAVE, &[0])),
            Err(CommandError::UnknownCommand(CMD_SET_WAVE))
        );
    }

    #[test]
    fn test_status_roundtrip() {
        let status = GeneratorStatus {
            kind: WaveKind::User,
            frequency_mhz: 50_000,
            amplitude_mv_pp: 3000,
            offset_mv: -100,
            duty_per_mille: 500,
            table_len: 3,
        };
        let bytes = status.to_bytes();
        assert_eq!(GeneratorStatus::parse(&bytes), Ok(status));
        assert_eq!(
            GeneratorStatus::parse(&bytes[..12]),
            Err(CommandError::Truncated)
        );
    }
}
