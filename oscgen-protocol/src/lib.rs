//! oscgen Link Protocol
//!
//! This crate defines the framed binary protocol spoken between the host and
//! the waveform generator / oscilloscope boards over USB-CDC or UART. The
//! same code runs on both ends: the devices decode commands and encode data
//! frames, the host does the reverse.
//!
//! # Protocol Overview
//!
//! All messages use a single frame format (multi-byte fields little-endian):
//! ```text
//! ┌─────────┬─────┬──────┬─────┬────────┬─────────────┬───────┐
//! │ SYNC    │ VER │ SEQ  │ CMD │ LENGTH │ PAYLOAD     │ CRC16 │
//! │ 55 AA   │ 1B  │ 2B   │ 1B  │ 2B     │ 0–65535B    │ 2B    │
//! └─────────┴─────┴──────┴─────┴────────┴─────────────┴───────┘
//! ```
//!
//! The CRC is CRC16/IBM (reflected 0xA001, init 0xFFFF) over everything from
//! VER to the end of PAYLOAD. Frames that fail the check are dropped without
//! a reply; the receiver resynchronizes on the next sync marker.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod commands;
pub mod crc;
pub mod frame;
pub mod reassembler;
pub mod scope;

pub use commands::{
    CommandError, GeneratorCommand, GeneratorStatus, ScopeCommand, UserTable, WaveKind,
};
pub use crc::{crc16_ibm, Crc16};
pub use frame::{
    decode, frame_size, Frame, FrameEncoder, FrameError, Header, FRAME_SYNC, HEADER_SIZE,
    MAX_PAYLOAD_SIZE, PROTOCOL_VERSION,
};
pub use reassembler::{ReassemblerStats, StreamReassembler};
pub use scope::{ScopeData, ScopeDataHeader, SCOPE_HEADER_SIZE};
