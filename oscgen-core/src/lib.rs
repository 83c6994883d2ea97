//! Board-agnostic core logic for the oscgen firmware
//!
//! This crate contains everything the generator and oscilloscope boards do
//! that does not touch a peripheral register:
//!
//! - Output and acquisition hardware traits
//! - Waveform table synthesis
//! - The generator command processor and its device loop
//! - Acquisition frame assembly and the overwrite-oldest frame ring
//! - The oscilloscope device loop that streams frames to the host
//!
//! Board crates implement [`traits::OutputDriver`] and
//! [`traits::AcquisitionClock`] and feed received bytes and DMA blocks in.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod generator;
pub mod scope;
pub mod traits;
pub mod waveform;

pub use generator::{CommandProcessor, GeneratorDevice, GeneratorState};
pub use scope::{
    AcquisitionControl, AcquisitionFrame, DmaHalf, FrameAssembler, FrameRing, RingConsumer,
    RingEmpty, RingProducer, ScopeDevice,
};
pub use waveform::{synthesize, WaveParams, WaveformTable};
