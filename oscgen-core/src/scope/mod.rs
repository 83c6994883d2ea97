//! Oscilloscope acquisition pipeline
//!
//! ```text
//! ADC DMA ──► FrameAssembler ──► FrameRing ──► ScopeDevice ──► transport
//!   (interrupt context)            │              (main loop)
//!                                  └── overwrite-oldest, lock-free
//! ```
//!
//! The assembler owns the ring's producer half, the device owns the
//! consumer half. Streaming settings travel from the device to the
//! assembler through [`AcquisitionControl`].

mod assembler;
mod control;
mod device;
mod frame;
mod ring;

pub use assembler::{DmaHalf, FrameAssembler};
pub use control::AcquisitionControl;
pub use device::ScopeDevice;
pub use frame::AcquisitionFrame;
pub use ring::{FrameRing, RingConsumer, RingEmpty, RingProducer};
