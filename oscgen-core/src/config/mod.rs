//! Configuration constants
//!
//! Sizes and power-on defaults shared by the generator and oscilloscope
//! engines. Boards override the buffer geometry through const generics.

pub mod types;

pub use types::*;
