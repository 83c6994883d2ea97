//! Hardware abstraction traits
//!
//! These traits define the interface between the generator and
//! oscilloscope engines and the board's timer, DAC and ADC drivers.

pub mod acquisition;
pub mod output;

pub use acquisition::AcquisitionClock;
pub use output::{update_rate_mhz, OutputDriver};
