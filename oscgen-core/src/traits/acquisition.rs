//! Acquisition timing trait

/// Trait for the ADC sample clock and trigger hardware
pub trait AcquisitionClock {
    /// Reprogram the sample timer
    ///
    /// Returns the rate actually achieved, which is what data frames report.
    fn set_sample_rate(&mut self, hz: u32) -> u32;

    /// Apply a trigger configuration received from the host
    ///
    /// The bytes are board-defined. Returns the number of samples each frame
    /// holds before the trigger point.
    fn configure_trigger(&mut self, config: &[u8]) -> u16;
}
