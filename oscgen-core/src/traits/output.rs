//! Waveform output trait

/// Trait for the DAC output engine
///
/// Implementations stream the loaded table to the DAC in a circular DMA
/// transfer paced by a timer. Both calls come from the command processor
/// and may restart the transfer.
pub trait OutputDriver {
    /// Replace the table being played out
    ///
    /// `samples` holds 12-bit DAC codes, one per timer tick.
    fn load_table(&mut self, samples: &[u16]);

    /// Pace the output so `points` samples make one period
    ///
    /// `frequency_mhz` is the waveform frequency in millihertz.
    fn set_timer(&mut self, frequency_mhz: u32, points: u16);
}

/// Sample update rate in millihertz for a table of `points`
pub fn update_rate_mhz(frequency_mhz: u32, points: u16) -> u64 {
    frequency_mhz as u64 * points as u64
}
