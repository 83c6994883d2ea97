//! Output table storage

use heapless::Vec;
use oscgen_protocol::commands::CommandError;
use oscgen_protocol::{UserTable, WaveKind};

use crate::config::MAX_TABLE_POINTS;

/// One period of DAC codes and the kind that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveformTable {
    kind: WaveKind,
    samples: Vec<u16, MAX_TABLE_POINTS>,
}

impl Default for WaveformTable {
    fn default() -> Self {
        Self::new()
    }
}

impl WaveformTable {
    /// Create an empty table
    pub const fn new() -> Self {
        Self {
            kind: WaveKind::Sine,
            samples: Vec::new(),
        }
    }

    /// Kind the samples were produced for
    pub fn kind(&self) -> WaveKind {
        self.kind
    }

    /// Number of points in one period
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True until something has been synthesized or uploaded
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Point count as carried on the wire and passed to the timer
    pub fn points(&self) -> u16 {
        self.samples.len() as u16
    }

    /// DAC codes, one per timer tick
    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    /// Replace the contents with an uploaded table
    ///
    /// Codes are stored as received. On error the table is left unchanged.
    pub fn load_user(&mut self, table: &UserTable<'_>) -> Result<(), CommandError> {
        if table.is_empty() || table.len() > MAX_TABLE_POINTS {
            return Err(CommandError::TableLength(table.len() as u16));
        }
        self.samples.clear();
        self.samples.extend(table.codes());
        self.kind = WaveKind::User;
        Ok(())
    }

    /// Reset to `points` zeroed samples of `kind` for synthesis
    pub(crate) fn reset(&mut self, kind: WaveKind, points: usize) -> &mut [u16] {
        let points = points.min(MAX_TABLE_POINTS);
        self.kind = kind;
        self.samples.clear();
        // capacity checked above, cannot fail
        let _ = self.samples.resize(points, 0);
        &mut self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_table_is_empty() {
        let table = WaveformTable::new();
        assert!(table.is_empty());
        assert_eq!(table.points(), 0);
    }

    #[test]
    fn test_load_user_verbatim() {
        // codes above 4095 are not clamped
        let payload = [3, 0, 10, 0, 20, 0, 0xFF, 0xFF];
        let upload = UserTable::parse(&payload).unwrap();

        let mut table = WaveformTable::new();
        table.load_user(&upload).unwrap();
        assert_eq!(table.kind(), WaveKind::User);
        assert_eq!(table.samples(), &[10, 20, 0xFFFF]);
    }

    #[test]
    fn test_reset_sizes_table() {
        let mut table = WaveformTable::new();
        let samples = table.reset(WaveKind::Square, 256);
        assert_eq!(samples.len(), 256);
        assert_eq!(table.kind(), WaveKind::Square);
        assert_eq!(table.len(), 256);
    }
}
