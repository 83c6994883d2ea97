//! Generator command processor
//!
//! Single-state machine: every validated command updates the state and
//! pushes whatever changed to the output driver. Rejected commands leave
//! state and hardware untouched.

use oscgen_protocol::commands::{CommandError, DUTY_RANGE};
use oscgen_protocol::{Frame, GeneratorCommand, GeneratorStatus, WaveKind};

use super::GeneratorState;
use crate::config::GeneratorDefaults;
use crate::traits::OutputDriver;
use crate::waveform::synthesize;

/// Applies generator commands and drives the output hardware
pub struct CommandProcessor<D: OutputDriver> {
    state: GeneratorState,
    driver: D,
}

impl<D: OutputDriver> CommandProcessor<D> {
    /// Create a processor with the power-on defaults and start the output
    pub fn new(driver: D) -> Self {
        Self::with_defaults(driver, &GeneratorDefaults::new())
    }

    /// Create a processor with custom power-on settings
    ///
    /// A [`WaveKind::User`] default falls back to sine since no table has
    /// been uploaded yet.
    pub fn with_defaults(driver: D, defaults: &GeneratorDefaults) -> Self {
        let mut state = GeneratorState::new(defaults);
        if !state.kind.is_synthesized() {
            state.kind = WaveKind::Sine;
        }
        synthesize(&state.params(), &mut state.table);

        let mut processor = Self { state, driver };
        processor
            .driver
            .set_timer(processor.state.frequency_mhz, processor.state.table.points());
        processor.driver.load_table(processor.state.table.samples());
        processor
    }

    /// Current state
    pub fn state(&self) -> &GeneratorState {
        &self.state
    }

    /// Current state as a status reply
    pub fn status(&self) -> GeneratorStatus {
        self.state.status()
    }

    /// Output driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Output driver, mutably
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Decode and apply one received frame
    ///
    /// Returns the status to send back for a status query.
    pub fn handle(&mut self, frame: &Frame<'_>) -> Result<Option<GeneratorStatus>, CommandError> {
        let command = GeneratorCommand::from_frame(frame)?;
        self.apply(command)
    }

    /// Apply one decoded command
    pub fn apply(
        &mut self,
        command: GeneratorCommand<'_>,
    ) -> Result<Option<GeneratorStatus>, CommandError> {
        let previous_points = self.state.table.points();

        match command {
            GeneratorCommand::SetWaveKind(WaveKind::User) => {
                if self.state.user_table.is_empty() {
                    return Err(CommandError::NoUserTable);
                }
                self.state.kind = WaveKind::User;
                self.state.table.clone_from(&self.state.user_table);
                self.publish(previous_points);
            }
            GeneratorCommand::SetWaveKind(kind) => {
                self.state.kind = kind;
                self.resynthesize(previous_points);
            }
            GeneratorCommand::SetFrequency(frequency_mhz) => {
                self.state.frequency_mhz = frequency_mhz;
                self.driver.set_timer(frequency_mhz, previous_points);
                self.driver.load_table(self.state.table.samples());
            }
            GeneratorCommand::SetAmplitude(amplitude) => {
                self.state.amplitude_mv_pp = amplitude;
                self.resynthesize(previous_points);
            }
            GeneratorCommand::SetOffset(offset) => {
                self.state.offset_mv = offset;
                self.resynthesize(previous_points);
            }
            GeneratorCommand::SetDuty(duty) => {
                if !DUTY_RANGE.contains(&duty) {
                    return Err(CommandError::DutyOutOfRange(duty));
                }
                self.state.duty_per_mille = duty;
                if self.state.kind == WaveKind::Square {
                    self.resynthesize(previous_points);
                }
            }
            GeneratorCommand::UploadTable(upload) => {
                self.state.user_table.load_user(&upload)?;
                self.state.kind = WaveKind::User;
                self.state.table.clone_from(&self.state.user_table);
                self.publish(previous_points);
            }
            GeneratorCommand::GetStatus => return Ok(Some(self.state.status())),
        }

        Ok(None)
    }

    /// Rebuild the table for a built-in kind and reload it
    ///
    /// An active user table is reloaded unchanged.
    fn resynthesize(&mut self, previous_points: u16) {
        synthesize(&self.state.params(), &mut self.state.table);
        self.publish(previous_points);
    }

    fn publish(&mut self, previous_points: u16) {
        self.driver.load_table(self.state.table.samples());
        let points = self.state.table.points();
        if points != previous_points {
            self.driver.set_timer(self.state.frequency_mhz, points);
        }
    }
}
