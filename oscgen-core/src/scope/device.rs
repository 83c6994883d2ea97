//! Oscilloscope board composition root

use embedded_io::Write;
use oscgen_protocol::{ReassemblerStats, ScopeCommand, StreamReassembler};

use super::{AcquisitionControl, AcquisitionFrame, RingConsumer};
use crate::config::{FRAME_POINTS, RING_SLOTS, SCOPE_RX_BUFFER};
use crate::traits::AcquisitionClock;

/// Oscilloscope side of the link
///
/// Runs in the main loop: applies received commands and drains the frame
/// ring to the transport, one data frame per [`poll_transmit`] call.
///
/// [`poll_transmit`]: Self::poll_transmit
pub struct ScopeDevice<
    'a,
    C: AcquisitionClock,
    const SLOTS: usize = RING_SLOTS,
    const P: usize = FRAME_POINTS,
    const RX: usize = SCOPE_RX_BUFFER,
> {
    consumer: RingConsumer<'a, SLOTS, P>,
    control: &'a AcquisitionControl,
    clock: C,
    rx: StreamReassembler<RX>,
    outgoing: AcquisitionFrame<P>,
    channel: u8,
    tx_sequence: u16,
}

impl<'a, C: AcquisitionClock, const SLOTS: usize, const P: usize, const RX: usize>
    ScopeDevice<'a, C, SLOTS, P, RX>
{
    pub fn new(
        consumer: RingConsumer<'a, SLOTS, P>,
        control: &'a AcquisitionControl,
        clock: C,
        channel: u8,
    ) -> Self {
        Self {
            consumer,
            control,
            clock,
            rx: StreamReassembler::new(),
            outgoing: AcquisitionFrame::new(),
            channel,
            tx_sequence: 0,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.control.is_streaming()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Frames lost to ring overwrite
    pub fn dropped_frames(&self) -> u32 {
        self.consumer.dropped()
    }

    /// Sealed frames waiting to be sent
    pub fn pending_frames(&self) -> usize {
        self.consumer.len()
    }

    /// Receive-side framing counters
    pub fn link_stats(&self) -> ReassemblerStats {
        self.rx.stats()
    }

    /// Process received command bytes
    ///
    /// Returns the number of commands applied.
    pub fn receive(&mut self, mut bytes: &[u8]) -> usize {
        let mut applied = 0;

        loop {
            let taken = self.rx.feed(bytes);
            bytes = &bytes[taken..];

            while let Some(frame) = self.rx.next_frame() {
                match ScopeCommand::from_frame(&frame) {
                    Ok(command) => {
                        apply_command(&mut self.consumer, self.control, &mut self.clock, command);
                        applied += 1;
                    }
                    Err(_e) => {
                        #[cfg(feature = "defmt")]
                        defmt::warn!("Command 0x{:02x} ignored: {:?}", frame.command, _e);
                    }
                }
            }

            if bytes.is_empty() {
                break;
            }
        }

        applied
    }

    /// Apply one decoded command
    pub fn apply(&mut self, command: ScopeCommand<'_>) {
        apply_command(&mut self.consumer, self.control, &mut self.clock, command);
    }

    /// Send the oldest sealed frame, if any
    ///
    /// Keeps draining after streaming stops. Returns whether a frame was
    /// written.
    pub fn poll_transmit<W: Write>(&mut self, tx: &mut W) -> Result<bool, W::Error> {
        if self.consumer.pop_into(&mut self.outgoing).is_err() {
            return Ok(false);
        }

        self.tx_sequence = self.tx_sequence.wrapping_add(1);
        self.outgoing
            .write_data_frame(tx, self.tx_sequence, self.channel)?;
        Ok(true)
    }
}

fn apply_command<C: AcquisitionClock, const SLOTS: usize, const P: usize>(
    consumer: &mut RingConsumer<'_, SLOTS, P>,
    control: &AcquisitionControl,
    clock: &mut C,
    command: ScopeCommand<'_>,
) {
    match command {
        ScopeCommand::Stream(true) => {
            // new epoch first: nothing sealed after the clear can be stale
            control.start();
            consumer.clear();
            #[cfg(feature = "defmt")]
            defmt::info!("Streaming started at {} Hz", control.sample_rate_hz());
        }
        ScopeCommand::Stream(false) => {
            control.stop();
            #[cfg(feature = "defmt")]
            defmt::info!("Streaming stopped");
        }
        ScopeCommand::SetSampleRate(hz) => {
            let actual = clock.set_sample_rate(hz);
            control.set_sample_rate_hz(actual);
            #[cfg(feature = "defmt")]
            defmt::debug!("Sample rate {} Hz (requested {})", actual, hz);
        }
        ScopeCommand::SetTrigger(config) => {
            control.set_pretrigger_count(clock.configure_trigger(config));
        }
    }
}
