//! Generator board composition root

use embedded_io::Write;
use oscgen_protocol::commands::CMD_GEN_STATUS;
use oscgen_protocol::{Frame, ReassemblerStats, StreamReassembler};

use super::CommandProcessor;
use crate::config::GENERATOR_RX_BUFFER;
use crate::traits::OutputDriver;

/// Generator side of the link
///
/// Owns the command reassembler, the processor and the reply sequence
/// counter. The board's main loop hands it every received chunk along with
/// the transmit half of the transport.
pub struct GeneratorDevice<D: OutputDriver, const RX: usize = GENERATOR_RX_BUFFER> {
    processor: CommandProcessor<D>,
    rx: StreamReassembler<RX>,
    tx_sequence: u16,
}

impl<D: OutputDriver, const RX: usize> GeneratorDevice<D, RX> {
    /// Wrap a processor that already started the output
    pub fn new(processor: CommandProcessor<D>) -> Self {
        Self {
            processor,
            rx: StreamReassembler::new(),
            tx_sequence: 0,
        }
    }

    pub fn processor(&self) -> &CommandProcessor<D> {
        &self.processor
    }

    /// Receive-side framing counters
    pub fn link_stats(&self) -> ReassemblerStats {
        self.rx.stats()
    }

    /// Process received bytes, writing any replies to `tx`
    ///
    /// Invalid frames and rejected commands produce no reply. Returns the
    /// number of commands applied.
    pub fn receive<W: Write>(&mut self, mut bytes: &[u8], tx: &mut W) -> Result<usize, W::Error> {
        let mut applied = 0;

        loop {
            let taken = self.rx.feed(bytes);
            bytes = &bytes[taken..];

            while let Some(frame) = self.rx.next_frame() {
                match self.processor.handle(&frame) {
                    Ok(reply) => {
                        applied += 1;
                        if let Some(status) = reply {
                            self.tx_sequence = self.tx_sequence.wrapping_add(1);
                            let payload = status.to_bytes();
                            Frame {
                                sequence: self.tx_sequence,
                                command: CMD_GEN_STATUS,
                                payload: &payload,
                            }
                            .write_to(tx)?;
                        }
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

        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::processor::tests::RecordingDriver;
    use oscgen_protocol::commands::{CMD_SET_AMPLITUDE, CMD_UPLOAD_TABLE};
    use oscgen_protocol::{decode, GeneratorStatus, WaveKind};

    fn device() -> GeneratorDevice<RecordingDriver> {
        GeneratorDevice::new(CommandProcessor::new(RecordingDriver::default()))
    }

    fn encode(command: u8, sequence: u16, payload: &[u8]) -> Vec<u8> {
        Frame::new(command, sequence, payload)
            .unwrap()
            .encode_to_vec::<2100>()
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_commands_split_across_reads() {
        let mut dev = device();
        let mut tx: Vec<u8> = Vec::new();

        let bytes = encode(CMD_SET_AMPLITUDE, 1, &2000u16.to_le_bytes());
        assert_eq!(dev.receive(&bytes[..5], &mut tx), Ok(0));
        assert_eq!(dev.receive(&bytes[5..], &mut tx), Ok(1));
        assert_eq!(dev.processor().state().amplitude_mv_pp, 2000);
        assert!(tx.is_empty());
    }

    #[test]
    fn test_garbage_between_commands() {
        let mut dev = device();
        let mut tx: Vec<u8> = Vec::new();

        let mut bytes = encode(CMD_SET_AMPLITUDE, 1, &1500u16.to_le_bytes());
        bytes.extend_from_slice(&[0x00, 0x55, 0x13]);
        bytes.extend(encode(CMD_UPLOAD_TABLE, 2, &[3, 0, 10, 0, 20, 0, 30, 0]));

        assert_eq!(dev.receive(&bytes, &mut tx), Ok(2));
        let state = dev.processor().state();
        assert_eq!(state.kind, WaveKind::User);
        assert_eq!(state.amplitude_mv_pp, 1500);
        assert_eq!(state.table.samples(), &[10, 20, 30]);
        assert_eq!(dev.link_stats().discarded_bytes, 3);
    }

    #[test]
    fn test_corrupted_command_ignored() {
        let mut dev = device();
        let mut tx: Vec<u8> = Vec::new();

        let mut bytes = encode(CMD_SET_AMPLITUDE, 1, &2000u16.to_le_bytes());
        bytes[8] ^= 0xFF;
        assert_eq!(dev.receive(&bytes, &mut tx), Ok(0));
        assert_eq!(dev.processor().state().amplitude_mv_pp, 1000);
        assert_eq!(dev.link_stats().crc_errors, 1);
    }

    #[test]
    fn test_status_reply() {
        let mut dev = device();
        let mut tx: Vec<u8> = Vec::new();

        let query = encode(CMD_GEN_STATUS, 9, &[]);
        assert_eq!(dev.receive(&query, &mut tx), Ok(1));
        assert_eq!(dev.receive(&query, &mut tx), Ok(1));

        let (first, used) = decode(&tx).unwrap();
        assert_eq!(first.command, CMD_GEN_STATUS);
        assert_eq!(first.sequence, 1);
        let status = GeneratorStatus::parse(first.payload).unwrap();
        assert_eq!(status.kind, WaveKind::Sine);
        assert_eq!(status.table_len, 256);

        let (second, _) = decode(&tx[used..]).unwrap();
        assert_eq!(second.sequence, 2);
    }
}
