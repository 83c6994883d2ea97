//! Outgoing command link and serial port access

use std::io::{ErrorKind, Read, Write};

use oscgen_protocol::{frame_size, Frame, StreamReassembler};
use serialport::SerialPort;
use tracing::{debug, trace};

use crate::config::PortConfig;
use crate::error::{HostError, Result};

/// Open a serial port with the configured settings
pub fn open_port(config: &PortConfig) -> Result<Box<dyn SerialPort>> {
    debug!("opening {} at {} baud", config.path, config.baud_rate);
    let port = serialport::new(&config.path, config.baud_rate)
        .timeout(config.timeout())
        .open()?;
    Ok(port)
}

/// Names of the serial ports present on this machine
pub fn list_ports() -> Result<Vec<String>> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|p| p.port_name)
        .collect())
}

/// True for read errors that just mean "nothing yet"
pub(crate) fn is_idle(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
    )
}

/// Sends framed commands with an incrementing sequence number
///
/// The first frame carries sequence 1.
pub struct CommandLink<T> {
    port: T,
    sequence: u16,
}

impl<T> CommandLink<T> {
    pub fn new(port: T) -> Self {
        Self { port, sequence: 0 }
    }

    /// Sequence number of the last frame sent
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.port
    }

    pub fn into_inner(self) -> T {
        self.port
    }
}

impl<T: Write> CommandLink<T> {
    /// Frame and send one command; returns its sequence number
    pub fn send(&mut self, command: u8, payload: &[u8]) -> Result<u16> {
        let sequence = self.sequence.wrapping_add(1);
        let frame = Frame::new(command, sequence, payload)?;

        let mut bytes = vec![0u8; frame_size(payload.len())];
        frame.encode(&mut bytes)?;
        self.port.write_all(&bytes)?;
        self.port.flush()?;

        self.sequence = sequence;
        trace!(command, sequence, len = payload.len(), "sent frame");
        Ok(sequence)
    }
}

impl<T: Read> CommandLink<T> {
    /// Read until a frame with `command` arrives, returning its payload
    ///
    /// Other frames are skipped. Gives up after `attempts` idle reads.
    pub fn wait_for<const N: usize>(
        &mut self,
        rx: &mut StreamReassembler<N>,
        command: u8,
        attempts: usize,
    ) -> Result<Vec<u8>> {
        let mut buf = [0u8; 256];
        let mut idle = 0;

        loop {
            while let Some(frame) = rx.next_frame() {
                if frame.command == command {
                    return Ok(frame.payload.to_vec());
                }
                debug!(command = frame.command, "skipping unexpected frame");
            }

            match self.port.read(&mut buf) {
                Ok(0) => return Err(HostError::Timeout(command)),
                Ok(n) => {
                    let mut rest = &buf[..n];
                    loop {
                        let taken = rx.feed(rest);
                        rest = &rest[taken..];
                        if rest.is_empty() {
                            break;
                        }
                        // buffer full: look at what is there before feeding more
                        while let Some(frame) = rx.next_frame() {
                            if frame.command == command {
                                return Ok(frame.payload.to_vec());
                            }
                        }
                    }
                }
                Err(e) if is_idle(&e) => {
                    idle += 1;
                    if idle >= attempts {
                        return Err(HostError::Timeout(command));
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
