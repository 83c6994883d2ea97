//! Byte stream to frame reassembly
//!
//! The transport delivers bytes in arbitrary chunks and may drop or corrupt
//! some of them. [`StreamReassembler`] buffers what has arrived, hunts for the
//! sync marker, and yields only frames whose CRC checks out. Framing and
//! integrity errors never reach the caller; they are absorbed by shifting the
//! buffer forward and rescanning, and are visible only in [`ReassemblerStats`].

use crate::frame::{frame_size, Frame, Header, CRC_SIZE, FRAME_SYNC, HEADER_SIZE};
use crate::crc::crc16_ibm;

/// Diagnostic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReassemblerStats {
    /// Valid frames yielded
    pub frames: u32,
    /// Complete frames dropped for CRC mismatch
    pub crc_errors: u32,
    /// Sync matches dropped for a bad version or an oversize length
    pub header_errors: u32,
    /// Bytes skipped while resynchronizing
    pub discarded_bytes: u32,
}

/// Outcome of inspecting the front of the buffer
enum Step {
    /// Not enough bytes to decide
    NeedMore,
    /// Drop bytes from the front and look again
    Skip(usize, SkipReason),
    /// A verified frame of this header sits at the front
    Ready(Header),
}

#[derive(Clone, Copy)]
enum SkipReason {
    NoSync,
    BadHeader,
    BadCrc,
}

/// Fixed-capacity frame reassembler
///
/// `N` bounds the largest frame that can be received; a header announcing a
/// bigger frame is treated like a false sync match. The host sizes this for
/// oscilloscope data frames, the devices only for their command frames.
///
/// Usage is feed/drain:
///
/// ```
/// use oscgen_protocol::{Frame, StreamReassembler};
///
/// let wire = Frame::new(0x24, 1, &[1]).unwrap().encode_to_vec::<16>().unwrap();
/// let mut rx = StreamReassembler::<64>::new();
/// let mut rest: &[u8] = &wire;
/// while !rest.is_empty() {
///     let taken = rx.feed(rest);
///     rest = &rest[taken..];
///     while let Some(frame) = rx.next_frame() {
///         assert_eq!(frame.command, 0x24);
///     }
/// }
/// ```
pub struct StreamReassembler<const N: usize> {
    buf: [u8; N],
    start: usize,
    end: usize,
    /// Length of the frame last handed out, dropped on the next call
    pending: usize,
    stats: ReassemblerStats,
}

impl<const N: usize> Default for StreamReassembler<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> StreamReassembler<N> {
    /// Create an empty reassembler
    pub const fn new() -> Self {
        assert!(N >= frame_size(0), "reassembler must hold at least an empty frame");
        Self {
            buf: [0; N],
            start: 0,
            end: 0,
            pending: 0,
            stats: ReassemblerStats {
                frames: 0,
                crc_errors: 0,
                header_errors: 0,
                discarded_bytes: 0,
            },
        }
    }

    /// Largest frame this reassembler can accept
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Bytes buffered and not yet consumed
    pub fn buffered(&self) -> usize {
        self.end - self.start - self.pending
    }

    /// Diagnostic counters since creation or the last `reset`
    pub fn stats(&self) -> ReassemblerStats {
        self.stats
    }

    /// Drop all buffered bytes and counters
    pub fn reset(&mut self) {
        self.start = 0;
        self.end = 0;
        self.pending = 0;
        self.stats = ReassemblerStats::default();
    }

    /// Append received bytes
    ///
    /// Returns how many bytes were accepted. Fewer than offered means the
    /// buffer is full; drain with [`next_frame`](Self::next_frame) and feed
    /// the rest again.
    pub fn feed(&mut self, bytes: &[u8]) -> usize {
        self.release_pending();
        if N - self.end < bytes.len() && self.start > 0 {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }

        let n = bytes.len().min(N - self.end);
        self.buf[self.end..self.end + n].copy_from_slice(&bytes[..n]);
        self.end += n;
        n
    }

    /// Extract the next valid frame, resynchronizing past any garbage
    ///
    /// The returned frame borrows the internal buffer; its bytes are released
    /// on the next call to `feed` or `next_frame`.
    pub fn next_frame(&mut self) -> Option<Frame<'_>> {
        self.release_pending();

        let header = loop {
            match self.inspect() {
                Step::NeedMore => return None,
                Step::Ready(header) => break header,
                Step::Skip(n, reason) => {
                    match reason {
                        SkipReason::NoSync => {}
                        SkipReason::BadHeader => {
                            self.stats.header_errors = self.stats.header_errors.wrapping_add(1)
                        }
                        SkipReason::BadCrc => {
                            self.stats.crc_errors = self.stats.crc_errors.wrapping_add(1)
                        }
                    }
                    self.stats.discarded_bytes = self.stats.discarded_bytes.wrapping_add(n as u32);
                    self.start += n;
                }
            }
        };

        let size = header.frame_size();
        self.pending = size;
        self.stats.frames = self.stats.frames.wrapping_add(1);

        let body = self.start + HEADER_SIZE;
        Some(Frame {
            sequence: header.sequence,
            command: header.command,
            payload: &self.buf[body..self.start + size - CRC_SIZE],
        })
    }

    /// Feed a whole chunk and hand every completed frame to `on_frame`
    pub fn push<F>(&mut self, mut bytes: &[u8], mut on_frame: F)
    where
        F: FnMut(Frame<'_>),
    {
        loop {
            let taken = self.feed(bytes);
            bytes = &bytes[taken..];
            while let Some(frame) = self.next_frame() {
                on_frame(frame);
            }
            if bytes.is_empty() {
                break;
            }
        }
    }

    fn release_pending(&mut self) {
        self.start += self.pending;
        self.pending = 0;
        if self.start == self.end {
            self.start = 0;
            self.end = 0;
        }
    }

    fn inspect(&self) -> Step {
        let avail = &self.buf[self.start..self.end];
        if avail.len() < HEADER_SIZE {
            return Step::NeedMore;
        }
        if avail[..2] != FRAME_SYNC {
            return Step::Skip(1, SkipReason::NoSync);
        }

        let header = match Header::parse(avail) {
            Ok(header) => header,
            Err(e) if e.is_incomplete() => return Step::NeedMore,
            Err(_) => return Step::Skip(FRAME_SYNC.len(), SkipReason::BadHeader),
        };
        let size = header.frame_size();
        if size > N {
            return Step::Skip(FRAME_SYNC.len(), SkipReason::BadHeader);
        }
        if avail.len() < size {
            return Step::NeedMore;
        }

        let body_end = size - CRC_SIZE;
        let received = u16::from_le_bytes([avail[body_end], avail[body_end + 1]]);
        if crc16_ibm(&avail[FRAME_SYNC.len()..body_end]) != received {
            return Step::Skip(FRAME_SYNC.len(), SkipReason::BadCrc);
        }

        Step::Ready(header)
    }
}
