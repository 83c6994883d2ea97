//! Frame encoding and decoding for the oscgen link protocol.
//!
//! Frame format (all multi-byte fields little-endian):
//! - SYNC (2 bytes): 0x55 0xAA
//! - VERSION (1 byte): protocol version, currently 1
//! - SEQUENCE (2 bytes): producer-assigned, wraps at 65536
//! - COMMAND (1 byte): payload interpretation
//! - LENGTH (2 bytes): payload length (0-65535)
//! - PAYLOAD (LENGTH bytes): command-specific data
//! - CRC (2 bytes): CRC16/IBM over VERSION through the end of PAYLOAD

use core::fmt;

use embedded_io::Write;
use heapless::Vec;

use crate::crc::{crc16_ibm, Crc16};

/// Frame synchronization marker
pub const FRAME_SYNC: [u8; 2] = [0x55, 0xAA];

/// Protocol version carried in every frame
pub const PROTOCOL_VERSION: u8 = 1;

/// SYNC + VERSION + SEQUENCE + COMMAND + LENGTH
pub const HEADER_SIZE: usize = 8;

/// Trailing checksum size
pub const CRC_SIZE: usize = 2;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Total wire size of a frame carrying `payload_len` bytes
pub const fn frame_size(payload_len: usize) -> usize {
    HEADER_SIZE + payload_len + CRC_SIZE
}

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Frame is incomplete (need more bytes)
    Incomplete,
    /// First two bytes are not the sync marker
    MissingSync,
    /// Header carries a version this implementation does not speak
    UnsupportedVersion(u8),
    /// Checksum mismatch
    InvalidChecksum,
    /// Buffer too small for encoding
    BufferTooSmall,
}

impl FrameError {
    /// True when the bytes so far are a valid prefix and more are needed
    pub fn is_incomplete(&self) -> bool {
        matches!(self, FrameError::Incomplete)
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::PayloadTooLarge => f.write_str("payload exceeds 65535 bytes"),
            FrameError::Incomplete => f.write_str("incomplete frame"),
            FrameError::MissingSync => f.write_str("sync marker not found"),
            FrameError::UnsupportedVersion(v) => write!(f, "unsupported protocol version {v}"),
            FrameError::InvalidChecksum => f.write_str("CRC mismatch"),
            FrameError::BufferTooSmall => f.write_str("output buffer too small"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FrameError {}

/// Decoded frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    /// Sequence number
    pub sequence: u16,
    /// Command identifier
    pub command: u8,
    /// Payload length in bytes
    pub length: u16,
}

impl Header {
    /// Parse and validate the fixed header at the start of `bytes`
    ///
    /// Checks sync and version only; the payload and CRC are not inspected.
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < HEADER_SIZE {
            return Err(FrameError::Incomplete);
        }
        if bytes[..2] != FRAME_SYNC {
            return Err(FrameError::MissingSync);
        }
        if bytes[2] != PROTOCOL_VERSION {
            return Err(FrameError::UnsupportedVersion(bytes[2]));
        }

        Ok(Self {
            sequence: u16::from_le_bytes([bytes[3], bytes[4]]),
            command: bytes[5],
            length: u16::from_le_bytes([bytes[6], bytes[7]]),
        })
    }

    /// Wire size of the whole frame this header announces
    pub fn frame_size(&self) -> usize {
        frame_size(self.length as usize)
    }

    fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let seq = self.sequence.to_le_bytes();
        let len = self.length.to_le_bytes();
        [
            FRAME_SYNC[0],
            FRAME_SYNC[1],
            PROTOCOL_VERSION,
            seq[0],
            seq[1],
            self.command,
            len[0],
            len[1],
        ]
    }
}

/// A parsed or constructed frame
///
/// The payload borrows from the receive buffer (or the caller's data), so
/// decoding never copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Sequence number
    pub sequence: u16,
    /// Command identifier
    pub command: u8,
    /// Payload data
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Create a new frame with the given command, sequence and payload
    pub fn new(command: u8, sequence: u16, payload: &'a [u8]) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }

        Ok(Self {
            sequence,
            command,
            payload,
        })
    }

    /// Create a frame with no payload
    pub fn empty(command: u8, sequence: u16) -> Frame<'static> {
        Frame {
            sequence,
            command,
            payload: &[],
        }
    }

    fn header(&self) -> Header {
        Header {
            sequence: self.sequence,
            command: self.command,
            length: self.payload.len() as u16,
        }
    }

    /// Number of bytes `encode` will produce
    pub fn encoded_len(&self) -> usize {
        frame_size(self.payload.len())
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }
        let frame_len = self.encoded_len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let body_end = HEADER_SIZE + self.payload.len();
        buffer[..HEADER_SIZE].copy_from_slice(&self.header().to_bytes());
        buffer[HEADER_SIZE..body_end].copy_from_slice(self.payload);
        let crc = crc16_ibm(&buffer[FRAME_SYNC.len()..body_end]);
        buffer[body_end..frame_len].copy_from_slice(&crc.to_le_bytes());

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec<const N: usize>(&self) -> Result<Vec<u8, N>, FrameError> {
        let mut vec = Vec::new();
        vec.resize(self.encoded_len(), 0)
            .map_err(|_| FrameError::BufferTooSmall)?;
        self.encode(&mut vec)?;
        Ok(vec)
    }

    /// Write this frame straight to a byte sink
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), W::Error> {
        let mut encoder =
            FrameEncoder::begin(writer, self.command, self.sequence, self.payload.len() as u16)?;
        encoder.write_payload(self.payload)?;
        encoder.finish()
    }
}

/// Decode one frame from the start of `bytes`
///
/// Returns the frame and the number of bytes it occupied. `Incomplete`
/// means the bytes are a plausible prefix; every other error means the
/// frame is invalid and must be discarded.
pub fn decode(bytes: &[u8]) -> Result<(Frame<'_>, usize), FrameError> {
    let header = Header::parse(bytes)?;
    let size = header.frame_size();
    if bytes.len() < size {
        return Err(FrameError::Incomplete);
    }

    let body_end = HEADER_SIZE + header.length as usize;
    let received = u16::from_le_bytes([bytes[body_end], bytes[body_end + 1]]);
    if crc16_ibm(&bytes[FRAME_SYNC.len()..body_end]) != received {
        return Err(FrameError::InvalidChecksum);
    }

    let frame = Frame {
        sequence: header.sequence,
        command: header.command,
        payload: &bytes[HEADER_SIZE..body_end],
    };
    Ok((frame, size))
}

/// Streaming frame writer
///
/// Emits the header up front, checksums payload chunks as they pass
/// through and appends the CRC on `finish`. The caller must supply exactly
/// the announced number of payload bytes; surplus bytes are truncated and a
/// short payload is zero-padded so the frame on the wire stays well-formed.
pub struct FrameEncoder<'w, W: Write> {
    writer: &'w mut W,
    crc: Crc16,
    remaining: usize,
}

impl<'w, W: Write> FrameEncoder<'w, W> {
    /// Write the header of a frame announcing `length` payload bytes
    pub fn begin(writer: &'w mut W, command: u8, sequence: u16, length: u16) -> Result<Self, W::Error> {
        let header = Header {
            sequence,
            command,
            length,
        }
        .to_bytes();
        writer.write_all(&header)?;

        let mut crc = Crc16::new();
        crc.update(&header[FRAME_SYNC.len()..]);

        Ok(Self {
            writer,
            crc,
            remaining: length as usize,
        })
    }

    /// Payload bytes still expected before `finish`
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Append a chunk of payload
    pub fn write_payload(&mut self, bytes: &[u8]) -> Result<(), W::Error> {
        let take = bytes.len().min(self.remaining);
        let chunk = &bytes[..take];
        self.crc.update(chunk);
        self.writer.write_all(chunk)?;
        self.remaining -= take;
        Ok(())
    }

    /// Close the frame with its checksum
    pub fn finish(mut self) -> Result<(), W::Error> {
        const PAD: [u8; 16] = [0; 16];
        while self.remaining > 0 {
            let n = self.remaining.min(PAD.len());
            self.write_payload(&PAD[..n])?;
        }
        self.writer.write_all(&self.crc.finish().to_le_bytes())?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Minimal in-memory sink for encoder tests
    struct Sink {
        bytes: Vec<u8, 512>,
    }

    impl embedded_io::ErrorType for Sink {
        type Error = core::convert::Infallible;
    }

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            let n = buf.len().min(self.bytes.capacity() - self.bytes.len());
            let _ = self.bytes.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn test_frame_encode_empty_payload() {
        let frame = Frame::empty(0x1F, 7);
        let mut buffer = [0u8; 16];
        let len = frame.encode(&mut buffer).unwrap();

        assert_eq!(len, 10);
        assert_eq!(&buffer[..8], &[0x55, 0xAA, 0x01, 0x07, 0x00, 0x1F, 0x00, 0x00]);
        let crc = crc16_ibm(&buffer[2..8]);
        assert_eq!(&buffer[8..10], &crc.to_le_bytes());
    }

    #[test]
    fn test_frame_encode_with_payload() {
        let frame = Frame::new(0x12, 0x0102, &[0xD0, 0x07]).unwrap();
        let mut buffer = [0u8; 16];
        let len = frame.encode(&mut buffer).unwrap();

        assert_eq!(len, 12);
        assert_eq!(buffer[3], 0x02); // sequence low
        assert_eq!(buffer[4], 0x01); // sequence high
        assert_eq!(buffer[5], 0x12); // command
        assert_eq!(buffer[6], 2); // length low
        assert_eq!(buffer[7], 0); // length high
        assert_eq!(&buffer[8..10], &[0xD0, 0x07]);
    }

    #[test]
    fn test_frame_roundtrip() {
        let original = Frame::new(0x15, 42, &[3, 0, 10, 0, 20, 0, 30, 0]).unwrap();
        let encoded = original.encode_to_vec::<64>().unwrap();

        let (parsed, consumed) = decode(&encoded).unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_decode_needs_header() {
        let encoded = Frame::empty(0x10, 1).encode_to_vec::<16>().unwrap();
        assert_eq!(decode(&encoded[..7]), Err(FrameError::Incomplete));
    }

    #[test]
    fn test_decode_needs_payload_and_crc() {
        let encoded = Frame::new(0x11, 1, &[1, 2, 3, 4]).unwrap().encode_to_vec::<32>().unwrap();
        assert_eq!(decode(&encoded[..encoded.len() - 1]), Err(FrameError::Incomplete));
    }

    #[test]
    fn test_decode_invalid_checksum() {
        let mut encoded = Frame::empty(0x1F, 0).encode_to_vec::<16>().unwrap();
        let last_idx = encoded.len() - 1;
        encoded[last_idx] ^= 0xFF;

        assert_eq!(decode(&encoded), Err(FrameError::InvalidChecksum));
    }

    #[test]
    fn test_decode_wrong_version() {
        let mut encoded = Frame::empty(0x1F, 0).encode_to_vec::<16>().unwrap();
        encoded[2] = 2;
        assert_eq!(decode(&encoded), Err(FrameError::UnsupportedVersion(2)));
    }

    #[test]
    fn test_decode_missing_sync() {
        let mut encoded = Frame::empty(0x1F, 0).encode_to_vec::<16>().unwrap();
        encoded[0] = 0x00;
        assert_eq!(decode(&encoded), Err(FrameError::MissingSync));
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut encoded = Frame::new(0x24, 5, &[1]).unwrap().encode_to_vec::<32>().unwrap();
        let frame_len = encoded.len();
        encoded.extend_from_slice(&[0x55, 0xAA, 0x01]).unwrap();

        let (frame, consumed) = decode(&encoded).unwrap();
        assert_eq!(consumed, frame_len);
        assert_eq!(frame.payload, &[1]);
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let frame = Frame::new(0x12, 0, &[1, 2]).unwrap();
        let mut buffer = [0u8; 11];
        assert_eq!(frame.encode(&mut buffer), Err(FrameError::BufferTooSmall));
    }

    #[test]
    fn test_streaming_encoder_matches_encode() {
        let payload = [9u8, 8, 7, 6, 5, 4, 3, 2, 1];
        let frame = Frame::new(0x40, 300, &payload).unwrap();
        let expected = frame.encode_to_vec::<64>().unwrap();

        let mut sink = Sink { bytes: Vec::new() };
        {
            let mut encoder = FrameEncoder::begin(&mut sink, 0x40, 300, payload.len() as u16).unwrap();
            encoder.write_payload(&payload[..4]).unwrap();
            assert_eq!(encoder.remaining(), 5);
            encoder.write_payload(&payload[4..]).unwrap();
            encoder.finish().unwrap();
        }

        assert_eq!(sink.bytes, expected);
    }

    #[test]
    fn test_streaming_encoder_pads_short_payload() {
        let mut sink = Sink { bytes: Vec::new() };
        {
            let mut encoder = FrameEncoder::begin(&mut sink, 0x40, 0, 4).unwrap();
            encoder.write_payload(&[1, 2]).unwrap();
            encoder.finish().unwrap();
        }

        let (frame, _) = decode(&sink.bytes).unwrap();
        assert_eq!(frame.payload, &[1, 2, 0, 0]);
    }

    #[test]
    fn test_write_to_matches_encode() {
        let frame = Frame::new(0x13, 9, &[0x18, 0xFC]).unwrap();
        let mut sink = Sink { bytes: Vec::new() };
        frame.write_to(&mut sink).unwrap();
        assert_eq!(sink.bytes, frame.encode_to_vec::<32>().unwrap());
    }

    proptest! {
        #[test]
        fn prop_decode_then_encode_reproduces_bytes(
            command in any::<u8>(),
            sequence in any::<u16>(),
            payload in proptest::collection::vec(any::<u8>(), 0..200),
        ) {
            let encoded = Frame::new(command, sequence, &payload).unwrap().encode_to_vec::<256>().unwrap();
            let (frame, consumed) = decode(&encoded).unwrap();
            prop_assert_eq!(consumed, encoded.len());
            let reencoded = frame.encode_to_vec::<256>().unwrap();
            prop_assert_eq!(reencoded, encoded);
        }

        #[test]
        fn prop_single_byte_corruption_is_rejected(
            payload in proptest::collection::vec(any::<u8>(), 0..64),
            position in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let mut encoded = Frame::new(0x40, 1, &payload).unwrap().encode_to_vec::<128>().unwrap();
            let idx = position.index(encoded.len());
            // A corrupted LENGTH moves the CRC window instead of failing it
            prop_assume!(idx != 6 && idx != 7);
            encoded[idx] ^= flip;
            prop_assert!(decode(&encoded).is_err());
        }
    }
}
