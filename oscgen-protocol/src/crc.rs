//! CRC16/IBM checksum
//!
//! Reflected polynomial 0xA001 (0x8005 bit-reversed), initial value 0xFFFF,
//! no final XOR. Covers every frame byte after the sync marker.

/// Reflected CRC16/IBM polynomial
pub const CRC16_POLY: u16 = 0xA001;

/// CRC register value before the first byte
pub const CRC16_INIT: u16 = 0xFFFF;

/// Byte-at-a-time lookup table, built at compile time
static CRC16_TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC16_POLY;
            } else {
                crc >>= 1;
            }
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Incremental CRC16/IBM calculator
///
/// Lets a frame be checksummed while it is being written out in pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc16 {
    state: u16,
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc16 {
    /// Start a new checksum
    pub const fn new() -> Self {
        Self { state: CRC16_INIT }
    }

    /// Feed more bytes
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            let idx = ((self.state ^ byte as u16) & 0xFF) as usize;
            self.state = (self.state >> 8) ^ CRC16_TABLE[idx];
        }
    }

    /// Current checksum value
    pub const fn finish(&self) -> u16 {
        self.state
    }
}

/// One-shot CRC16/IBM over a byte slice
pub fn crc16_ibm(data: &[u8]) -> u16 {
    let mut crc = Crc16::new();
    crc.update(data);
    crc.finish()
}
