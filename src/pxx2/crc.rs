//! # PXX2 Checksum
//!
//! 16-bit subtractive checksum used by PXX2 frames.
//!
//! **Initial Value**: 0xFFFF
//! **Update**: `crc = crc - byte` (wrapping)
//!
//! The checksum covers every byte from the frame type onward. Sync, length
//! and the checksum bytes themselves are excluded.

/// Checksum initial value
pub const PXX2_CRC_INIT: u16 = 0xFFFF;

/// Running checksum accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pxx2Crc {
    value: u16,
}

impl Default for Pxx2Crc {
    fn default() -> Self {
        Self::new()
    }
}

impl Pxx2Crc {
    /// Create an accumulator at its initial value
    pub const fn new() -> Self {
        Self { value: PXX2_CRC_INIT }
    }

    /// Restart accumulation for a new frame
    pub fn reset(&mut self) {
        self.value = PXX2_CRC_INIT;
    }

    /// Fold one byte into the checksum
    pub fn update(&mut self, byte: u8) {
        self.value = self.value.wrapping_sub(byte as u16);
    }

    /// Current checksum value
    pub fn value(&self) -> u16 {
        self.value
    }
}

/// Calculate the PXX2 checksum over a byte slice
///
/// # Arguments
///
/// * `data` - Bytes from TYPE_C through the end of the payload
///
/// # Examples
///
/// ```
/// use pxx2_link::pxx2::crc::pxx2_crc;
///
/// assert_eq!(pxx2_crc(&[0x01, 0x03]), 0xFFFB);
/// ```
pub fn pxx2_crc(data: &[u8]) -> u16 {
    let mut crc = Pxx2Crc::new();
    for &byte in data {
        crc.update(byte);
    }
    crc.value()
}
