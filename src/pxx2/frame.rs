//! # PXX2 Frame Writer
//!
//! Fixed-capacity frame buffer combined with the running checksum.
//!
//! Every frame goes through the same life cycle:
//!
//! ```text
//! open()  -> [7E][LEN?]
//! push_*  -> [7E][LEN?][TYPE_C][TYPE_ID][payload...]   (checksummed)
//! close() -> [7E][LEN][TYPE_C][TYPE_ID][payload...][CRC_HI][CRC_LO]
//! ```
//!
//! A frame with nothing after the head is dropped on `close()` and the
//! buffer is left empty.

use bytes::{BufMut, Bytes, BytesMut};

use super::crc::Pxx2Crc;
use super::protocol::{PXX2_HEAD_SIZE, PXX2_MAX_FRAME_SIZE, PXX2_SYNC_BYTE};
use crate::error::{Pxx2Error, Result};

/// Offset of the length byte inside a frame
const LENGTH_OFFSET: usize = 1;

/// Frame under construction
#[derive(Debug, Clone)]
pub struct FrameWriter {
    buffer: BytesMut,
    crc: Pxx2Crc,
}

impl Default for FrameWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameWriter {
    /// Create an empty writer with a 64-byte buffer
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(PXX2_MAX_FRAME_SIZE),
            crc: Pxx2Crc::new(),
        }
    }

    /// Start a new frame: reset the checksum, clear the buffer, write the head
    pub fn open(&mut self) {
        self.crc.reset();
        self.buffer.clear();
        self.buffer.put_u8(PXX2_SYNC_BYTE);
        // Patched by close()
        self.buffer.put_u8(0x00);
    }

    /// Append one checksummed byte
    ///
    /// # Errors
    ///
    /// Returns [`Pxx2Error::FrameOverflow`] if the buffer is full
    pub fn push_byte(&mut self, byte: u8) -> Result<()> {
        self.push_raw(byte)?;
        self.crc.update(byte);
        Ok(())
    }

    /// Append a 32-bit word, little-endian, checksummed
    pub fn push_word(&mut self, word: u32) -> Result<()> {
        for byte in word.to_le_bytes() {
            self.push_byte(byte)?;
        }
        Ok(())
    }

    /// Append a slice of checksummed bytes
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.push_byte(byte)?;
        }
        Ok(())
    }

    /// Append the frame category and id
    pub fn push_frame_type(&mut self, type_c: u8, type_id: u8) -> Result<()> {
        self.push_byte(type_c)?;
        self.push_byte(type_id)
    }

    /// Finish the frame
    ///
    /// Writes the length byte and appends the checksum, high byte first.
    /// A frame without any byte after its head is discarded and the buffer
    /// is left empty.
    pub fn close(&mut self) -> Result<()> {
        if self.buffer.len() <= PXX2_HEAD_SIZE {
            self.buffer.clear();
            return Ok(());
        }

        let size = self.buffer.len() - PXX2_HEAD_SIZE;
        self.buffer[LENGTH_OFFSET] = size as u8;

        let [crc_hi, crc_lo] = self.crc.value().to_be_bytes();
        self.push_raw(crc_hi)?;
        self.push_raw(crc_lo)
    }

    /// Bytes written so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True when nothing is queued for transmission
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Hand the finished frame over, leaving the writer empty
    pub fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }

    fn push_raw(&mut self, byte: u8) -> Result<()> {
        if self.buffer.len() >= PXX2_MAX_FRAME_SIZE {
            return Err(Pxx2Error::FrameOverflow {
                capacity: PXX2_MAX_FRAME_SIZE,
            });
        }
        self.buffer.put_u8(byte);
        Ok(())
    }
}
