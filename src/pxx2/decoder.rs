//! # PXX2 Frame Decoder
//!
//! Validates finished PXX2 frames and unpacks channel data. Used to inspect
//! outgoing traffic (frame capture, tests), not to parse telemetry.

use super::channels::unpack_channel_pair;
use super::crc::pxx2_crc;
use super::protocol::*;
use crate::error::{Pxx2Error, Result};

/// A validated PXX2 frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pxx2Frame {
    pub type_c: u8,
    pub type_id: u8,
    /// Bytes between the frame type and the checksum
    pub payload: Vec<u8>,
}

impl Pxx2Frame {
    /// True for a module channels frame
    pub fn is_channels(&self) -> bool {
        self.type_c == PXX2_TYPE_C_MODULE && self.type_id == PXX2_TYPE_ID_CHANNELS
    }
}

/// Decoded channels frame payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelsPayload {
    pub flag0: u8,
    pub flag1: u8,
    /// Packed 12-bit values, 8, 16 or 24 of them
    pub channels: Vec<u16>,
}

impl ChannelsPayload {
    /// True when this frame carries failsafe values
    pub fn is_failsafe(&self) -> bool {
        self.flag0 & PXX2_CHANNELS_FLAG0_FAILSAFE != 0
    }

    /// True when the module is asked to run a range check
    pub fn is_range_check(&self) -> bool {
        self.flag0 & PXX2_CHANNELS_FLAG0_RANGECHECK != 0
    }

    /// Model id carried in the low bits of flag0
    pub fn model_id(&self) -> u8 {
        self.flag0 & PXX2_CHANNELS_FLAG0_MODEL_ID_MASK
    }
}

/// Decode a complete PXX2 frame
///
/// # Arguments
///
/// * `frame` - Complete frame bytes (sync, length, type, payload, checksum)
///
/// # Errors
///
/// Returns error if:
/// - Frame is too short
/// - Sync byte is incorrect
/// - Length field does not match the frame size
/// - Checksum check fails
pub fn decode_frame(frame: &[u8]) -> Result<Pxx2Frame> {
    // sync(1) + length(1) + type(2) + crc(2)
    if frame.len() < 6 {
        return Err(Pxx2Error::Protocol("Frame too short".to_string()));
    }

    if frame[0] != PXX2_SYNC_BYTE {
        return Err(Pxx2Error::Protocol(format!(
            "Invalid sync byte: 0x{:02X}",
            frame[0]
        )));
    }

    let length = frame[1] as usize;
    if length < 2 {
        return Err(Pxx2Error::Protocol(format!("Invalid length: {}", length)));
    }

    let expected = PXX2_HEAD_SIZE + length + PXX2_CRC_SIZE;
    if frame.len() != expected {
        return Err(Pxx2Error::Protocol(format!(
            "Frame size mismatch: expected {} bytes, got {}",
            expected,
            frame.len()
        )));
    }

    let body = &frame[PXX2_HEAD_SIZE..PXX2_HEAD_SIZE + length];
    let received = u16::from_be_bytes([frame[expected - 2], frame[expected - 1]]);
    let calculated = pxx2_crc(body);
    if calculated != received {
        return Err(Pxx2Error::Protocol(format!(
            "Checksum mismatch: expected 0x{:04X}, got 0x{:04X}",
            calculated, received
        )));
    }

    Ok(Pxx2Frame {
        type_c: body[0],
        type_id: body[1],
        payload: body[2..].to_vec(),
    })
}

/// Decode the payload of a channels frame
///
/// # Errors
///
/// Returns error if the payload is not two flag bytes followed by one to
/// three 12-byte channel groups
pub fn decode_channels(payload: &[u8]) -> Result<ChannelsPayload> {
    let groups = payload.len().saturating_sub(2) / PXX2_CHANNEL_GROUP_SIZE;
    if payload.len() < 2
        || (payload.len() - 2) % PXX2_CHANNEL_GROUP_SIZE != 0
        || !(1..=3).contains(&groups)
    {
        return Err(Pxx2Error::Protocol(format!(
            "Invalid channels payload size: {} bytes",
            payload.len()
        )));
    }

    let channels = payload[2..]
        .chunks_exact(3)
        .flat_map(|chunk| {
            let (low, high) = unpack_channel_pair([chunk[0], chunk[1], chunk[2]]);
            [low, high]
        })
        .collect();

    Ok(ChannelsPayload {
        flag0: payload[0],
        flag1: payload[1],
        channels,
    })
}
