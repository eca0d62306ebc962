//! # PXX2 Channel Encoder
//!
//! Converts logical channel outputs into the packed 12-bit PXX2 format.
//!
//! ## Packing
//!
//! Channels are sent in groups of 8. Each pair of 12-bit values `(a, b)`
//! occupies three bytes:
//!
//! ```text
//! Byte 0: a[0:7]
//! Byte 1: a[8:11] | b[0:3] << 4
//! Byte 2: b[4:11]
//! ```
//!
//! ## Scaling
//!
//! Channel outputs use the transmitter's internal range (±1024 for ±100%,
//! ±1280 for ±125%). After adding twice the channel's PPM center offset they
//! are rescaled with `value * 512 / 682 + 1024` and clamped to `1..=2046`.
//! The two remaining codes are reserved: `0` means no pulses and `2047`
//! means hold.

use super::frame::FrameWriter;
use super::protocol::{
    PPM_CENTER, PXX2_CHANNELS_PER_GROUP, PXX2_CHANNEL_HOLD, PXX2_CHANNEL_NO_PULSES,
    PXX2_CHANNEL_VALUE_CENTER, PXX2_CHANNEL_VALUE_MAX, PXX2_CHANNEL_VALUE_MIN,
};
use crate::error::Result;
use crate::model::{FailsafeChannel, FailsafeMode, ModelSettings, ModuleData};

/// Rescale a recentered channel value to the packed 12-bit range
///
/// Integer division truncates toward zero; the result is clamped to
/// `1..=2046` so it never collides with the hold / no-pulse codes.
///
/// # Examples
///
/// ```
/// use pxx2_link::pxx2::channels::scale_channel_value;
///
/// assert_eq!(scale_channel_value(0), 1024);
/// assert_eq!(scale_channel_value(1024), 1792);
/// assert_eq!(scale_channel_value(-5000), 1);
/// ```
pub fn scale_channel_value(value: i32) -> u16 {
    let scaled = value * 512 / 682 + PXX2_CHANNEL_VALUE_CENTER as i32;
    scaled.clamp(PXX2_CHANNEL_VALUE_MIN as i32, PXX2_CHANNEL_VALUE_MAX as i32) as u16
}

/// Shift a value by the channel's configured center
fn recenter(model: &ModelSettings, channel: usize, value: i32) -> i32 {
    value + 2 * model.channel_center(channel) - 2 * PPM_CENTER
}

/// Packed value for one channel
///
/// # Arguments
///
/// * `model` - Model settings (failsafe table, PPM centers)
/// * `module` - Settings of the module being encoded
/// * `outputs` - Live channel outputs
/// * `send_failsafe` - Substitute failsafe values for live outputs
/// * `channel` - Logical channel index
pub fn channel_pulse_value(
    model: &ModelSettings,
    module: &ModuleData,
    outputs: &[i16],
    send_failsafe: bool,
    channel: usize,
) -> u16 {
    if !send_failsafe {
        let output = outputs.get(channel).copied().unwrap_or(0) as i32;
        return scale_channel_value(recenter(model, channel, output));
    }

    match module.failsafe_mode {
        FailsafeMode::Hold => PXX2_CHANNEL_HOLD,
        FailsafeMode::NoPulses => PXX2_CHANNEL_NO_PULSES,
        _ => match model.failsafe_channel(channel) {
            FailsafeChannel::Hold => PXX2_CHANNEL_HOLD,
            FailsafeChannel::NoPulse => PXX2_CHANNEL_NO_PULSES,
            FailsafeChannel::Value(value) => {
                scale_channel_value(recenter(model, channel, value as i32))
            }
        },
    }
}

/// Pack two 12-bit values into three bytes
pub fn pack_channel_pair(low: u16, high: u16) -> [u8; 3] {
    [
        low as u8,
        ((low >> 8) & 0x0F) as u8 | (high << 4) as u8,
        (high >> 4) as u8,
    ]
}

/// Unpack three bytes into two 12-bit values
pub fn unpack_channel_pair(bytes: [u8; 3]) -> (u16, u16) {
    let low = bytes[0] as u16 | ((bytes[1] as u16 & 0x0F) << 8);
    let high = (bytes[1] as u16 >> 4) | ((bytes[2] as u16) << 4);
    (low, high)
}

/// Encode 8 consecutive channels into a frame
///
/// Writes 12 bytes covering channels `first_channel..first_channel + 8`.
///
/// # Errors
///
/// Returns an error if the frame buffer overflows
pub fn encode_channel_group(
    writer: &mut FrameWriter,
    model: &ModelSettings,
    module: &ModuleData,
    outputs: &[i16],
    send_failsafe: bool,
    first_channel: usize,
) -> Result<()> {
    for pair in 0..PXX2_CHANNELS_PER_GROUP / 2 {
        let channel = first_channel + pair * 2;
        let low = channel_pulse_value(model, module, outputs, send_failsafe, channel);
        let high = channel_pulse_value(model, module, outputs, send_failsafe, channel + 1);
        writer.push_bytes(&pack_channel_pair(low, high))?;
    }
    Ok(())
}
