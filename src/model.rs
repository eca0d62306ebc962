//! # Model Settings
//!
//! Per-model data the frame generator reads each cycle: identity, failsafe
//! configuration, per-channel PPM centers and the channel window each module
//! transmits.
//!
//! The generator never writes to these; they come from the `[model]` table
//! of the configuration file.

use serde::Deserialize;

use crate::error::{Pxx2Error, Result};
use crate::pxx2::protocol::{RegistrationId, PPM_CENTER, PXX2_LEN_REGISTRATION_ID};

/// What the receiver should do when the link is lost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailsafeMode {
    /// No failsafe configured, no failsafe frames are sent
    #[default]
    NotSet,
    /// Every channel holds its last position
    Hold,
    /// Per-channel values from the failsafe table
    Custom,
    /// Every channel stops outputting pulses
    NoPulses,
    /// Failsafe is stored on the receiver itself
    Receiver,
}

/// Failsafe entry for a single channel in `Custom` mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailsafeChannel {
    /// Output value in the same units as channel outputs
    Value(i16),
    /// Hold this channel's last position
    Hold,
    /// Stop pulses on this channel
    NoPulse,
}

impl Default for FailsafeChannel {
    fn default() -> Self {
        FailsafeChannel::Value(0)
    }
}

/// Per-module settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModuleData {
    /// Receiver number this model binds as
    #[serde(default)]
    pub model_id: u8,

    #[serde(default)]
    pub failsafe_mode: FailsafeMode,

    /// First logical channel sent by this module
    #[serde(default)]
    pub channels_start: u8,

    /// Number of channels sent by this module (8..=24)
    #[serde(default = "default_channels_count")]
    pub channels_count: u8,
}

fn default_channels_count() -> u8 { 16 }

impl Default for ModuleData {
    fn default() -> Self {
        Self {
            model_id: 0,
            failsafe_mode: FailsafeMode::NotSet,
            channels_start: 0,
            channels_count: default_channels_count(),
        }
    }
}

impl ModuleData {
    /// True when the module should periodically send failsafe frames
    pub fn failsafe_configured(&self) -> bool {
        !matches!(self.failsafe_mode, FailsafeMode::NotSet | FailsafeMode::Receiver)
    }
}

/// Model-wide settings shared by every module
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ModelSettings {
    /// Registration id (up to 8 ASCII characters)
    #[serde(default)]
    pub registration_id: String,

    /// Failsafe table used in `Custom` mode, indexed by logical channel
    #[serde(default)]
    pub failsafe_channels: Vec<FailsafeChannel>,

    /// PPM center offset in microseconds, indexed by logical channel
    #[serde(default)]
    pub ppm_center: Vec<i16>,

    /// RF modules driven by this model
    #[serde(default)]
    pub modules: Vec<ModuleData>,
}

impl ModelSettings {
    /// Settings for one module
    ///
    /// # Errors
    ///
    /// Returns [`Pxx2Error::UnknownModule`] if the index is out of range
    pub fn module(&self, index: usize) -> Result<&ModuleData> {
        self.modules.get(index).ok_or(Pxx2Error::UnknownModule(index))
    }

    /// Configured center of a channel in microseconds
    pub fn channel_center(&self, channel: usize) -> i32 {
        PPM_CENTER + self.ppm_center.get(channel).copied().unwrap_or(0) as i32
    }

    /// Failsafe entry of a channel; missing entries read as value 0
    pub fn failsafe_channel(&self, channel: usize) -> FailsafeChannel {
        self.failsafe_channels.get(channel).copied().unwrap_or_default()
    }

    /// Registration id as sent on the wire, zero padded
    pub fn registration_id_bytes(&self) -> RegistrationId {
        let mut out = [0u8; PXX2_LEN_REGISTRATION_ID];
        for (slot, byte) in out.iter_mut().zip(self.registration_id.bytes()) {
            *slot = byte;
        }
        out
    }
}
