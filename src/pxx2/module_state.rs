//! # Module State
//!
//! Everything the frame generator keeps per RF module between cycles.
//!
//! [`ModuleSettings`] holds the active mode and the periodic counter. The
//! administrative scratch data lives in [`AdminState`], a tagged variant:
//! each administrative mode owns its own struct, and asking for one mode's
//! scratch while another is installed replaces it with a fresh default. A
//! value written for bind can therefore never be read back as a hardware
//! info step.

use tracing::debug;

use super::counter::PeriodicCounter;
use super::protocol::{
    BindStep, ModuleMode, RegisterStep, RxName, SettingsAccess, PXX2_MAX_CHANNELS,
};

/// Persistent per-module settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSettings {
    pub mode: ModuleMode,
    pub counter: PeriodicCounter,
}

/// Hardware discovery progress
///
/// Step -1 queries the module itself, steps 0..3 its receivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareInfoState {
    pub step: i8,
    /// Cycles left before the next query
    pub timeout: u8,
}

impl Default for HardwareInfoState {
    fn default() -> Self {
        Self { step: -1, timeout: 0 }
    }
}

/// Receiver registration handshake
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterState {
    pub step: RegisterStep,
    /// Receiver chosen by the user
    pub rx_name: RxName,
    /// Module slot the receiver is registered to
    pub module_index: u8,
}

/// Receiver bind handshake
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindState {
    pub step: BindStep,
    /// Tick after which a waiting bind is considered complete
    pub wait_timeout: u32,
    /// Receivers that answered the bind broadcast
    pub candidates: Vec<RxName>,
    pub selected: usize,
    /// Receiver slot the selected receiver is bound into
    pub receiver_id: u8,
}

impl BindState {
    /// Name of the receiver the user picked, if it is still in the list
    pub fn selected_name(&self) -> Option<&RxName> {
        self.candidates.get(self.selected)
    }
}

/// Receiver settings read / write exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverSettingsState {
    pub receiver_id: u8,
    pub access: SettingsAccess,
    /// Tick after which the next request may be sent
    pub timeout: u32,
    /// Output mapping, one byte per sent channel
    pub channel_mapping: [u8; PXX2_MAX_CHANNELS as usize],
    pub telemetry_disabled: bool,
    pub fast_pwm: bool,
}

impl Default for ReceiverSettingsState {
    fn default() -> Self {
        let mut channel_mapping = [0u8; PXX2_MAX_CHANNELS as usize];
        for (index, slot) in channel_mapping.iter_mut().enumerate() {
            *slot = index as u8;
        }
        Self {
            receiver_id: 0,
            access: SettingsAccess::Read,
            timeout: 0,
            channel_mapping,
            telemetry_disabled: false,
            fast_pwm: false,
        }
    }
}

/// Receiver share target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShareState {
    pub receiver_id: u8,
}

/// Administrative scratch data, tagged by the mode that owns it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AdminState {
    #[default]
    Idle,
    HardwareInfo(HardwareInfoState),
    Register(RegisterState),
    Bind(BindState),
    ReceiverSettings(ReceiverSettingsState),
    Share(ShareState),
}

impl AdminState {
    /// Fresh scratch data for a mode
    pub fn for_mode(mode: ModuleMode) -> Self {
        match mode {
            ModuleMode::GetHardwareInfo => AdminState::HardwareInfo(HardwareInfoState::default()),
            ModuleMode::Register => AdminState::Register(RegisterState::default()),
            ModuleMode::Bind => AdminState::Bind(BindState::default()),
            ModuleMode::ReceiverSettings => {
                AdminState::ReceiverSettings(ReceiverSettingsState::default())
            }
            ModuleMode::Share => AdminState::Share(ShareState::default()),
            ModuleMode::Normal | ModuleMode::RangeCheck | ModuleMode::SpectrumAnalyser => {
                AdminState::Idle
            }
        }
    }
}

/// Generate a mutable accessor that installs the variant on demand
macro_rules! admin_accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&mut self) -> &mut $ty {
            if !matches!(self.admin, AdminState::$variant(_)) {
                self.admin = AdminState::$variant(<$ty>::default());
            }
            match &mut self.admin {
                AdminState::$variant(state) => state,
                _ => unreachable!("variant installed above"),
            }
        }
    };
}

/// Generate a read-only accessor
macro_rules! admin_getter {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&self) -> Option<&$ty> {
            match &self.admin {
                AdminState::$variant(state) => Some(state),
                _ => None,
            }
        }
    };
}

/// Full per-module state table entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleState {
    pub settings: ModuleSettings,
    pub admin: AdminState,
}

impl ModuleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode
    pub fn mode(&self) -> ModuleMode {
        self.settings.mode
    }

    /// Switch mode on an external request
    ///
    /// Administrative modes start from fresh scratch data. Normal, range
    /// check and spectrum modes leave the previous scratch data in place so
    /// the outcome of the last handshake stays readable.
    pub fn enter_mode(&mut self, mode: ModuleMode) {
        debug!("Module mode {:?} -> {:?}", self.settings.mode, mode);
        self.settings.mode = mode;
        let admin = AdminState::for_mode(mode);
        if admin != AdminState::Idle {
            self.admin = admin;
        }
    }

    /// Return to normal channel output
    pub fn reset_to_normal(&mut self) {
        self.settings.mode = ModuleMode::Normal;
    }

    admin_accessor!(hardware_info_mut, HardwareInfo, HardwareInfoState);
    admin_accessor!(register_mut, Register, RegisterState);
    admin_accessor!(bind_mut, Bind, BindState);
    admin_accessor!(receiver_settings_mut, ReceiverSettings, ReceiverSettingsState);
    admin_accessor!(share_mut, Share, ShareState);

    admin_getter!(hardware_info, HardwareInfo, HardwareInfoState);
    admin_getter!(register, Register, RegisterState);
    admin_getter!(bind, Bind, BindState);
    admin_getter!(receiver_settings, ReceiverSettings, ReceiverSettingsState);
    admin_getter!(share, Share, ShareState);
}
