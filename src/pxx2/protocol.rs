//! # PXX2 Protocol Constants and Types
//!
//! Core protocol definitions for PXX2 module communication.

/// PXX2 frame sync byte (always 0x7E)
pub const PXX2_SYNC_BYTE: u8 = 0x7E;

/// Transport buffer capacity for one frame
pub const PXX2_MAX_FRAME_SIZE: usize = 64;

/// Sync byte plus length byte
pub const PXX2_HEAD_SIZE: usize = 2;

/// Two checksum bytes at the end of every frame
pub const PXX2_CRC_SIZE: usize = 2;

/// Module frame category
pub const PXX2_TYPE_C_MODULE: u8 = 0x01;
pub const PXX2_TYPE_ID_REGISTER: u8 = 0x01;
pub const PXX2_TYPE_ID_BIND: u8 = 0x02;
pub const PXX2_TYPE_ID_CHANNELS: u8 = 0x03;
pub const PXX2_TYPE_ID_RX_SETTINGS: u8 = 0x05;
pub const PXX2_TYPE_ID_HW_INFO: u8 = 0x06;
pub const PXX2_TYPE_ID_SHARE: u8 = 0x07;

/// Power meter / spectrum frame category
pub const PXX2_TYPE_C_POWER_METER: u8 = 0x02;
pub const PXX2_TYPE_ID_SPECTRUM: u8 = 0x02;

/// Channels frame FLAG0 bits (low 6 bits carry the model id)
pub const PXX2_CHANNELS_FLAG0_MODEL_ID_MASK: u8 = 0x3F;
pub const PXX2_CHANNELS_FLAG0_FAILSAFE: u8 = 1 << 6;
pub const PXX2_CHANNELS_FLAG0_RANGECHECK: u8 = 1 << 7;

/// Receiver settings FLAG0 / FLAG1 bits
pub const PXX2_RX_SETTINGS_FLAG0_WRITE: u8 = 1 << 6;
pub const PXX2_RX_SETTINGS_FLAG1_TELEMETRY_DISABLED: u8 = 1 << 7;
pub const PXX2_RX_SETTINGS_FLAG1_FASTPWM: u8 = 1 << 4;

/// Receiver name length on the wire
pub const PXX2_LEN_RX_NAME: usize = 8;

/// Model registration id length on the wire
pub const PXX2_LEN_REGISTRATION_ID: usize = 8;

/// Receivers addressable behind one module
pub const PXX2_MAX_RECEIVERS_PER_MODULE: i8 = 3;

/// Channels carried by one packed group
pub const PXX2_CHANNELS_PER_GROUP: usize = 8;

/// Bytes produced by one packed group (8 × 12 bits)
pub const PXX2_CHANNEL_GROUP_SIZE: usize = 12;

/// Sendable channel count range
pub const PXX2_MIN_CHANNELS: u8 = 8;
pub const PXX2_MAX_CHANNELS: u8 = 24;

/// Packed channel value range (12-bit)
pub const PXX2_CHANNEL_VALUE_MIN: u16 = 1;
pub const PXX2_CHANNEL_VALUE_MAX: u16 = 2046;
pub const PXX2_CHANNEL_VALUE_CENTER: u16 = 1024;

/// Packed value meaning "receiver holds last position"
pub const PXX2_CHANNEL_HOLD: u16 = 2047;

/// Packed value meaning "receiver outputs no pulses"
pub const PXX2_CHANNEL_NO_PULSES: u16 = 0;

/// Global PPM center in microseconds
pub const PPM_CENTER: i32 = 1500;

/// Cycles to wait between two hardware info queries
pub const HARDWARE_INFO_QUERY_INTERVAL: u8 = 20;

/// Receiver settings retry delay in 10ms ticks (2s)
pub const RECEIVER_SETTINGS_RETRY_TICKS: u32 = 200;

/// Periodic counter reload value
pub const PERIODIC_COUNTER_RELOAD: u16 = 1000;

/// Counter value that keeps the spectrum analyser locked out
pub const SPECTRUM_COUNTER_LOCK: u16 = 1002;

/// Spectrum analyser scan parameters
pub const SPECTRUM_CENTER_FREQUENCY_HZ: u32 = 2_440_000_000;
pub const SPECTRUM_SPAN_HZ: u32 = 40_000_000;
pub const SPECTRUM_STEP_HZ: u32 = 100_000;

/// Administrative / data mode a module is currently driven in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleMode {
    #[default]
    Normal,
    RangeCheck,
    GetHardwareInfo,
    Register,
    Bind,
    ReceiverSettings,
    SpectrumAnalyser,
    Share,
}

/// Registration handshake progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegisterStep {
    #[default]
    Start,
    RxNameReceived,
    RxNameSelected,
    Ok,
}

/// Bind handshake progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindStep {
    #[default]
    Start,
    RxNameReceived,
    RxNameSelected,
    Wait,
    Ok,
}

/// Direction of a receiver settings exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingsAccess {
    #[default]
    Read,
    Write,
}

/// Fixed-width receiver name as carried on the wire
pub type RxName = [u8; PXX2_LEN_RX_NAME];

/// Fixed-width model registration id as carried on the wire
pub type RegistrationId = [u8; PXX2_LEN_REGISTRATION_ID];

/// Build a zero-padded wire name from a string
///
/// Names longer than the wire field are truncated.
pub fn rx_name(name: &str) -> RxName {
    let mut out = [0u8; PXX2_LEN_RX_NAME];
    for (slot, byte) in out.iter_mut().zip(name.bytes()) {
        *slot = byte;
    }
    out
}
