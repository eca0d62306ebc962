//! # PXX2 Protocol Module
//!
//! Frame generation for the PXX2 RF module protocol.
//!
//! This module handles:
//! - Channel encoding (up to 24 channels, packed 12-bit values)
//! - Failsafe substitution on the periodic failsafe cycle
//! - Administrative frames (hardware info, register, bind, receiver
//!   settings, spectrum analyser, share)
//! - 16-bit subtractive checksum and frame length framing

pub mod protocol;
pub mod crc;
pub mod frame;
pub mod channels;
pub mod counter;
pub mod module_state;
pub mod notify;
pub mod pulses;
pub mod decoder;

pub use module_state::ModuleState;
pub use notify::{LinkEvent, LogNotifier, Notifier};
pub use pulses::{CycleInputs, FrameGenerator};
