//! # PXX2 Link Library
//!
//! Frame generation for radio-control transmitters driving PXX2 RF modules.
//!
//! This library builds the byte frame sent to each RF module every cycle:
//! channel data with periodic failsafe values, interleaved on request with
//! administrative frames (hardware discovery, receiver registration and
//! binding, receiver settings, spectrum scans, receiver share).

pub mod capture;
pub mod config;
pub mod error;
pub mod link;
pub mod model;
pub mod pxx2;
pub mod serial;
