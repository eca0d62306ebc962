//! # Error Types
//!
//! Custom error types for PXX2 Link using `thiserror`.

use thiserror::Error;

/// Main error type for PXX2 Link
#[derive(Debug, Error)]
pub enum Pxx2Error {
    /// PXX2 protocol errors (malformed frames, bad checksum)
    #[error("PXX2 protocol error: {0}")]
    Protocol(String),

    /// A frame tried to grow past the transport buffer
    #[error("Frame overflow: capacity is {capacity} bytes")]
    FrameOverflow { capacity: usize },

    /// Module index not present in the module table
    #[error("Unknown module index: {0}")]
    UnknownModule(usize),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// Number of module ports does not match the module table
    #[error("{ports} serial port(s) given for {modules} module(s)")]
    PortCount { modules: usize, ports: usize },

    /// No module port could be opened
    #[error("No RF module found at: {0}")]
    SerialPortNotFound(String),

    /// Frame capture serialization errors
    #[error("Capture error: {0}")]
    Capture(#[from] serde_json::Error),
}

/// Result type alias for PXX2 Link
pub type Result<T> = std::result::Result<T, Pxx2Error>;
