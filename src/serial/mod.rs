//! # Serial Communication Module
//!
//! Handles the byte transport to an external PXX2 RF module.
//!
//! This module handles:
//! - Opening the module port (450,000 baud, 8N1)
//! - Auto-detecting the port from a list of candidates
//! - Async frame writes

pub mod port_trait;

use async_trait::async_trait;
use std::io;
use tokio::io::AsyncWriteExt;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::error::{Pxx2Error, Result};
pub use port_trait::SerialPortIO;

/// PXX2 module baud rate
pub const PXX2_BAUD_RATE: u32 = 450_000;

/// Default module device paths to try (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters
    "/dev/ttyACM0", // USB CDC devices
];

/// RF module serial port
pub struct ModuleSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
}

impl std::fmt::Debug for ModuleSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl ModuleSerial {
    /// Open the first module port that responds
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
    /// * `baud_rate` - Line speed
    ///
    /// # Errors
    ///
    /// Returns [`Pxx2Error::SerialPortNotFound`] if none of the paths opens
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pxx2_link::serial::{ModuleSerial, DEFAULT_DEVICE_PATHS, PXX2_BAUD_RATE};
    ///
    /// let serial = ModuleSerial::open_with_paths(DEFAULT_DEVICE_PATHS, PXX2_BAUD_RATE)?;
    /// println!("Connected to: {}", serial.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened RF module port at {} ({} baud)", path, baud_rate);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(Pxx2Error::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with PXX2 line settings
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| Pxx2Error::Serial(format!("Failed to open {}: {}", path, e)))
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[async_trait]
impl SerialPortIO for ModuleSerial {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        AsyncWriteExt::write_all(&mut self.port, data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        AsyncWriteExt::flush(&mut self.port).await
    }
}

/// Write one frame and flush it out
///
/// # Errors
///
/// Returns [`Pxx2Error::Serial`] if the write or flush fails
pub async fn send_frame<P: SerialPortIO + ?Sized>(port: &mut P, frame: &[u8]) -> Result<()> {
    port.write_all(frame)
        .await
        .map_err(|e| Pxx2Error::Serial(format!("Failed to write frame: {}", e)))?;

    port.flush()
        .await
        .map_err(|e| Pxx2Error::Serial(format!("Failed to flush serial port: {}", e)))?;

    debug!("Sent PXX2 frame ({} bytes)", frame.len());
    Ok(())
}
