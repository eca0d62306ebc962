//! # Frame Capture Module
//!
//! Records outgoing PXX2 frames to JSONL files with rotation.
//!
//! This module handles:
//! - Formatting each frame as one JSON line (timestamp, module, mode, hex bytes)
//! - Decoding channel values of channels frames for easier inspection
//! - Rotating files after N records
//! - Retaining only the last M files

use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::CaptureConfig;
use crate::error::Result;
use crate::pxx2::decoder::{decode_channels, decode_frame};
use crate::pxx2::protocol::ModuleMode;

const FILE_PREFIX: &str = "frames_";
const FILE_EXTENSION: &str = "jsonl";

/// One captured frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureRecord {
    /// RFC 3339 UTC timestamp
    pub timestamp: String,
    pub module: usize,
    pub mode: ModuleMode,
    /// Frame bytes as uppercase hex
    pub frame: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<u16>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failsafe: Option<bool>,
}

impl CaptureRecord {
    /// Build a record for a frame sent now
    pub fn new(module: usize, mode: ModuleMode, frame: &[u8]) -> Self {
        let decoded = decode_frame(frame)
            .ok()
            .filter(|f| f.is_channels())
            .and_then(|f| decode_channels(&f.payload).ok());

        Self {
            timestamp: Utc::now().to_rfc3339(),
            module,
            mode,
            frame: to_hex(frame),
            failsafe: decoded.as_ref().map(|c| c.is_failsafe()),
            channels: decoded.map(|c| c.channels),
        }
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

/// Rotating JSONL writer for captured frames
#[derive(Debug)]
pub struct FrameRecorder {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    /// Files opened by this recorder, used to keep names unique
    file_sequence: u32,
}

impl FrameRecorder {
    /// Create a recorder writing into `dir`, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Pxx2Error::Io`] if the directory cannot be created
    pub fn new<P: AsRef<Path>>(dir: P, max_records_per_file: usize, max_files_to_keep: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!("Capturing frames to {}", dir.display());

        Ok(Self {
            dir,
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            writer: None,
            records_in_file: 0,
            file_sequence: 0,
        })
    }

    /// Create a recorder from the `[capture]` table
    pub fn from_config(config: &CaptureConfig) -> Result<Self> {
        Self::new(&config.dir, config.max_records_per_file, config.max_files_to_keep)
    }

    /// Append one frame
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the file write fails
    pub fn record(&mut self, module: usize, mode: ModuleMode, frame: &[u8]) -> Result<()> {
        self.write_record(&CaptureRecord::new(module, mode, frame))
    }

    /// Append a prepared record
    pub fn write_record(&mut self, record: &CaptureRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let line = serde_json::to_string(record)?;
        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", line)?;
            writer.flush()?;
        }
        self.records_in_file += 1;
        Ok(())
    }

    /// Directory the capture files are written to
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let name = format!(
            "{}{}_{:04}.{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.file_sequence,
            FILE_EXTENSION
        );
        self.file_sequence = self.file_sequence.wrapping_add(1);

        let path = self.dir.join(name);
        debug!("Opening capture file {}", path.display());
        self.writer = Some(BufWriter::new(File::create(&path)?));
        self.records_in_file = 0;

        self.prune_old_files()
    }

    fn prune_old_files(&self) -> Result<()> {
        let mut files = capture_files(&self.dir)?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove old capture file {}: {}", path.display(), e);
            } else {
                debug!("Removed old capture file {}", path.display());
            }
        }
        Ok(())
    }
}

/// Capture files in a directory, unsorted
pub fn capture_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_capture = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(FILE_PREFIX))
            && path.extension().and_then(|e| e.to_str()) == Some(FILE_EXTENSION);
        if is_capture {
            files.push(path);
        }
    }
    Ok(files)
}
