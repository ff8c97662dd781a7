use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::format::{CaptureFormat, OutputEncoding};

/// Result returned when a snapshot has been written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub file_path: PathBuf,
    pub frame_count: usize,
    pub duration_secs: f64,
    pub capture_format: CaptureFormat,
    pub encoding: OutputEncoding,
    pub checksum: String,
    pub created_at: String,
}

impl ExportedFile {
    pub fn metadata(&self) -> ExportMetadata {
        ExportMetadata {
            file_path: self.file_path.to_string_lossy().into_owned(),
            created_at: self.created_at.clone(),
            duration_secs: self.duration_secs,
            frame_count: self.frame_count as u64,
            sample_rate: self.capture_format.sample_rate,
            channels: self.capture_format.channel_count,
            capture_format: self.capture_format.sample_format.to_string(),
            encoding: self.encoding,
            checksum: self.checksum.clone(),
        }
    }
}

/// Sidecar description of an export, serialized as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub file_path: String,
    pub created_at: String,
    pub duration_secs: f64,
    pub frame_count: u64,
    pub sample_rate: u32,
    pub channels: u16,
    pub capture_format: String,
    pub encoding: OutputEncoding,
    pub checksum: String,
}
