use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::ReplayError;
use crate::models::export_result::ExportMetadata;

/// Sidecar path for an export: `{file}.metadata.json`.
pub fn metadata_path(export_path: &Path) -> PathBuf {
    let mut name = export_path.as_os_str().to_owned();
    name.push(".metadata.json");
    PathBuf::from(name)
}

/// Write export metadata as a JSON sidecar file next to the export.
pub fn write_metadata(metadata: &ExportMetadata, export_path: &Path) -> Result<PathBuf, ReplayError> {
    let path = metadata_path(export_path);
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| ReplayError::ExportWriteError(format!("failed to serialize metadata: {}", e)))?;
    fs::write(&path, json)
        .map_err(|e| ReplayError::ExportWriteError(format!("failed to write metadata: {}", e)))?;
    Ok(path)
}

/// Read export metadata from a JSON sidecar file.
pub fn read_metadata(export_path: &Path) -> Result<ExportMetadata, ReplayError> {
    let path = metadata_path(export_path);
    let json = fs::read_to_string(&path)
        .map_err(|e| ReplayError::ExportWriteError(format!("failed to read metadata: {}", e)))?;
    let metadata: ExportMetadata = serde_json::from_str(&json)
        .map_err(|e| ReplayError::ExportWriteError(format!("failed to parse metadata: {}", e)))?;
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format::OutputEncoding;

    #[test]
    fn sidecar_keeps_the_export_extension() {
        let path = Path::new("/tmp/replay-2024-01-02-03_04_05.wav");
        assert_eq!(
            metadata_path(path),
            PathBuf::from("/tmp/replay-2024-01-02-03_04_05.wav.metadata.json")
        );
    }

    #[test]
    fn metadata_survives_a_write_and_read() {
        let export = std::env::temp_dir().join(format!("replay_metadata_{}.wav", std::process::id()));
        let metadata = ExportMetadata {
            file_path: export.to_string_lossy().into_owned(),
            created_at: "2024-01-02T03:04:05+00:00".into(),
            duration_secs: 30.0,
            frame_count: 1_440_000,
            sample_rate: 48000,
            channels: 2,
            capture_format: "float32le".into(),
            encoding: OutputEncoding::Pcm24,
            checksum: "ab".repeat(32),
        };

        let written = write_metadata(&metadata, &export).unwrap();
        let json = fs::read_to_string(&written).unwrap();
        assert!(json.contains("\"encoding\": \"pcm24\""));

        assert_eq!(read_metadata(&export).unwrap(), metadata);
        fs::remove_file(&written).ok();
    }
}
