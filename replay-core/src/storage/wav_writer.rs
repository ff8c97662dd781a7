use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::ReplayError;
use crate::processing::sample_codec::SampleBuffer;
use crate::processing::wav_format;
use crate::traits::audio_file_writer::{AudioFileWriter, OutputSpec, WrittenFile};

/// Streaming WAV file writer.
///
/// ## File Format
///
/// ```text
/// [44-byte WAV header]
/// [interleaved little-endian sample data...]
/// ```
///
/// The header is written with a zero data size on open and patched on close,
/// so a file cut short by a crash still parses as a (truncated) WAV.
pub struct WavFileWriter {
    file_path: PathBuf,
    spec: OutputSpec,
    file: Option<BufWriter<File>>,
    total_bytes_written: u64,
}

impl WavFileWriter {
    /// Create the file and write the initial header.
    ///
    /// Fails if `file_path` already exists.
    pub fn create(file_path: PathBuf, spec: OutputSpec) -> Result<Self, ReplayError> {
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ReplayError::ExportWriteError(format!("failed to create directory: {}", e))
            })?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file_path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => ReplayError::ExportWriteError(format!(
                    "refusing to overwrite {}",
                    file_path.display()
                )),
                _ => ReplayError::ExportWriteError(format!("failed to create file: {}", e)),
            })?;

        let mut writer = Self {
            file_path,
            spec,
            file: Some(BufWriter::new(file)),
            total_bytes_written: 0,
        };

        let header = wav_format::generate_wav_header(spec.encoding, spec.sample_rate, spec.channels, 0);
        writer.write_raw(&header)?;
        Ok(writer)
    }

    /// Append encoded sample data.
    pub fn write(&mut self, data: &[u8]) -> Result<(), ReplayError> {
        let data_size = self.data_bytes() + data.len() as u64;
        if data_size > wav_format::MAX_DATA_SIZE {
            return Err(ReplayError::ExportWriteError(format!(
                "{} bytes of sample data exceed the WAV size limit",
                data_size
            )));
        }
        self.write_raw(data)
    }

    /// Finalize the file: patch the header sizes, compute the SHA-256
    /// checksum, and report how many whole frames were written.
    pub fn close(mut self) -> Result<WrittenFile, ReplayError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| ReplayError::ExportWriteError("file is not open".into()))?;

        let data_size = self.data_bytes();
        let mut header = wav_format::generate_wav_header(
            self.spec.encoding,
            self.spec.sample_rate,
            self.spec.channels,
            0,
        );
        wav_format::patch_data_size(&mut header, data_size);
        wav_format::patch_file_size(&mut header, self.total_bytes_written);

        let io_err = |e: std::io::Error| ReplayError::ExportWriteError(e.to_string());
        file.seek(SeekFrom::Start(0)).map_err(io_err)?;
        file.write_all(&header).map_err(io_err)?;
        file.flush().map_err(io_err)?;
        file.get_ref().sync_all().map_err(io_err)?;
        drop(file);

        let checksum = sha256_file(&self.file_path)?;
        let frame_count = match self.spec.bytes_per_frame() {
            0 => 0,
            bpf => (data_size / bpf as u64) as usize,
        };
        Ok(WrittenFile { frame_count, checksum })
    }

    /// Total bytes written so far (including WAV header).
    pub fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    /// Path of the output file.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn data_bytes(&self) -> u64 {
        self.total_bytes_written
            .saturating_sub(wav_format::WAV_HEADER_SIZE as u64)
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), ReplayError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| ReplayError::ExportWriteError("file is not open".into()))?;
        file.write_all(data)
            .map_err(|e| ReplayError::ExportWriteError(format!("write failed: {}", e)))?;
        self.total_bytes_written += data.len() as u64;
        Ok(())
    }
}

/// Writes snapshots as RIFF WAV files.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavOutput;

impl AudioFileWriter for WavOutput {
    fn extension(&self) -> &str {
        "wav"
    }

    fn write_file(
        &self,
        path: &Path,
        spec: &OutputSpec,
        samples: &SampleBuffer,
    ) -> Result<WrittenFile, ReplayError> {
        let mut writer = WavFileWriter::create(path.to_path_buf(), *spec)?;
        let data = samples.encode(spec.encoding);
        if let Err(e) = writer.write(&data) {
            drop(writer);
            // Leave no half-written export behind.
            fs::remove_file(path).ok();
            return Err(e);
        }
        writer.close()
    }
}

/// Compute SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, ReplayError> {
    let data = fs::read(path).map_err(|e| {
        ReplayError::ExportWriteError(format!("failed to read file for checksum: {}", e))
    })?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
