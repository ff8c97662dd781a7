use std::path::Path;

use crate::models::error::ReplayError;
use crate::models::format::OutputEncoding;
use crate::processing::sample_codec::SampleBuffer;

/// Parameters of a file to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub encoding: OutputEncoding,
}

impl OutputSpec {
    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * self.encoding.bytes_per_sample()
    }
}

/// What a finished write produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    /// Complete frames that reached the file.
    pub frame_count: usize,
    /// SHA-256 hex digest of the whole file.
    pub checksum: String,
}

/// Sink for exported snapshots.
///
/// Writers must never overwrite an existing file; a path that already exists
/// is an error.
pub trait AudioFileWriter: Send + Sync {
    /// Extension used for new file names, without the dot.
    fn extension(&self) -> &str;

    /// Write `samples` (interleaved) to a new file at `path`.
    fn write_file(
        &self,
        path: &Path,
        spec: &OutputSpec,
        samples: &SampleBuffer,
    ) -> Result<WrittenFile, ReplayError>;
}
