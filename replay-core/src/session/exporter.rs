//! Turns the current replay window into a file on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime};

use crate::models::config::ReplayConfiguration;
use crate::models::error::ReplayError;
use crate::models::export_result::ExportedFile;
use crate::models::format::{CaptureFormat, OutputEncoding};
use crate::processing::ring_buffer::WindowReader;
use crate::processing::sample_codec::{self, WriteRepresentation};
use crate::storage::metadata;
use crate::storage::wav_writer::WavOutput;
use crate::traits::audio_file_writer::{AudioFileWriter, OutputSpec};

/// Base file name for a snapshot taken at `timestamp`, e.g.
/// `replay-2024-01-02-03_04_05.wav`.
pub fn snapshot_file_name(timestamp: &NaiveDateTime, extension: &str) -> String {
    format!("replay-{}.{}", timestamp.format("%Y-%m-%d-%H_%M_%S"), extension)
}

/// First path in `dir` for `timestamp` that does not exist yet. Later
/// candidates get a `-2`, `-3`, ... suffix.
pub fn unique_export_path(dir: &Path, timestamp: &NaiveDateTime, extension: &str) -> PathBuf {
    let first = dir.join(snapshot_file_name(timestamp, extension));
    if !first.exists() {
        return first;
    }

    let stem = format!("replay-{}", timestamp.format("%Y-%m-%d-%H_%M_%S"));
    let mut suffix = 2u32;
    loop {
        let candidate = dir.join(format!("{}-{}.{}", stem, suffix, extension));
        if !candidate.exists() {
            return candidate;
        }
        suffix += 1;
    }
}

/// Writes snapshots of the replay window.
///
/// Holds a reader handle onto the ring buffer; exporting never disturbs the
/// producer or the window contents.
pub struct SnapshotExporter {
    reader: WindowReader,
    format: CaptureFormat,
    /// Unsupported sample widths only fail the exports, never the capture.
    representation: Result<WriteRepresentation, ReplayError>,
    encoding: OutputEncoding,
    output_directory: PathBuf,
    write_metadata: bool,
    writer: Arc<dyn AudioFileWriter>,
}

impl SnapshotExporter {
    /// Exporter writing WAV files.
    pub fn new(
        reader: WindowReader,
        format: CaptureFormat,
        config: &ReplayConfiguration,
    ) -> Result<Self, ReplayError> {
        Self::with_writer(reader, format, config, Arc::new(WavOutput))
    }

    pub fn with_writer(
        reader: WindowReader,
        format: CaptureFormat,
        config: &ReplayConfiguration,
        writer: Arc<dyn AudioFileWriter>,
    ) -> Result<Self, ReplayError> {
        if reader.bytes_per_frame() != format.bytes_per_frame() {
            return Err(ReplayError::ConfigurationError(format!(
                "window holds {}-byte frames but the capture format has {}-byte frames",
                reader.bytes_per_frame(),
                format.bytes_per_frame()
            )));
        }

        let representation = WriteRepresentation::select(&format.sample_format);
        let encoding = config.output_encoding;
        if let Err(ref e) = representation {
            log::warn!("Capturing {} but every export will fail: {}", format.sample_format, e);
        } else if encoding.truncates(&format.sample_format) {
            log::warn!(
                "Capturing {} but writing {}; exports lose precision",
                format.sample_format,
                encoding
            );
        }

        Ok(Self {
            reader,
            format,
            representation,
            encoding,
            output_directory: config.output_directory.clone(),
            write_metadata: config.write_metadata,
            writer,
        })
    }

    pub fn format(&self) -> &CaptureFormat {
        &self.format
    }

    pub fn representation(&self) -> Result<WriteRepresentation, ReplayError> {
        self.representation.clone()
    }

    /// Export the current window, named after the local time.
    pub fn export_snapshot(&self) -> Result<ExportedFile, ReplayError> {
        self.export_snapshot_at(Local::now())
    }

    /// Export the current window as if triggered at `at`.
    pub fn export_snapshot_at(&self, at: DateTime<Local>) -> Result<ExportedFile, ReplayError> {
        let representation = self.representation()?;
        let window = self.reader.copy_window()?;
        let frame_count = window.len() / self.format.bytes_per_frame();
        let samples = sample_codec::decode(&window, &self.format.sample_format, representation);
        drop(window);

        let path = unique_export_path(&self.output_directory, &at.naive_local(), self.writer.extension());
        let spec = OutputSpec {
            sample_rate: self.format.sample_rate,
            channels: self.format.channel_count,
            encoding: self.encoding,
        };

        let written = self.writer.write_file(&path, &spec, &samples)?;
        if written.frame_count < frame_count {
            return Err(ReplayError::ExportWriteError(format!(
                "wrote {} of {} frames to {}",
                written.frame_count,
                frame_count,
                path.display()
            )));
        }

        let exported = ExportedFile {
            file_path: path,
            frame_count,
            duration_secs: frame_count as f64 / f64::from(self.format.sample_rate),
            capture_format: self.format,
            encoding: self.encoding,
            checksum: written.checksum,
            created_at: at.to_rfc3339(),
        };

        if self.write_metadata {
            let sidecar = metadata::write_metadata(&exported.metadata(), &exported.file_path)?;
            log::debug!("Wrote metadata to {}", sidecar.display());
        }

        log::info!(
            "Exported {:.1}s ({} frames) to {}",
            exported.duration_secs,
            exported.frame_count,
            exported.file_path.display()
        );
        Ok(exported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use std::fs;

    use crate::models::format::SampleFormat;
    use crate::processing::ring_buffer::RingBuffer;
    use crate::processing::sample_codec::SampleBuffer;
    use crate::traits::audio_file_writer::WrittenFile;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("replay_exporter_{}_{}", std::process::id(), name));
        fs::remove_dir_all(&dir).ok();
        dir
    }

    fn trigger_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single().unwrap()
    }

    fn stereo_f32(rate: u32) -> CaptureFormat {
        CaptureFormat {
            sample_rate: rate,
            sample_format: SampleFormat::float(32),
            channel_count: 2,
        }
    }

    fn config_in(dir: &Path) -> ReplayConfiguration {
        ReplayConfiguration {
            duration_secs: 1,
            output_directory: dir.to_path_buf(),
            ..Default::default()
        }
    }

    fn pattern(sample: usize) -> f32 {
        // Sweeps slightly past full scale so clamping is exercised too.
        (sample % 1100) as f32 / 500.0 - 1.1
    }

    #[test]
    fn file_name_format() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(snapshot_file_name(&ts, "wav"), "replay-2024-01-02-03_04_05.wav");
    }

    #[test]
    fn existing_names_get_a_suffix() {
        let dir = temp_dir("suffix");
        fs::create_dir_all(&dir).unwrap();
        let ts = trigger_time().naive_local();

        let first = unique_export_path(&dir, &ts, "wav");
        assert!(first.ends_with("replay-2024-01-02-03_04_05.wav"));
        fs::write(&first, b"").unwrap();

        let second = unique_export_path(&dir, &ts, "wav");
        assert!(second.ends_with("replay-2024-01-02-03_04_05-2.wav"));
        fs::write(&second, b"").unwrap();

        let third = unique_export_path(&dir, &ts, "wav");
        assert!(third.ends_with("replay-2024-01-02-03_04_05-3.wav"));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn one_second_window_exports_as_24_bit_pcm() {
        let dir = temp_dir("end_to_end");
        let format = stereo_f32(48000);
        let (mut producer, reader) = RingBuffer::for_window(&format, 1).unwrap().split();

        let samples: Vec<f32> = (0..48000 * 2).map(pattern).collect();
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_ne_bytes()).collect();
        assert_eq!(producer.submit_interleaved(&bytes), 48000);

        let exporter = SnapshotExporter::new(reader, format, &config_in(&dir)).unwrap();
        let exported = exporter.export_snapshot_at(trigger_time()).unwrap();

        assert_eq!(exported.frame_count, 48000);
        assert!((exported.duration_secs - 1.0).abs() < 1e-9);
        assert!(exported.file_path.ends_with("replay-2024-01-02-03_04_05.wav"));

        let reader = hound::WavReader::open(&exported.file_path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(spec.bits_per_sample, 24);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);
        assert_eq!(reader.duration(), 48000);

        let read: Vec<i32> = reader.into_samples::<i32>().map(|s| s.unwrap()).collect();
        let expected: Vec<i32> = samples
            .iter()
            .map(|&x| ((x as f64).clamp(-1.0, 1.0) * 8_388_607.0).round() as i32)
            .collect();
        assert_eq!(read, expected);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn export_is_non_destructive_and_never_overwrites() {
        let dir = temp_dir("repeat");
        let format = CaptureFormat {
            sample_rate: 8000,
            sample_format: SampleFormat::signed(16),
            channel_count: 1,
        };
        let (mut producer, reader) = RingBuffer::for_window(&format, 1).unwrap().split();
        let frames: Vec<u8> = (0..8000i16).flat_map(|s| s.to_ne_bytes()).collect();
        producer.submit_interleaved(&frames);

        let exporter = SnapshotExporter::new(reader.clone(), format, &config_in(&dir)).unwrap();
        let before = reader.copy_window().unwrap();
        let first = exporter.export_snapshot_at(trigger_time()).unwrap();
        let second = exporter.export_snapshot_at(trigger_time()).unwrap();

        assert_eq!(reader.copy_window().unwrap(), before);
        assert_ne!(first.file_path, second.file_path);
        assert_eq!(first.checksum, second.checksum);
        assert_eq!(fs::read(&first.file_path).unwrap(), fs::read(&second.file_path).unwrap());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn partially_filled_window_is_padded_with_silence() {
        let dir = temp_dir("partial");
        let format = CaptureFormat {
            sample_rate: 100,
            sample_format: SampleFormat::signed(16),
            channel_count: 1,
        };
        let (mut producer, reader) = RingBuffer::for_window(&format, 1).unwrap().split();
        let frames: Vec<u8> = [i16::MAX; 10].iter().flat_map(|s| s.to_ne_bytes()).collect();
        producer.submit_interleaved(&frames);

        let config = ReplayConfiguration {
            output_encoding: OutputEncoding::Pcm16,
            ..config_in(&dir)
        };
        let exported = SnapshotExporter::new(reader, format, &config)
            .unwrap()
            .export_snapshot_at(trigger_time())
            .unwrap();
        assert_eq!(exported.frame_count, 100);

        let read: Vec<i16> = hound::WavReader::open(&exported.file_path)
            .unwrap()
            .into_samples::<i16>()
            .map(|s| s.unwrap())
            .collect();
        assert!(read[..90].iter().all(|&s| s == 0));
        assert!(read[90..].iter().all(|&s| s == i16::MAX));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn metadata_sidecar_describes_the_export() {
        let dir = temp_dir("sidecar");
        let format = stereo_f32(1000);
        let (_producer, reader) = RingBuffer::for_window(&format, 2).unwrap().split();

        let config = ReplayConfiguration {
            write_metadata: true,
            output_encoding: OutputEncoding::Float32,
            ..config_in(&dir)
        };
        let exported = SnapshotExporter::new(reader, format, &config)
            .unwrap()
            .export_snapshot_at(trigger_time())
            .unwrap();

        let sidecar = metadata::read_metadata(&exported.file_path).unwrap();
        assert_eq!(sidecar, exported.metadata());
        assert_eq!(sidecar.frame_count, 2000);
        assert_eq!(sidecar.capture_format, "float32le");
        assert_eq!(sidecar.encoding, OutputEncoding::Float32);

        fs::remove_dir_all(&dir).ok();
    }

    struct ShortWriter;

    impl AudioFileWriter for ShortWriter {
        fn extension(&self) -> &str {
            "raw"
        }

        fn write_file(
            &self,
            _path: &Path,
            _spec: &OutputSpec,
            samples: &SampleBuffer,
        ) -> Result<WrittenFile, ReplayError> {
            Ok(WrittenFile {
                frame_count: samples.len() / 2 - 1,
                checksum: String::new(),
            })
        }
    }

    #[test]
    fn short_write_is_an_error() {
        let dir = temp_dir("short");
        let format = stereo_f32(100);
        let (_producer, reader) = RingBuffer::for_window(&format, 1).unwrap().split();

        let exporter =
            SnapshotExporter::with_writer(reader, format, &config_in(&dir), Arc::new(ShortWriter)).unwrap();
        assert!(matches!(
            exporter.export_snapshot_at(trigger_time()),
            Err(ReplayError::ExportWriteError(_))
        ));
    }

    #[test]
    fn oversized_samples_fail_at_export_time() {
        let dir = temp_dir("oversized");
        let format = CaptureFormat {
            sample_rate: 100,
            sample_format: SampleFormat::signed(64),
            channel_count: 1,
        };
        let (_producer, reader) = RingBuffer::for_window(&format, 1).unwrap().split();
        let exporter = SnapshotExporter::new(reader, format, &config_in(&dir)).unwrap();

        assert_eq!(
            exporter.export_snapshot_at(trigger_time()),
            Err(ReplayError::UnsupportedFormatWidth {
                kind: "integer",
                bytes_per_sample: 8
            })
        );
        assert!(!dir.exists());
    }
}
