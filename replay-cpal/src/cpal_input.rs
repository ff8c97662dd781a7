//! Input capture through a cpal stream.
//!
//! The stream is opened in the negotiated format and its raw bytes are handed
//! to the ring buffer untouched. Discontinuities in the capture timestamps are
//! written as silence so the window stays aligned with wall-clock time.

use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig, StreamInstant};

use replay_core::models::audio_models::{AudioSource, DeviceDirection};
use replay_core::models::error::ReplayError;
use replay_core::models::format::{CaptureFormat, DeviceCapabilities};
use replay_core::processing::ring_buffer::FrameProducer;
use replay_core::traits::capture_provider::CaptureProvider;

use crate::device_enumerator::{self, map_sample_format};

/// Timestamp drift tolerated before missing time is counted as a gap.
pub const GAP_TOLERANCE: Duration = Duration::from_millis(25);

/// Detects dropped input from capture timestamps.
///
/// Tracks how many frames should have arrived given the time elapsed since
/// the first callback and reports the shortfall.
#[derive(Debug, Clone)]
pub struct GapDetector {
    sample_rate: u32,
    tolerance_frames: u64,
    frames_seen: u64,
}

impl GapDetector {
    pub fn new(sample_rate: u32, tolerance: Duration) -> Self {
        Self {
            sample_rate,
            tolerance_frames: frames_in(tolerance, sample_rate),
            frames_seen: 0,
        }
    }

    /// Record a block of `frames` captured `elapsed` after the first block.
    /// Returns the number of silent frames to insert before it.
    pub fn observe(&mut self, elapsed: Duration, frames: usize) -> u64 {
        let expected = frames_in(elapsed, self.sample_rate);
        let gap = match expected.checked_sub(self.frames_seen) {
            Some(missing) if missing > self.tolerance_frames => missing,
            _ => 0,
        };
        self.frames_seen += gap + frames as u64;
        gap
    }
}

fn frames_in(duration: Duration, sample_rate: u32) -> u64 {
    (duration.as_nanos() * u128::from(sample_rate) / 1_000_000_000) as u64
}

/// Capture provider backed by a cpal input device.
pub struct CpalInputCapture {
    device: Device,
    name: String,
    is_default: bool,
    stream: Option<Stream>,
}

impl CpalInputCapture {
    pub fn new(device: Device, is_default: bool) -> Self {
        let name = device.name().unwrap_or_else(|_| "Unknown Device".into());
        Self {
            device,
            name,
            is_default,
            stream: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Find the cpal configuration matching `format`.
    fn stream_parameters(&self, format: &CaptureFormat) -> Result<(StreamConfig, cpal::SampleFormat), ReplayError> {
        let configs = self
            .device
            .supported_input_configs()
            .map_err(|e| ReplayError::DeviceError(format!("failed to query input configs: {}", e)))?;

        for range in configs {
            let rate_ok = range.min_sample_rate().0 <= format.sample_rate
                && format.sample_rate <= range.max_sample_rate().0;
            if range.channels() == format.channel_count
                && rate_ok
                && map_sample_format(range.sample_format()) == Some(format.sample_format)
            {
                let config = StreamConfig {
                    channels: format.channel_count,
                    sample_rate: cpal::SampleRate(format.sample_rate),
                    buffer_size: cpal::BufferSize::Default,
                };
                return Ok((config, range.sample_format()));
            }
        }

        Err(ReplayError::ConfigurationError(format!(
            "{} does not offer {}",
            self.name, format
        )))
    }
}

impl CaptureProvider for CpalInputCapture {
    fn capabilities(&self) -> Result<DeviceCapabilities, ReplayError> {
        device_enumerator::device_capabilities(&self.device)
    }

    fn device_info(&self) -> AudioSource {
        AudioSource {
            id: self.name.clone(),
            name: self.name.clone(),
            direction: DeviceDirection::Input,
            is_default: self.is_default,
        }
    }

    fn start(&mut self, format: &CaptureFormat, mut producer: FrameProducer) -> Result<(), ReplayError> {
        if self.stream.is_some() {
            return Err(ReplayError::DeviceError("capture already running".into()));
        }

        let (config, sample_format) = self.stream_parameters(format)?;
        let bytes_per_frame = format.bytes_per_frame();
        let mut gaps = GapDetector::new(format.sample_rate, GAP_TOLERANCE);
        let mut first_capture: Option<StreamInstant> = None;

        let stream = self
            .device
            .build_input_stream_raw(
                &config,
                sample_format,
                move |data: &cpal::Data, info: &cpal::InputCallbackInfo| {
                    let bytes = data.bytes();
                    let capture = info.timestamp().capture;
                    let start = *first_capture.get_or_insert(capture);
                    let elapsed = capture.duration_since(&start).unwrap_or_default();

                    let gap = gaps.observe(elapsed, bytes.len() / bytes_per_frame);
                    if gap > 0 {
                        producer.submit_gap(gap as usize);
                    }
                    producer.submit_interleaved(bytes);
                },
                |err| log::error!("Input stream error: {}", err),
                None,
            )
            .map_err(|e| ReplayError::DeviceError(format!("failed to open input stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| ReplayError::DeviceError(format!("failed to start input stream: {}", e)))?;

        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ReplayError> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        let paused = stream
            .pause()
            .map_err(|e| ReplayError::DeviceError(format!("failed to stop input stream: {}", e)));
        drop(stream);
        paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_stream_has_no_gaps() {
        let mut detector = GapDetector::new(48000, GAP_TOLERANCE);
        for block in 0..100u64 {
            let elapsed = Duration::from_micros(block * 10_000);
            assert_eq!(detector.observe(elapsed, 480), 0);
        }
    }

    #[test]
    fn jitter_within_tolerance_is_ignored() {
        let mut detector = GapDetector::new(48000, GAP_TOLERANCE);
        assert_eq!(detector.observe(Duration::ZERO, 480), 0);
        // 20 ms late: inside the 25 ms tolerance.
        assert_eq!(detector.observe(Duration::from_millis(30), 480), 0);
    }

    #[test]
    fn dropout_is_reported_as_missing_frames() {
        let mut detector = GapDetector::new(48000, GAP_TOLERANCE);
        assert_eq!(detector.observe(Duration::ZERO, 480), 0);
        // Next block should be at 10 ms but arrives at 110 ms.
        assert_eq!(detector.observe(Duration::from_millis(110), 480), 4800);
        // Back on schedule afterwards.
        assert_eq!(detector.observe(Duration::from_millis(120), 480), 0);
    }

    #[test]
    fn early_blocks_never_produce_gaps() {
        let mut detector = GapDetector::new(44100, GAP_TOLERANCE);
        assert_eq!(detector.observe(Duration::ZERO, 4410), 0);
        assert_eq!(detector.observe(Duration::from_millis(50), 4410), 0);
    }
}
