use crate::models::audio_models::AudioSource;
use crate::models::error::ReplayError;
use crate::models::format::{CaptureFormat, DeviceCapabilities};
use crate::processing::ring_buffer::FrameProducer;

/// Interface for platform-specific audio input sources.
///
/// Implemented by:
/// - `CpalInputCapture` (any host cpal supports)
///
/// Streams are usually not `Send` (cpal on some hosts), so neither is this
/// trait. The session that owns a provider stays on the thread it was built on.
pub trait CaptureProvider {
    /// Rates, formats, and channel count the device reports.
    fn capabilities(&self) -> Result<DeviceCapabilities, ReplayError>;

    /// Information about the audio device backing this provider.
    fn device_info(&self) -> AudioSource;

    /// Open the device at `format` and deliver every block to `producer`.
    ///
    /// The producer is moved onto the device's real-time callback. Gaps the
    /// backend detects must be submitted as silence so the window keeps its
    /// length.
    fn start(&mut self, format: &CaptureFormat, producer: FrameProducer) -> Result<(), ReplayError>;

    /// Stop capturing and release the stream.
    fn stop(&mut self) -> Result<(), ReplayError>;
}
