//! # replay-core
//!
//! Platform-agnostic instant replay core library.
//!
//! Keeps the most recent N seconds of captured audio in a fixed-size window
//! and writes that window to a file on demand. Platform backends implement
//! the `CaptureProvider` trait and plug into the generic `ReplaySession`.
//!
//! ## Architecture
//!
//! ```text
//! replay-core (this crate)
//! ├── traits/       ← CaptureProvider, AudioFileWriter, ReplayDelegate
//! ├── models/       ← ReplayError, CaptureFormat, ReplayConfiguration, states
//! ├── negotiation/  ← sample rate / sample format selection
//! ├── processing/   ← RingBuffer, sample codec, WAV header generation
//! ├── session/      ← SnapshotExporter, TriggerController, ReplaySession
//! └── storage/      ← WavFileWriter, metadata sidecar
//! ```

pub mod models;
pub mod negotiation;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioSource, DeviceDirection};
pub use models::config::{ReplayConfiguration, DEFAULT_DURATION_SECS};
pub use models::error::ReplayError;
pub use models::export_result::{ExportMetadata, ExportedFile};
pub use models::format::{
    CaptureFormat, DeviceCapabilities, Endianness, OutputEncoding, SampleFormat, SampleKind, SampleRateRange,
};
pub use models::state::{SessionState, TriggerState};
pub use negotiation::negotiator::negotiate;
pub use processing::ring_buffer::{ChannelArea, FrameBlock, FrameProducer, RingBuffer, WindowReader};
pub use session::exporter::SnapshotExporter;
pub use session::replay::ReplaySession;
pub use session::trigger::TriggerController;
pub use storage::wav_writer::{WavFileWriter, WavOutput};
pub use traits::audio_file_writer::{AudioFileWriter, OutputSpec, WrittenFile};
pub use traits::capture_provider::CaptureProvider;
pub use traits::replay_delegate::ReplayDelegate;
