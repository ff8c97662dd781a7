use thiserror::Error;

/// Errors that can occur while capturing or exporting the replay window.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplayError {
    /// Connecting to, probing, or streaming from the input device failed.
    #[error("device error: {0}")]
    DeviceError(String),

    /// The device reported nothing usable, or the configuration is invalid.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    #[error("allocation failed: {0}")]
    AllocationError(String),

    /// No write representation is wide enough for the captured samples.
    #[error("no {kind} write representation can hold {bytes_per_sample}-byte samples")]
    UnsupportedFormatWidth {
        kind: &'static str,
        bytes_per_sample: usize,
    },

    #[error("export failed: {0}")]
    ExportWriteError(String),

    /// An export is already in flight.
    #[error("an export is already in progress")]
    Busy,

    #[error("snapshot kept being overrun by the producer after {attempts} attempts")]
    SnapshotContended { attempts: u32 },
}
