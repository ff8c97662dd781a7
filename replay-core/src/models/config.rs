use std::path::PathBuf;

use super::format::{OutputEncoding, SampleFormat};
use crate::negotiation::priorities::{PRIORITIZED_FORMATS, PRIORITIZED_SAMPLE_RATES};

/// Default length of the replay window in seconds.
pub const DEFAULT_DURATION_SECS: u32 = 30;

/// Configuration for a replay session.
#[derive(Debug, Clone)]
pub struct ReplayConfiguration {
    /// Length of the rolling window in seconds (default: 30).
    pub duration_secs: u32,

    /// Directory where exported files are written.
    pub output_directory: PathBuf,

    /// Container sample encoding for exported files (default: 24-bit PCM).
    pub output_encoding: OutputEncoding,

    /// Write a `.metadata.json` sidecar next to every export.
    pub write_metadata: bool,

    /// Sample rates to try, most preferred first.
    pub rate_priorities: Vec<u32>,

    /// Sample formats to try, most preferred first.
    pub format_priorities: Vec<SampleFormat>,
}

impl ReplayConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.duration_secs == 0 {
            return Err("duration must be at least one second".into());
        }
        if self.output_directory.as_os_str().is_empty() {
            return Err("output directory must not be empty".into());
        }
        Ok(())
    }
}

impl Default for ReplayConfiguration {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_DURATION_SECS,
            output_directory: PathBuf::from("."),
            output_encoding: OutputEncoding::default(),
            write_metadata: false,
            rate_priorities: PRIORITIZED_SAMPLE_RATES.to_vec(),
            format_priorities: PRIORITIZED_FORMATS.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = ReplayConfiguration::default();
        assert_eq!(config.duration_secs, 30);
        assert_eq!(config.output_encoding, OutputEncoding::Pcm24);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_duration_rejected() {
        let config = ReplayConfiguration {
            duration_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
