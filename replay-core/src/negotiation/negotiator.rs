//! Startup selection of sample rate and sample format.
//!
//! Preference lists are scanned in order and the first value the device
//! supports wins. When none of them is supported the device's own first
//! reported value is used instead, so an unsupported preference is never an
//! error. Only a device that reports no rates or no formats at all fails.

use crate::models::error::ReplayError;
use crate::models::format::{CaptureFormat, DeviceCapabilities, SampleFormat};

/// Pick a sample rate: first supported preference, else the maximum of the
/// device's first reported range.
pub fn select_sample_rate(caps: &DeviceCapabilities, priorities: &[u32]) -> Result<u32, ReplayError> {
    let fallback = caps.sample_rates.first().ok_or_else(|| {
        ReplayError::ConfigurationError("device reports no supported sample rates".into())
    })?;

    let rate = priorities
        .iter()
        .copied()
        .find(|&rate| caps.supports_sample_rate(rate))
        .unwrap_or(fallback.max);
    Ok(rate)
}

/// Pick a sample format: first supported preference, else the device's first
/// reported format.
pub fn select_sample_format(
    caps: &DeviceCapabilities,
    priorities: &[SampleFormat],
) -> Result<SampleFormat, ReplayError> {
    let fallback = caps.formats.first().ok_or_else(|| {
        ReplayError::ConfigurationError("device reports no supported sample formats".into())
    })?;

    let format = priorities
        .iter()
        .find(|format| caps.supports_format(format))
        .unwrap_or(fallback);
    Ok(*format)
}

/// Fix the capture format for a device.
pub fn negotiate(
    caps: &DeviceCapabilities,
    rate_priorities: &[u32],
    format_priorities: &[SampleFormat],
) -> Result<CaptureFormat, ReplayError> {
    if caps.channel_count == 0 {
        return Err(ReplayError::ConfigurationError(
            "device reports no input channels".into(),
        ));
    }

    let sample_rate = select_sample_rate(caps, rate_priorities)?;
    let sample_format = select_sample_format(caps, format_priorities)?;

    Ok(CaptureFormat {
        sample_rate,
        sample_format,
        channel_count: caps.channel_count,
    })
}
