//! Audio device enumeration via cpal.
//!
//! Devices are identified by their cpal name; that name is the id accepted by
//! `--device`.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

use replay_core::models::audio_models::{AudioSource, DeviceDirection};
use replay_core::models::error::ReplayError;
use replay_core::models::format::{DeviceCapabilities, SampleFormat, SampleRateRange};

/// Audio device enumerator over one cpal host.
pub struct DeviceEnumerator {
    host: Host,
}

impl DeviceEnumerator {
    /// Enumerator over the platform's default host.
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    /// List capture devices.
    pub fn list_input_devices(&self) -> Result<Vec<AudioSource>, ReplayError> {
        let devices = self
            .host
            .input_devices()
            .map_err(|e| ReplayError::DeviceError(format!("failed to list input devices: {}", e)))?;
        let default_name = self.host.default_input_device().and_then(|d| d.name().ok());
        Ok(Self::describe(devices, DeviceDirection::Input, default_name))
    }

    /// List playback devices.
    pub fn list_output_devices(&self) -> Result<Vec<AudioSource>, ReplayError> {
        let devices = self
            .host
            .output_devices()
            .map_err(|e| ReplayError::DeviceError(format!("failed to list output devices: {}", e)))?;
        let default_name = self.host.default_output_device().and_then(|d| d.name().ok());
        Ok(Self::describe(devices, DeviceDirection::Output, default_name))
    }

    /// The system's default capture device.
    pub fn default_input_device(&self) -> Result<Device, ReplayError> {
        self.host
            .default_input_device()
            .ok_or_else(|| ReplayError::DeviceError("no default input device".into()))
    }

    /// Find a capture device by id. `Ok(None)` when nothing matches.
    pub fn find_input_device(&self, id: &str) -> Result<Option<Device>, ReplayError> {
        let mut devices = self
            .host
            .input_devices()
            .map_err(|e| ReplayError::DeviceError(format!("failed to list input devices: {}", e)))?;
        Ok(devices.find(|d| d.name().map(|name| name == id).unwrap_or(false)))
    }

    fn describe(
        devices: impl Iterator<Item = Device>,
        direction: DeviceDirection,
        default_name: Option<String>,
    ) -> Vec<AudioSource> {
        devices
            .enumerate()
            .map(|(i, device)| {
                let name = device.name().unwrap_or_else(|_| format!("Device {}", i));
                AudioSource {
                    id: name.clone(),
                    is_default: default_name.as_deref() == Some(name.as_str()),
                    name,
                    direction,
                }
            })
            .collect()
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a cpal sample format. cpal delivers samples in native byte order.
///
/// Packed 24-bit formats are padded to four bytes in cpal buffers, so their
/// container size does not describe the samples. They are skipped.
pub fn map_sample_format(format: cpal::SampleFormat) -> Option<SampleFormat> {
    use cpal::SampleFormat as Cpal;
    match format {
        Cpal::I8 => Some(SampleFormat::signed(8)),
        Cpal::I16 => Some(SampleFormat::signed(16)),
        Cpal::I32 => Some(SampleFormat::signed(32)),
        Cpal::I64 => Some(SampleFormat::signed(64)),
        Cpal::U8 => Some(SampleFormat::unsigned(8)),
        Cpal::U16 => Some(SampleFormat::unsigned(16)),
        Cpal::U32 => Some(SampleFormat::unsigned(32)),
        Cpal::U64 => Some(SampleFormat::unsigned(64)),
        Cpal::F32 => Some(SampleFormat::float(32)),
        Cpal::F64 => Some(SampleFormat::float(64)),
        _ => None,
    }
}

/// Rates, formats, and channel count reported for a capture device.
///
/// The channel count is the device's default input channel count; rate
/// ranges and formats come from the supported configurations with that many
/// channels, in the order the device reports them.
pub fn device_capabilities(device: &Device) -> Result<DeviceCapabilities, ReplayError> {
    let default_config = device
        .default_input_config()
        .map_err(|e| ReplayError::DeviceError(format!("failed to query default input config: {}", e)))?;
    let channel_count = default_config.channels();

    let configs: Vec<cpal::SupportedStreamConfigRange> = device
        .supported_input_configs()
        .map_err(|e| ReplayError::DeviceError(format!("failed to query input configs: {}", e)))?
        .collect();

    Ok(collect_capabilities(
        configs.iter().map(|c| {
            (
                c.channels(),
                SampleRateRange::new(c.min_sample_rate().0, c.max_sample_rate().0),
                c.sample_format(),
            )
        }),
        channel_count,
    ))
}

fn collect_capabilities(
    configs: impl Iterator<Item = (u16, SampleRateRange, cpal::SampleFormat)> + Clone,
    channel_count: u16,
) -> DeviceCapabilities {
    let mut caps = DeviceCapabilities {
        channel_count,
        ..Default::default()
    };

    let matching = configs.clone().any(|(channels, _, _)| channels == channel_count);
    for (channels, range, format) in configs {
        if matching && channels != channel_count {
            continue;
        }
        if !caps.sample_rates.contains(&range) {
            caps.sample_rates.push(range);
        }
        match map_sample_format(format) {
            Some(format) if !caps.formats.contains(&format) => caps.formats.push(format),
            Some(_) => {}
            None => log::debug!("Ignoring unsupported sample format {:?}", format),
        }
    }
    caps
}
