use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ReplayError;

/// Numeric representation of a captured sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleKind {
    Signed,
    Unsigned,
    Float,
}

/// Byte order of a multi-byte sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    #[cfg(target_endian = "little")]
    pub const NATIVE: Endianness = Endianness::Little;
    #[cfg(target_endian = "big")]
    pub const NATIVE: Endianness = Endianness::Big;

    #[cfg(target_endian = "little")]
    pub const FOREIGN: Endianness = Endianness::Big;
    #[cfg(target_endian = "big")]
    pub const FOREIGN: Endianness = Endianness::Little;

    pub fn is_native(self) -> bool {
        self == Self::NATIVE
    }
}

/// Sample format tag: numeric kind, bit width and byte order.
///
/// Samples are always packed, so a 24-bit sample occupies exactly 3 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleFormat {
    pub kind: SampleKind,
    pub bits: u16,
    pub endianness: Endianness,
}

impl SampleFormat {
    pub const fn new(kind: SampleKind, bits: u16, endianness: Endianness) -> Self {
        Self {
            kind,
            bits,
            endianness,
        }
    }

    pub const fn float(bits: u16) -> Self {
        Self::new(SampleKind::Float, bits, Endianness::NATIVE)
    }

    pub const fn signed(bits: u16) -> Self {
        Self::new(SampleKind::Signed, bits, Endianness::NATIVE)
    }

    pub const fn unsigned(bits: u16) -> Self {
        Self::new(SampleKind::Unsigned, bits, Endianness::NATIVE)
    }

    /// The same format with the opposite byte order.
    pub const fn foreign(self) -> Self {
        let endianness = match self.endianness {
            Endianness::Little => Endianness::Big,
            Endianness::Big => Endianness::Little,
        };
        Self::new(self.kind, self.bits, endianness)
    }

    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bits / 8)
    }

    pub fn is_float(&self) -> bool {
        self.kind == SampleKind::Float
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            SampleKind::Signed => "s",
            SampleKind::Unsigned => "u",
            SampleKind::Float => "float",
        };
        write!(f, "{}{}", kind, self.bits)?;
        if self.bits > 8 {
            let order = match self.endianness {
                Endianness::Little => "le",
                Endianness::Big => "be",
            };
            write!(f, "{}", order)?;
        }
        Ok(())
    }
}

/// The format fixed by negotiation before the window buffer is sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    pub sample_rate: u32,
    pub sample_format: SampleFormat,
    pub channel_count: u16,
}

impl CaptureFormat {
    pub fn bytes_per_sample(&self) -> usize {
        self.sample_format.bytes_per_sample()
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.bytes_per_sample() * usize::from(self.channel_count)
    }

    /// Number of frames in a window of `duration_secs`.
    pub fn frames_for(&self, duration_secs: u32) -> Result<usize, ReplayError> {
        let frames = u64::from(duration_secs) * u64::from(self.sample_rate);
        usize::try_from(frames).map_err(|_| {
            ReplayError::AllocationError(format!(
                "{} s at {} Hz does not fit in memory",
                duration_secs, self.sample_rate
            ))
        })
    }
}

impl fmt::Display for CaptureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}ch {}Hz {} interleaved",
            self.channel_count, self.sample_rate, self.sample_format
        )
    }
}

/// An inclusive range of sample rates a device reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRateRange {
    pub min: u32,
    pub max: u32,
}

impl SampleRateRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn exact(rate: u32) -> Self {
        Self::new(rate, rate)
    }

    pub fn contains(&self, rate: u32) -> bool {
        (self.min..=self.max).contains(&rate)
    }
}

/// What an input device reports it can capture, in the device's own order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceCapabilities {
    pub sample_rates: Vec<SampleRateRange>,
    pub formats: Vec<SampleFormat>,
    pub channel_count: u16,
}

impl DeviceCapabilities {
    pub fn supports_sample_rate(&self, rate: u32) -> bool {
        self.sample_rates.iter().any(|range| range.contains(rate))
    }

    pub fn supports_format(&self, format: &SampleFormat) -> bool {
        self.formats.contains(format)
    }
}

/// Sample encoding of the written container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputEncoding {
    Pcm16,
    #[default]
    Pcm24,
    Pcm32,
    Float32,
}

impl OutputEncoding {
    pub fn bits_per_sample(self) -> u16 {
        match self {
            Self::Pcm16 => 16,
            Self::Pcm24 => 24,
            Self::Pcm32 | Self::Float32 => 32,
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        usize::from(self.bits_per_sample() / 8)
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::Float32)
    }

    /// Whether samples captured in `format` lose precision when written.
    pub fn truncates(self, format: &SampleFormat) -> bool {
        match self {
            Self::Float32 => format.bits > 32 || (!format.is_float() && format.bits > 24),
            _ => format.is_float() || format.bits > self.bits_per_sample(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pcm16 => "pcm16",
            Self::Pcm24 => "pcm24",
            Self::Pcm32 => "pcm32",
            Self::Float32 => "float32",
        }
    }
}

impl fmt::Display for OutputEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pcm16" => Ok(Self::Pcm16),
            "pcm24" => Ok(Self::Pcm24),
            "pcm32" => Ok(Self::Pcm32),
            "float32" => Ok(Self::Float32),
            other => Err(format!(
                "unknown encoding '{}' (expected pcm16, pcm24, pcm32 or float32)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_geometry() {
        let format = CaptureFormat {
            sample_rate: 48000,
            sample_format: SampleFormat::signed(24),
            channel_count: 2,
        };
        assert_eq!(format.bytes_per_sample(), 3);
        assert_eq!(format.bytes_per_frame(), 6);
        assert_eq!(format.frames_for(30).unwrap(), 1_440_000);
    }

    #[test]
    fn foreign_flips_byte_order() {
        let ne = SampleFormat::float(32);
        let fe = ne.foreign();
        assert_eq!(fe.endianness, Endianness::FOREIGN);
        assert_eq!(fe.foreign(), ne);
        assert!(ne.endianness.is_native());
    }

    #[test]
    fn display_names() {
        let le = SampleFormat::new(SampleKind::Float, 32, Endianness::Little);
        assert_eq!(le.to_string(), "float32le");
        let be = SampleFormat::new(SampleKind::Signed, 24, Endianness::Big);
        assert_eq!(be.to_string(), "s24be");
        assert_eq!(SampleFormat::unsigned(8).to_string(), "u8");
    }

    #[test]
    fn rate_ranges() {
        let caps = DeviceCapabilities {
            sample_rates: vec![SampleRateRange::new(8000, 48000), SampleRateRange::exact(96000)],
            formats: vec![SampleFormat::signed(16)],
            channel_count: 1,
        };
        assert!(caps.supports_sample_rate(44100));
        assert!(caps.supports_sample_rate(96000));
        assert!(!caps.supports_sample_rate(88200));
        assert!(caps.supports_format(&SampleFormat::signed(16)));
        assert!(!caps.supports_format(&SampleFormat::signed(16).foreign()));
    }

    #[test]
    fn encoding_truncation() {
        assert!(OutputEncoding::Pcm24.truncates(&SampleFormat::float(32)));
        assert!(OutputEncoding::Pcm24.truncates(&SampleFormat::signed(32)));
        assert!(!OutputEncoding::Pcm24.truncates(&SampleFormat::signed(24)));
        assert!(!OutputEncoding::Pcm24.truncates(&SampleFormat::signed(16)));
        assert!(!OutputEncoding::Float32.truncates(&SampleFormat::float(32)));
        assert!(OutputEncoding::Float32.truncates(&SampleFormat::float(64)));
    }

    #[test]
    fn encoding_parses_case_insensitively() {
        assert_eq!("PCM24".parse::<OutputEncoding>(), Ok(OutputEncoding::Pcm24));
        assert_eq!("float32".parse::<OutputEncoding>(), Ok(OutputEncoding::Float32));
        assert!("pcm8".parse::<OutputEncoding>().is_err());
        assert_eq!(OutputEncoding::default(), OutputEncoding::Pcm24);
    }
}
