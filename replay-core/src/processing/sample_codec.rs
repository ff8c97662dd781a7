//! Conversion between raw captured bytes, write representations, and the
//! container's sample encoding.

use crate::models::error::ReplayError;
use crate::models::format::{Endianness, OutputEncoding, SampleFormat, SampleKind};

/// In-memory numeric representation handed to the file writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteRepresentation {
    Float32,
    Float64,
    Int16,
    Int32,
}

impl WriteRepresentation {
    /// The narrowest representation that holds `format` without losing
    /// precision.
    pub fn select(format: &SampleFormat) -> Result<Self, ReplayError> {
        let bytes_per_sample = format.bytes_per_sample();
        if format.is_float() {
            match bytes_per_sample {
                0..=4 => Ok(Self::Float32),
                5..=8 => Ok(Self::Float64),
                _ => Err(ReplayError::UnsupportedFormatWidth {
                    kind: "floating point",
                    bytes_per_sample,
                }),
            }
        } else {
            match bytes_per_sample {
                0..=2 => Ok(Self::Int16),
                3..=4 => Ok(Self::Int32),
                _ => Err(ReplayError::UnsupportedFormatWidth {
                    kind: "integer",
                    bytes_per_sample,
                }),
            }
        }
    }
}

/// Interleaved samples in one write representation.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleBuffer {
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
}

impl SampleBuffer {
    pub fn representation(&self) -> WriteRepresentation {
        match self {
            Self::Float32(_) => WriteRepresentation::Float32,
            Self::Float64(_) => WriteRepresentation::Float64,
            Self::Int16(_) => WriteRepresentation::Int16,
            Self::Int32(_) => WriteRepresentation::Int32,
        }
    }

    /// Number of samples, across all channels.
    pub fn len(&self) -> usize {
        match self {
            Self::Float32(s) => s.len(),
            Self::Float64(s) => s.len(),
            Self::Int16(s) => s.len(),
            Self::Int32(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encode every sample into the container's little-endian byte layout.
    pub fn encode(&self, encoding: OutputEncoding) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.len() * encoding.bytes_per_sample());
        match self {
            Self::Float32(samples) => {
                for &s in samples {
                    push_float(&mut data, f64::from(s), encoding);
                }
            }
            Self::Float64(samples) => {
                for &s in samples {
                    push_float(&mut data, s, encoding);
                }
            }
            Self::Int16(samples) => {
                for &s in samples {
                    push_int(&mut data, i32::from(s) << 16, encoding);
                }
            }
            Self::Int32(samples) => {
                for &s in samples {
                    push_int(&mut data, s, encoding);
                }
            }
        }
        data
    }
}

/// Decode a window of raw captured bytes into `repr`.
///
/// Foreign-endian samples are byte-swapped, unsigned samples are re-centred
/// around zero and integer samples are left-justified, so full scale in the
/// capture format is full scale in the representation.
pub fn decode(bytes: &[u8], format: &SampleFormat, repr: WriteRepresentation) -> SampleBuffer {
    let width = format.bytes_per_sample().max(1);
    let raw = bytes.chunks_exact(width).map(|chunk| read_raw(chunk, format.endianness));

    match repr {
        WriteRepresentation::Float32 => {
            SampleBuffer::Float32(raw.map(|v| to_float(v, format) as f32).collect())
        }
        WriteRepresentation::Float64 => {
            SampleBuffer::Float64(raw.map(|v| to_float(v, format)).collect())
        }
        WriteRepresentation::Int16 => {
            SampleBuffer::Int16(raw.map(|v| left_justify(v, format, 16) as i16).collect())
        }
        WriteRepresentation::Int32 => {
            SampleBuffer::Int32(raw.map(|v| left_justify(v, format, 32) as i32).collect())
        }
    }
}

fn read_raw(chunk: &[u8], endianness: Endianness) -> u64 {
    match endianness {
        Endianness::Little => chunk
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)),
        Endianness::Big => chunk.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)),
    }
}

/// Interpret raw bits as a signed integer of `format.bits`.
fn to_signed(raw: u64, format: &SampleFormat) -> i64 {
    let bits = u32::from(format.bits);
    match format.kind {
        SampleKind::Unsigned => (raw as i64).wrapping_sub(1i64 << (bits - 1)),
        _ => {
            let shift = 64 - bits;
            ((raw << shift) as i64) >> shift
        }
    }
}

fn to_float(raw: u64, format: &SampleFormat) -> f64 {
    match (format.kind, format.bits) {
        (SampleKind::Float, 32) => f64::from(f32::from_bits(raw as u32)),
        (SampleKind::Float, _) => f64::from_bits(raw),
        _ => to_signed(raw, format) as f64 / (1u64 << (format.bits - 1)) as f64,
    }
}

fn left_justify(raw: u64, format: &SampleFormat, target_bits: u32) -> i64 {
    let value = to_signed(raw, format);
    let bits = u32::from(format.bits);
    if bits <= target_bits {
        value << (target_bits - bits)
    } else {
        value >> (bits - target_bits)
    }
}

fn push_float(data: &mut Vec<u8>, sample: f64, encoding: OutputEncoding) {
    if encoding.is_float() {
        data.extend_from_slice(&(sample as f32).to_le_bytes());
        return;
    }
    let bits = u32::from(encoding.bits_per_sample());
    let full_scale = ((1i64 << (bits - 1)) - 1) as f64;
    let value = (sample.clamp(-1.0, 1.0) * full_scale).round() as i64;
    push_le(data, value, encoding.bytes_per_sample());
}

/// `sample` is a full-scale 32-bit value.
fn push_int(data: &mut Vec<u8>, sample: i32, encoding: OutputEncoding) {
    if encoding.is_float() {
        let value = f64::from(sample) / 2_147_483_648.0;
        data.extend_from_slice(&(value as f32).to_le_bytes());
        return;
    }
    let shift = 32 - u32::from(encoding.bits_per_sample());
    push_le(data, i64::from(sample >> shift), encoding.bytes_per_sample());
}

fn push_le(data: &mut Vec<u8>, value: i64, width: usize) {
    data.extend_from_slice(&value.to_le_bytes()[..width]);
}
