//! WAV file format utilities.
//!
//! Generates standard 44-byte RIFF WAV headers and provides helpers for
//! updating header fields once the data size is known.

use crate::models::format::OutputEncoding;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// `WAVE_FORMAT_PCM`
pub const FORMAT_PCM: u16 = 1;

/// `WAVE_FORMAT_IEEE_FLOAT`
pub const FORMAT_IEEE_FLOAT: u16 = 3;

/// Largest data chunk a 32-bit RIFF size field can describe.
pub const MAX_DATA_SIZE: u64 = u32::MAX as u64 - 36;

/// Format code of the `fmt ` chunk for an output encoding.
pub fn format_code(encoding: OutputEncoding) -> u16 {
    if encoding.is_float() {
        FORMAT_IEEE_FLOAT
    } else {
        FORMAT_PCM
    }
}

/// Generate a 44-byte WAV RIFF header, little-endian.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    file size - 8 (36 + data_size)
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (format chunk size)
/// [20-21]  format code (1 = PCM, 3 = IEEE float)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bit_depth / 8
/// [32-33]  block_align = channels * bit_depth / 8
/// [34-35]  bit_depth
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(
    encoding: OutputEncoding,
    sample_rate: u32,
    channels: u16,
    data_size: u32,
) -> [u8; WAV_HEADER_SIZE] {
    let bit_depth = encoding.bits_per_sample();
    let byte_rate = sample_rate * channels as u32 * bit_depth as u32 / 8;
    let block_align = channels * bit_depth / 8;
    let chunk_size = 36 + data_size;

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&format_code(encoding).to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Patch the file-size field at offset 4 (RIFF chunk size = file_size - 8).
pub fn patch_file_size(header: &mut [u8], total_file_size: u64) {
    let chunk_size = (total_file_size - 8) as u32;
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
}

/// Patch the data-size field at offset 40.
pub fn patch_data_size(header: &mut [u8], data_size: u64) {
    let data_size_u32 = data_size as u32;
    header[40..44].copy_from_slice(&data_size_u32.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(header: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([header[at], header[at + 1]])
    }

    fn u32_at(header: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]])
    }

    #[test]
    fn header_riff_magic() {
        let header = generate_wav_header(OutputEncoding::Pcm24, 48000, 2, 0);
        assert_eq!(header.len(), 44);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(&header[36..40], b"data");
        assert_eq!(u32_at(&header, 16), 16);
    }

    #[test]
    fn header_48khz_stereo_24bit() {
        let header = generate_wav_header(OutputEncoding::Pcm24, 48000, 2, 288_000);

        assert_eq!(u16_at(&header, 20), FORMAT_PCM);
        assert_eq!(u16_at(&header, 22), 2);
        assert_eq!(u32_at(&header, 24), 48000);
        assert_eq!(u32_at(&header, 28), 288_000); // 48000 * 2 * 24/8
        assert_eq!(u16_at(&header, 32), 6); // 2 * 24/8
        assert_eq!(u16_at(&header, 34), 24);
        assert_eq!(u32_at(&header, 40), 288_000);
        assert_eq!(u32_at(&header, 4), 36 + 288_000);
    }

    #[test]
    fn float_header_uses_ieee_format_code() {
        let header = generate_wav_header(OutputEncoding::Float32, 44100, 1, 0);
        assert_eq!(u16_at(&header, 20), FORMAT_IEEE_FLOAT);
        assert_eq!(u16_at(&header, 34), 32);
        assert_eq!(u16_at(&header, 32), 4);
    }

    #[test]
    fn patch_sizes() {
        let mut header = generate_wav_header(OutputEncoding::Pcm16, 48000, 2, 0);

        patch_data_size(&mut header, 19200);
        assert_eq!(u32_at(&header, 40), 19200);

        patch_file_size(&mut header, 19200 + 44);
        assert_eq!(u32_at(&header, 4), 19200 + 36);
    }
}
