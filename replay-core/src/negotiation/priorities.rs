//! Default preference tables used by the negotiator.

use crate::models::format::{SampleFormat, SampleKind};

const F32: SampleFormat = SampleFormat::float(32);
const F64: SampleFormat = SampleFormat::float(64);
const S32: SampleFormat = SampleFormat::signed(32);
const S24: SampleFormat = SampleFormat::signed(24);
const S16: SampleFormat = SampleFormat::signed(16);
const U32: SampleFormat = SampleFormat::unsigned(32);
const U24: SampleFormat = SampleFormat::unsigned(24);
const U16: SampleFormat = SampleFormat::unsigned(16);

/// Native-endian float first, then integers by decreasing width.
pub const PRIORITIZED_FORMATS: [SampleFormat; 18] = [
    F32,
    F32.foreign(),
    S32,
    S32.foreign(),
    S24,
    S24.foreign(),
    S16,
    S16.foreign(),
    F64,
    F64.foreign(),
    U32,
    U32.foreign(),
    U24,
    U24.foreign(),
    U16,
    U16.foreign(),
    SampleFormat::signed(8),
    SampleFormat::unsigned(8),
];

/// Common studio rates, most preferred first.
pub const PRIORITIZED_SAMPLE_RATES: [u32; 4] = [48000, 44100, 96000, 24000];
