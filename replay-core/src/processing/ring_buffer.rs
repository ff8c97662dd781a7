//! Fixed-duration rolling window of raw audio frames.
//!
//! The buffer is split into a single [`FrameProducer`], owned by the real-time
//! audio callback, and any number of [`WindowReader`]s used by the exporter.
//! The producer never blocks or allocates. Readers take a consistent snapshot
//! of the whole window without stopping the producer.
//!
//! Both cursors are derived from one monotonic frames-written counter, so the
//! read cursor is always exactly one window behind the write cursor. Storage
//! holds the window plus a guard region: frames written while a reader is
//! copying land in the guard first, and a copy is only retried if the producer
//! ran through the whole guard before the copy finished.

use std::sync::atomic::{fence, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use crate::models::error::ReplayError;
use crate::models::format::CaptureFormat;

/// How many times a reader restarts a copy that the producer overran.
const MAX_SNAPSHOT_ATTEMPTS: u32 = 4;

/// One channel of a block of frames: its first sample plus the byte distance
/// between consecutive samples of that channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelArea<'a> {
    pub data: &'a [u8],
    pub step: usize,
}

impl<'a> ChannelArea<'a> {
    pub fn new(data: &'a [u8], step: usize) -> Self {
        Self { data, step }
    }

    /// Frames of `bytes_per_sample` this area can supply.
    fn available_frames(&self, bytes_per_sample: usize) -> usize {
        if self.data.len() < bytes_per_sample {
            0
        } else if self.step == 0 {
            usize::MAX
        } else {
            (self.data.len() - bytes_per_sample) / self.step + 1
        }
    }
}

/// A block of frames delivered by the audio subsystem.
#[derive(Debug, Clone, Copy)]
pub enum FrameBlock<'a> {
    /// Frames already interleaved in `bytes_per_frame` units.
    Interleaved(&'a [u8]),
    /// One area per channel, read `frames` times with each area's stride.
    Strided {
        areas: &'a [ChannelArea<'a>],
        frames: usize,
    },
    /// The device could not supply `frames` frames; they become silence.
    Gap { frames: usize },
}

struct Shared {
    storage: Box<[AtomicU8]>,
    bytes_per_sample: usize,
    bytes_per_frame: usize,
    capacity_frames: u64,
    guard_frames: u64,
    storage_frames: u64,
    /// Frames the producer has started writing.
    claimed: AtomicU64,
    /// Frames fully written and visible to readers.
    committed: AtomicU64,
}

impl Shared {
    fn capacity_bytes(&self) -> usize {
        self.capacity_frames as usize * self.bytes_per_frame
    }

    fn storage_bytes(&self) -> usize {
        self.storage.len()
    }

    fn frame_offset(&self, frame: u64) -> usize {
        (frame % self.storage_frames) as usize * self.bytes_per_frame
    }

    fn write_cursor(&self, frames_written: u64) -> usize {
        self.frame_offset(frames_written)
    }

    fn read_cursor(&self, frames_written: u64) -> usize {
        self.frame_offset(frames_written + self.guard_frames)
    }
}

/// Owned rolling window buffer, before it is split between producer and
/// readers.
pub struct RingBuffer {
    shared: Arc<Shared>,
}

impl RingBuffer {
    /// Allocate a window of `capacity_frames` frames with the default guard
    /// of a quarter window.
    pub fn new(
        capacity_frames: usize,
        bytes_per_sample: usize,
        channel_count: u16,
    ) -> Result<Self, ReplayError> {
        let guard_frames = (capacity_frames / 4).max(1);
        Self::with_guard(capacity_frames, bytes_per_sample, channel_count, guard_frames)
    }

    /// Allocate a window sized for `duration_secs` of `format`.
    pub fn for_window(format: &CaptureFormat, duration_secs: u32) -> Result<Self, ReplayError> {
        let frames = format.frames_for(duration_secs)?;
        Self::new(frames, format.bytes_per_sample(), format.channel_count)
    }

    pub fn with_guard(
        capacity_frames: usize,
        bytes_per_sample: usize,
        channel_count: u16,
        guard_frames: usize,
    ) -> Result<Self, ReplayError> {
        if capacity_frames == 0 {
            return Err(ReplayError::ConfigurationError(
                "window must hold at least one frame".into(),
            ));
        }
        if bytes_per_sample == 0 || channel_count == 0 {
            return Err(ReplayError::ConfigurationError(
                "frames must be at least one byte wide".into(),
            ));
        }
        let guard_frames = guard_frames.max(1);
        let bytes_per_frame = bytes_per_sample * usize::from(channel_count);

        let storage_bytes = capacity_frames
            .checked_add(guard_frames)
            .and_then(|frames| frames.checked_mul(bytes_per_frame))
            .ok_or_else(|| {
                ReplayError::AllocationError(format!(
                    "window of {} frames x {} bytes overflows",
                    capacity_frames, bytes_per_frame
                ))
            })?;

        let mut storage = Vec::new();
        storage.try_reserve_exact(storage_bytes).map_err(|e| {
            ReplayError::AllocationError(format!(
                "failed to allocate {} byte window: {}",
                storage_bytes, e
            ))
        })?;
        storage.extend((0..storage_bytes).map(|_| AtomicU8::new(0)));

        Ok(Self {
            shared: Arc::new(Shared {
                storage: storage.into_boxed_slice(),
                bytes_per_sample,
                bytes_per_frame,
                capacity_frames: capacity_frames as u64,
                guard_frames: guard_frames as u64,
                storage_frames: (capacity_frames + guard_frames) as u64,
                claimed: AtomicU64::new(0),
                committed: AtomicU64::new(0),
            }),
        })
    }

    /// Size of the window in bytes.
    pub fn capacity_bytes(&self) -> usize {
        self.shared.capacity_bytes()
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.shared.bytes_per_frame
    }

    /// Hand out the unique producer handle and a reader.
    pub fn split(self) -> (FrameProducer, WindowReader) {
        let producer = FrameProducer {
            shared: Arc::clone(&self.shared),
            frames_written: 0,
        };
        let reader = WindowReader {
            shared: self.shared,
        };
        (producer, reader)
    }
}

/// Write side of the window. There is exactly one per buffer.
pub struct FrameProducer {
    shared: Arc<Shared>,
    frames_written: u64,
}

impl FrameProducer {
    /// Append a block of frames, returning how many frames the window
    /// advanced by.
    ///
    /// Runs in bounded time without allocating or blocking. A trailing
    /// partial frame in an interleaved block is ignored, and strided areas
    /// are clamped to the frames every channel can supply.
    pub fn submit_frames(&mut self, block: FrameBlock<'_>) -> usize {
        match block {
            FrameBlock::Interleaved(bytes) => self.write_interleaved(bytes),
            FrameBlock::Strided { areas, frames } => self.write_strided(areas, frames),
            FrameBlock::Gap { frames } => self.write_silence(frames),
        }
    }

    pub fn submit_interleaved(&mut self, bytes: &[u8]) -> usize {
        self.submit_frames(FrameBlock::Interleaved(bytes))
    }

    pub fn submit_gap(&mut self, frames: usize) -> usize {
        self.submit_frames(FrameBlock::Gap { frames })
    }

    /// Total frames submitted so far, gaps included.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.shared.bytes_per_frame
    }

    fn write_interleaved(&mut self, bytes: &[u8]) -> usize {
        let bpf = self.shared.bytes_per_frame;
        let frames = bytes.len() / bpf;
        if frames == 0 {
            return 0;
        }
        let skip = self.surviving_skip(frames);
        let start = self.begin(frames);

        let src = &bytes[skip * bpf..frames * bpf];
        let offset = self.shared.frame_offset(start + skip as u64);
        let first_len = src.len().min(self.shared.storage_bytes() - offset);
        self.store(offset, &src[..first_len]);
        self.store(0, &src[first_len..]);

        self.commit(start, frames)
    }

    fn write_strided(&mut self, areas: &[ChannelArea<'_>], frames: usize) -> usize {
        let channels = self.shared.bytes_per_frame / self.shared.bytes_per_sample;
        if areas.len() != channels {
            return 0;
        }
        let bps = self.shared.bytes_per_sample;
        let frames = areas
            .iter()
            .map(|area| area.available_frames(bps))
            .fold(frames, usize::min);
        if frames == 0 {
            return 0;
        }
        let skip = self.surviving_skip(frames);
        let start = self.begin(frames);

        for frame in skip..frames {
            let mut offset = self.shared.frame_offset(start + frame as u64);
            for area in areas {
                let at = frame * area.step;
                self.store(offset, &area.data[at..at + bps]);
                offset += bps;
            }
        }

        self.commit(start, frames)
    }

    fn write_silence(&mut self, frames: usize) -> usize {
        if frames == 0 {
            return 0;
        }
        let skip = self.surviving_skip(frames);
        let start = self.begin(frames);

        let len = (frames - skip) * self.shared.bytes_per_frame;
        let offset = self.shared.frame_offset(start + skip as u64);
        let first_len = len.min(self.shared.storage_bytes() - offset);
        self.zero(offset, first_len);
        self.zero(0, len - first_len);

        self.commit(start, frames)
    }

    /// Frames at the head of a block that would be overwritten by the same
    /// block anyway.
    fn surviving_skip(&self, frames: usize) -> usize {
        frames.saturating_sub(self.shared.storage_frames as usize)
    }

    /// Announce the frames about to be written before touching storage.
    fn begin(&mut self, frames: usize) -> u64 {
        let start = self.frames_written;
        self.shared
            .claimed
            .store(start + frames as u64, Ordering::Relaxed);
        fence(Ordering::Release);
        start
    }

    /// Claim `frames` without writing or committing them, leaving the
    /// producer stuck mid-write.
    #[cfg(test)]
    fn stall_mid_write(&mut self, frames: usize) {
        self.begin(frames);
    }

    fn commit(&mut self, start: u64, frames: usize) -> usize {
        let end = start + frames as u64;
        self.shared.committed.store(end, Ordering::Release);
        self.frames_written = end;
        frames
    }

    fn store(&self, offset: usize, src: &[u8]) {
        let dst = &self.shared.storage[offset..offset + src.len()];
        for (slot, &byte) in dst.iter().zip(src) {
            slot.store(byte, Ordering::Relaxed);
        }
    }

    fn zero(&self, offset: usize, len: usize) {
        for slot in &self.shared.storage[offset..offset + len] {
            slot.store(0, Ordering::Relaxed);
        }
    }
}

/// Read side of the window. Cheap to clone and safe to use from any thread.
#[derive(Clone)]
pub struct WindowReader {
    shared: Arc<Shared>,
}

impl WindowReader {
    /// Copy the whole window, oldest frame first.
    ///
    /// Never alters the cursors. The result is always exactly
    /// [`capacity_bytes`](Self::capacity_bytes) long; before the producer has
    /// filled the window, the oldest part is silence.
    pub fn copy_window(&self) -> Result<Vec<u8>, ReplayError> {
        let mut window = Vec::new();
        self.copy_window_into(&mut window)?;
        Ok(window)
    }

    /// Like [`copy_window`](Self::copy_window), reusing `out`.
    pub fn copy_window_into(&self, out: &mut Vec<u8>) -> Result<(), ReplayError> {
        let shared = &self.shared;
        let capacity = shared.capacity_bytes();
        out.clear();
        out.try_reserve_exact(capacity).map_err(|e| {
            ReplayError::AllocationError(format!("failed to allocate {} byte snapshot: {}", capacity, e))
        })?;

        for attempt in 1..=MAX_SNAPSHOT_ATTEMPTS {
            out.clear();
            let end = shared.committed.load(Ordering::Acquire);
            let start = shared.read_cursor(end);

            let first_len = capacity.min(shared.storage_bytes() - start);
            let load = |slot: &AtomicU8| slot.load(Ordering::Relaxed);
            out.extend(shared.storage[start..start + first_len].iter().map(load));
            out.extend(shared.storage[..capacity - first_len].iter().map(load));

            fence(Ordering::Acquire);
            let claimed = shared.claimed.load(Ordering::Relaxed);
            if claimed.saturating_sub(end) <= shared.guard_frames {
                return Ok(());
            }
            log::debug!(
                "snapshot attempt {} overrun by {} frames, retrying",
                attempt,
                claimed - end
            );
        }

        out.clear();
        Err(ReplayError::SnapshotContended {
            attempts: MAX_SNAPSHOT_ATTEMPTS,
        })
    }

    pub fn capacity_bytes(&self) -> usize {
        self.shared.capacity_bytes()
    }

    pub fn capacity_frames(&self) -> usize {
        self.shared.capacity_frames as usize
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.shared.bytes_per_frame
    }

    /// Frames committed by the producer so far.
    pub fn frames_written(&self) -> u64 {
        self.shared.committed.load(Ordering::Acquire)
    }

    /// Whether the producer has delivered at least one full window.
    pub fn is_filled(&self) -> bool {
        self.frames_written() >= self.shared.capacity_frames
    }

    /// Byte offset where the next frame will be stored.
    pub fn write_cursor(&self) -> usize {
        self.shared.write_cursor(self.frames_written())
    }

    /// Byte offset of the oldest frame in the window.
    pub fn read_cursor(&self) -> usize {
        self.shared.read_cursor(self.frames_written())
    }

    /// Write and read cursors observed from the same counter value.
    pub fn cursors(&self) -> (usize, usize) {
        let frames = self.frames_written();
        (self.shared.write_cursor(frames), self.shared.read_cursor(frames))
    }

    /// Total size of the circular storage, guard region included.
    pub fn storage_bytes(&self) -> usize {
        self.shared.storage_bytes()
    }
}
