use crate::source::AudioSource;
use voxstream_foundation::error::StreamError;

/// Bounded sample buffer a [`crate::chunker::Chunker`] pulls into and shifts
/// after each chunk is handed to a worker. Capacity is fixed at
/// `max_chunk_samples + overlap_samples`, sized once per stream.
pub struct RingBuffer {
    samples: Vec<f32>,
    capacity: usize,
    scratch: Vec<f32>,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            scratch: vec![0.0; capacity],
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    /// Pulls from `source` until the buffer holds at least `target_len`
    /// samples or the source reaches end-of-stream. Mirrors
    /// `fill_read_buffer`'s loop, including the "short read" retry.
    pub fn fill(&mut self, source: &mut dyn AudioSource, target_len: usize) -> Result<bool, StreamError> {
        let target_len = target_len.min(self.capacity);
        let mut eof = false;
        while self.samples.len() < target_len && !eof {
            let capacity_left = self.capacity - self.samples.len();
            if capacity_left == 0 {
                break;
            }
            let n = source.read(&mut self.scratch[..capacity_left])?;
            if n == 0 {
                eof = true;
                break;
            }
            self.samples.extend_from_slice(&self.scratch[..n]);
        }
        Ok(eof)
    }

    /// Drops everything before `keep_start`, retaining the overlap tail for
    /// the next chunk. Returns the number of samples retained. Mirrors
    /// `handoff_to_next`'s `memmove`.
    pub fn advance(&mut self, actual_chunk_samples: usize, overlap_samples: usize) -> usize {
        let keep_start = actual_chunk_samples.saturating_sub(overlap_samples);
        debug_assert!(keep_start <= self.samples.len());
        let keep_start = keep_start.min(self.samples.len());
        let keep_len = self.samples.len() - keep_start;
        if keep_len > 0 {
            self.samples.drain(0..keep_start);
        } else {
            self.samples.clear();
        }
        keep_len
    }
}
