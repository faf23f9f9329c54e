use voxstream_foundation::error::{ConfigError, StreamError};
use voxstream_vad::VoiceActivityModel;

use crate::boundary;
use crate::ring_buffer::RingBuffer;
use crate::source::AudioSource;

/// Sizing and silence-detection parameters for a single stream. Mirrors
/// `whisper_stream_default_params`'s chunking fields (min_chunk_ms=30000,
/// chunk_extend_ms=20000, overlap_ms=300, min_silence_ms=300), expressed in
/// milliseconds so callers don't have to do the sample-rate math.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub min_chunk_ms: u32,
    pub chunk_extend_ms: u32,
    pub overlap_ms: u32,
    pub min_silence_ms: u32,
    pub sample_rate_hz: u32,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            min_chunk_ms: 30_000,
            chunk_extend_ms: 20_000,
            overlap_ms: 300,
            min_silence_ms: 300,
            sample_rate_hz: crate::constants::SAMPLE_RATE_HZ,
        }
    }
}

impl ChunkerConfig {
    fn samples_for_ms(&self, ms: u32) -> usize {
        (ms as u64 * self.sample_rate_hz as u64 / 1000) as usize
    }

    pub fn min_chunk_samples(&self) -> usize {
        self.samples_for_ms(self.min_chunk_ms)
    }

    pub fn max_chunk_samples(&self) -> usize {
        self.samples_for_ms(self.min_chunk_ms + self.chunk_extend_ms)
    }

    pub fn overlap_samples(&self) -> usize {
        self.samples_for_ms(self.overlap_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if self.min_chunk_samples() == 0 {
            return Err(ConfigError::ZeroMinChunk);
        }
        if self.overlap_samples() >= self.min_chunk_samples() {
            return Err(ConfigError::OverlapTooLarge {
                overlap_ms: self.overlap_ms,
                min_chunk_ms: self.min_chunk_ms,
            });
        }
        Ok(())
    }
}

/// Everything a worker needs to run inference on one chunk and, afterwards,
/// tell the chunker to advance past it. `audio` includes the overlap prefix
/// carried from the previous chunk.
#[derive(Debug, Clone)]
pub struct ChunkDescriptor {
    /// Samples at the front of `audio` that were already part of the
    /// previous chunk (decoder context, not fresh speech).
    pub overlap_offset: usize,
    /// Total samples in `audio`, including the overlap prefix.
    pub chunk_samples: usize,
    /// Fresh samples beyond the overlap prefix that this chunk advances the
    /// stream by.
    pub actual_samples: usize,
    /// Stream-time position, in centiseconds, of `audio[0]`. Segment
    /// timestamps returned by the engine are relative to this chunk and must
    /// be added to this offset before being reported to the host.
    pub time_offset_cs: i64,
    /// Total fresh samples advanced before this chunk started.
    pub samples_before: usize,
    /// Set once the tail of the stream has been folded into this chunk; no
    /// further chunks will follow.
    pub is_last: bool,
}

#[derive(Debug, Clone)]
pub struct PreparedChunk {
    pub descriptor: ChunkDescriptor,
    pub audio: Vec<f32>,
}

/// Pulls audio from a source, buffers it, and cuts it into overlapping
/// chunks at VAD-chosen silence boundaries. Grounded in `process_one_chunk`
/// and `make_chunk_info`, reshaped from a single imperative function into a
/// struct a worker thread can call `prepare_chunk`/`advance` on in a loop.
pub struct Chunker {
    ring: RingBuffer,
    cfg: ChunkerConfig,
    current_overlap: usize,
    total_samples: usize,
    eof: bool,
}

impl Chunker {
    pub fn new(cfg: ChunkerConfig) -> Result<Self, StreamError> {
        cfg.validate().map_err(StreamError::Config)?;
        let capacity = cfg.max_chunk_samples() + cfg.overlap_samples();
        Ok(Self {
            ring: RingBuffer::new(capacity),
            cfg,
            current_overlap: 0,
            total_samples: 0,
            eof: false,
        })
    }

    pub fn is_eof(&self) -> bool {
        self.eof && self.ring.len() <= self.current_overlap
    }

    /// Fills the buffer, selects a boundary, and returns the next chunk. When
    /// the source is exhausted and every remaining sample has already been
    /// emitted, returns `Ok(None)`.
    pub fn prepare_chunk(
        &mut self,
        source: &mut dyn AudioSource,
        vad: Option<&mut dyn VoiceActivityModel>,
    ) -> Result<Option<PreparedChunk>, StreamError> {
        if self.is_eof() {
            return Ok(None);
        }

        let target_len = self.cfg.max_chunk_samples() + self.current_overlap;
        self.eof = self.ring.fill(source, target_len)?;

        let available = self.ring.len().saturating_sub(self.current_overlap);
        if available == 0 {
            return Ok(None);
        }

        let min_chunk_samples = self.cfg.min_chunk_samples();
        let max_chunk_samples = self.cfg.max_chunk_samples();

        if !self.eof && available < min_chunk_samples {
            // Source gave us less than requested without signalling EOF;
            // caller should retry once more data is available.
            return Ok(None);
        }

        let mut fresh_samples = if available <= min_chunk_samples {
            available
        } else {
            let vad_segs = match vad {
                None => None,
                Some(vad) => match boundary::vad_window(available, min_chunk_samples, max_chunk_samples) {
                    Some((vad_start, vad_len)) => {
                        let window_start = self.current_overlap + vad_start;
                        let segs = vad
                            .detect_speech(
                                &self.ring.as_slice()[window_start..window_start + vad_len],
                                self.cfg.min_silence_ms,
                            )
                            .map_err(|e| {
                                StreamError::Engine(voxstream_foundation::error::EngineError::VadFailed(e))
                            })?;
                        Some((segs, vad_start))
                    }
                    None => None,
                },
            };

            let boundary = boundary::find_chunk_boundary(
                min_chunk_samples,
                max_chunk_samples,
                available,
                vad_segs.as_ref().map(|(s, _)| s),
                vad_segs.as_ref().map(|(_, o)| *o).unwrap_or(0),
                self.cfg.min_silence_ms,
                self.cfg.sample_rate_hz,
            );
            boundary.samples
        };

        // EOF tail absorption: don't leave a dangling fragment shorter than
        // min_chunk_samples for the next (nonexistent) chunk.
        let is_last = if self.eof && available.saturating_sub(fresh_samples) < min_chunk_samples {
            fresh_samples = available;
            true
        } else {
            self.eof && fresh_samples >= available
        };

        let overlap_offset = self.current_overlap;
        let chunk_samples = overlap_offset + fresh_samples;
        let time_offset_cs = 100 * (self.total_samples as i64 - overlap_offset as i64)
            / self.cfg.sample_rate_hz as i64;

        let descriptor = ChunkDescriptor {
            overlap_offset,
            chunk_samples,
            actual_samples: fresh_samples,
            time_offset_cs,
            samples_before: self.total_samples,
            is_last,
        };

        let audio = self.ring.as_slice()[..chunk_samples].to_vec();

        Ok(Some(PreparedChunk { descriptor, audio }))
    }

    /// Advances the ring buffer past a chunk the worker has finished with,
    /// keeping the configured overlap tail for the next chunk.
    pub fn advance(&mut self, descriptor: &ChunkDescriptor) {
        let overlap_samples = self.cfg.overlap_samples();
        self.current_overlap = self
            .ring
            .advance(descriptor.chunk_samples, overlap_samples)
            .min(overlap_samples);
        self.total_samples += descriptor.actual_samples;
    }
}
