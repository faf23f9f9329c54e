use voxstream_foundation::error::{HostError, StreamError};

/// The pull-based audio producer a stream reads from. `read` is called from
/// a worker thread; returning `Ok(0)` signals end-of-stream, matching the
/// `n_read <= 0` convention the original read callback used.
pub trait AudioSource: Send {
    fn read(&mut self, out: &mut [f32]) -> Result<usize, StreamError>;
}

/// Drains a fixed in-memory buffer, used by scenario tests to script exact
/// audio content without a WAV file round-trip.
pub struct SliceSource {
    samples: Vec<f32>,
    pos: usize,
    chunk_cap: usize,
}

impl SliceSource {
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            samples,
            pos: 0,
            chunk_cap: usize::MAX,
        }
    }

    /// Limits how many samples are handed back per `read` call, to exercise
    /// the ring buffer's partial-fill loop in tests.
    pub fn with_chunk_cap(mut self, cap: usize) -> Self {
        self.chunk_cap = cap;
        self
    }
}

impl AudioSource for SliceSource {
    fn read(&mut self, out: &mut [f32]) -> Result<usize, StreamError> {
        let remaining = self.samples.len() - self.pos;
        if remaining == 0 {
            return Ok(0);
        }
        let n = remaining.min(out.len()).min(self.chunk_cap);
        out[..n].copy_from_slice(&self.samples[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Reads mono f32 samples from a WAV file, resampling is the caller's
/// responsibility — mirrors `coldvox-stt-whisper`'s use of `hound` for test
/// fixtures and offline transcription.
pub struct WavFileSource {
    reader: hound::WavReader<std::io::BufReader<std::fs::File>>,
}

impl WavFileSource {
    pub fn open(path: &std::path::Path) -> Result<Self, StreamError> {
        let reader = hound::WavReader::open(path).map_err(|e| {
            StreamError::Host(HostError::InvalidAudio(format!(
                "failed to open wav file {}: {e}",
                path.display()
            )))
        })?;
        let spec = reader.spec();
        if spec.channels != 1 || spec.sample_rate != crate::constants::SAMPLE_RATE_HZ {
            return Err(StreamError::Host(HostError::InvalidAudio(format!(
                "expected mono {}Hz wav, got {} channel(s) at {}Hz",
                crate::constants::SAMPLE_RATE_HZ,
                spec.channels,
                spec.sample_rate
            ))));
        }
        Ok(Self { reader })
    }
}

impl AudioSource for WavFileSource {
    fn read(&mut self, out: &mut [f32]) -> Result<usize, StreamError> {
        let mut n = 0;
        for (slot, sample) in out.iter_mut().zip(self.reader.samples::<i16>()) {
            let sample = sample.map_err(|e| {
                StreamError::Host(HostError::InvalidAudio(format!("wav decode error: {e}")))
            })?;
            *slot = sample as f32 / i16::MAX as f32;
            n += 1;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_source_reports_eof_when_drained() {
        let mut src = SliceSource::new(vec![0.1, 0.2, 0.3]);
        let mut buf = [0.0f32; 4];
        assert_eq!(src.read(&mut buf).unwrap(), 3);
        assert_eq!(src.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn slice_source_respects_chunk_cap() {
        let mut src = SliceSource::new(vec![0.0; 10]).with_chunk_cap(3);
        let mut buf = [0.0f32; 10];
        assert_eq!(src.read(&mut buf).unwrap(), 3);
        assert_eq!(src.read(&mut buf).unwrap(), 3);
        assert_eq!(src.read(&mut buf).unwrap(), 3);
        assert_eq!(src.read(&mut buf).unwrap(), 1);
        assert_eq!(src.read(&mut buf).unwrap(), 0);
    }
}
