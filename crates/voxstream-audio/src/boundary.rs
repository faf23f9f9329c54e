//! Pure chunk-boundary selection over VAD output. Ported sample-for-sample
//! from `find_chunk_boundary`/`find_silence_in_segments`/`check_gap`, with no
//! side effects so it can be exhaustively unit tested without a real VAD
//! model or audio source.

use voxstream_vad::VadSegments;

/// A chunk boundary in samples, plus whether it was chosen because a long
/// enough silence was found (as opposed to falling back to the max chunk
/// length).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    pub samples: usize,
    pub silence_found: bool,
}

/// Picks where to end the current chunk.
///
/// `available` is the number of fresh (non-overlap) samples currently
/// buffered. `vad_segs`, if present, covers a window starting `vad_offset`
/// samples into the fresh audio. Returns a sample count in `[0, available]`.
pub fn find_chunk_boundary(
    min_chunk_samples: usize,
    max_chunk_samples: usize,
    available: usize,
    vad_segs: Option<&VadSegments>,
    vad_offset: usize,
    min_silence_ms: u32,
    sample_rate_hz: u32,
) -> Boundary {
    let search_start = min_chunk_samples;
    let search_end = max_chunk_samples.min(available);

    if search_start >= search_end {
        return Boundary {
            samples: search_end,
            silence_found: false,
        };
    }

    let Some(segs) = vad_segs else {
        return Boundary {
            samples: search_start,
            silence_found: false,
        };
    };

    if let Some(pos) = find_silence_in_segments(
        segs,
        search_start,
        search_end,
        min_silence_ms,
        vad_offset,
        sample_rate_hz,
    ) {
        if pos > 0 {
            return Boundary {
                samples: pos,
                silence_found: true,
            };
        }
    }

    Boundary {
        samples: search_end,
        silence_found: false,
    }
}

fn find_silence_in_segments(
    segs: &VadSegments,
    range_start_samples: usize,
    range_end_samples: usize,
    min_silence_ms: u32,
    vad_offset: usize,
    sample_rate_hz: u32,
) -> Option<usize> {
    if segs.is_empty() {
        return None;
    }

    let vad_offset_cs = (vad_offset as i64 * 100) / sample_rate_hz as i64;
    let range_start_cs = (range_start_samples as i64 * 100) / sample_rate_hz as i64;
    let range_end_cs = (range_end_samples as i64 * 100) / sample_rate_hz as i64;

    let n_segs = segs.len();
    for i in 0..n_segs.saturating_sub(1) {
        let gap_start = segs.get(i).unwrap().t1_cs + vad_offset_cs;
        let gap_end = segs.get(i + 1).unwrap().t0_cs + vad_offset_cs;

        if gap_end <= range_start_cs {
            continue;
        }
        if gap_start >= range_end_cs {
            break;
        }

        if let Some(pos) = check_gap(
            gap_start,
            gap_end,
            range_start_cs,
            range_end_cs,
            min_silence_ms,
            sample_rate_hz,
        ) {
            return Some(pos);
        }
    }

    let last_end = segs.get(n_segs - 1).unwrap().t1_cs + vad_offset_cs;
    check_gap(
        last_end,
        range_end_cs,
        range_start_cs,
        range_end_cs,
        min_silence_ms,
        sample_rate_hz,
    )
}

fn check_gap(
    gap_start_cs: i64,
    gap_end_cs: i64,
    range_start_cs: i64,
    range_end_cs: i64,
    min_silence_ms: u32,
    sample_rate_hz: u32,
) -> Option<usize> {
    let gap_ms = (gap_end_cs - gap_start_cs) * 10;
    if gap_ms < min_silence_ms as i64 {
        return None;
    }
    if gap_start_cs >= range_end_cs || gap_end_cs <= range_start_cs {
        return None;
    }

    let gap_middle_cs = ((gap_start_cs + gap_end_cs) / 2).clamp(range_start_cs, range_end_cs);
    Some((gap_middle_cs * sample_rate_hz as i64 / 100) as usize)
}

/// Computes the window, relative to the fresh (non-overlap) audio, that VAD
/// should run over: starting `VAD_LOOKAHEAD_MARGIN_SAMPLES` before the
/// minimum chunk boundary (clamped to 0) and extending to the max chunk
/// boundary or the end of available audio, whichever is shorter.
pub fn vad_window(
    available: usize,
    min_chunk_samples: usize,
    max_chunk_samples: usize,
) -> Option<(usize, usize)> {
    let margin = crate::constants::VAD_LOOKAHEAD_MARGIN_SAMPLES;
    let vad_start = min_chunk_samples.saturating_sub(margin);

    if vad_start >= available {
        return None;
    }

    let vad_len = (available - vad_start).min(max_chunk_samples.saturating_sub(vad_start));
    if vad_len == 0 {
        return None;
    }

    Some((vad_start, vad_len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxstream_vad::VadSegment;

    const SR: u32 = 16_000;

    fn samples_for_ms(ms: i64) -> usize {
        (ms * SR as i64 / 1000) as usize
    }

    #[test]
    fn falls_back_to_min_chunk_when_search_range_empty() {
        let b = find_chunk_boundary(100, 100, 50, None, 0, 300, SR);
        assert_eq!(b.samples, 50);
        assert!(!b.silence_found);
    }

    #[test]
    fn uses_min_chunk_when_no_vad_segments() {
        let b = find_chunk_boundary(
            samples_for_ms(30_000),
            samples_for_ms(50_000),
            samples_for_ms(50_000),
            None,
            0,
            300,
            SR,
        );
        assert_eq!(b.samples, samples_for_ms(30_000));
        assert!(!b.silence_found);
    }

    #[test]
    fn falls_back_to_max_chunk_when_no_silence_long_enough() {
        let segs = VadSegments::new(vec![VadSegment {
            t0_cs: 0,
            t1_cs: 5000, // one continuous 50s "speech" segment
        }]);
        let b = find_chunk_boundary(
            samples_for_ms(30_000),
            samples_for_ms(50_000),
            samples_for_ms(50_000),
            Some(&segs),
            0,
            300,
            SR,
        );
        assert_eq!(b.samples, samples_for_ms(50_000));
        assert!(!b.silence_found);
    }

    #[test]
    fn picks_midpoint_of_a_long_enough_gap() {
        // speech 0-31s, silence 31-32s, speech 32-50s
        let segs = VadSegments::new(vec![
            VadSegment {
                t0_cs: 0,
                t1_cs: 3100,
            },
            VadSegment {
                t0_cs: 3200,
                t1_cs: 5000,
            },
        ]);
        let b = find_chunk_boundary(
            samples_for_ms(30_000),
            samples_for_ms(50_000),
            samples_for_ms(50_000),
            Some(&segs),
            0,
            300,
            SR,
        );
        assert!(b.silence_found);
        // midpoint of the gap at 31.0s-32.0s is 31.5s
        assert_eq!(b.samples, samples_for_ms(31_500));
    }

    #[test]
    fn vad_window_clamps_start_to_zero_for_short_buffers() {
        let w = vad_window(samples_for_ms(3_000), samples_for_ms(30_000), samples_for_ms(50_000));
        assert!(w.is_none());
    }

    #[test]
    fn vad_window_applies_lookahead_margin() {
        let available = samples_for_ms(40_000);
        let (start, len) = vad_window(available, samples_for_ms(30_000), samples_for_ms(50_000)).unwrap();
        assert_eq!(start, samples_for_ms(30_000) - crate::constants::VAD_LOOKAHEAD_MARGIN_SAMPLES);
        assert_eq!(start + len, available);
    }
}
