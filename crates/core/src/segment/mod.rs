use serde::{Deserialize, Serialize};

use crate::{BarTakeError, Result};

/// One equal-length division of a track's timeline, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

impl Segment {
    pub fn len(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0.0
    }

    pub fn contains(&self, seconds: f64) -> bool {
        self.start <= seconds && seconds < self.end
    }
}

/// Divides `[0, duration_seconds]` into `count` contiguous segments of equal
/// length. The last segment always ends exactly at `duration_seconds`.
pub fn segment(duration_seconds: f64, count: usize) -> Result<Vec<Segment>> {
    if count == 0 {
        return Err(BarTakeError::InvalidArgument(
            "segment count must be at least one",
        ));
    }
    if !duration_seconds.is_finite() || duration_seconds < 0.0 {
        return Err(BarTakeError::InvalidArgument(
            "duration must be a finite, non-negative number of seconds",
        ));
    }

    let length = duration_seconds / count as f64;
    let mut segments: Vec<Segment> = (0..count)
        .map(|index| Segment {
            index,
            start: index as f64 * length,
            end: (index + 1) as f64 * length,
        })
        .collect();

    if let Some(last) = segments.last_mut() {
        last.end = duration_seconds;
    }

    Ok(segments)
}

/// Index of the first segment containing `seconds`, if any.
pub fn active_segment(segments: &[Segment], seconds: f64) -> Option<usize> {
    segments
        .iter()
        .find(|segment| segment.contains(seconds))
        .map(|segment| segment.index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_tiles(segments: &[Segment], duration: f64) {
        assert_eq!(segments[0].start, 0.0);
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(segments[segments.len() - 1].end, duration);
    }

    #[test]
    fn divides_into_equal_bars() {
        let segments = segment(24.0, 8).unwrap();

        assert_eq!(segments.len(), 8);
        for (i, segment) in segments.iter().enumerate() {
            assert_eq!(segment.index, i);
            assert_eq!(segment.start, i as f64 * 3.0);
            assert_eq!(segment.end, (i + 1) as f64 * 3.0);
        }
        assert_tiles(&segments, 24.0);
    }

    #[test]
    fn awkward_durations_still_tile_exactly() {
        for duration in [0.0, 0.1, 1.0 / 3.0, 7.77, 213.456_789, 3600.0] {
            for count in [1, 3, 7, 8, 13] {
                let segments = segment(duration, count).unwrap();
                assert_eq!(segments.len(), count);
                assert_tiles(&segments, duration);
            }
        }
    }

    #[test]
    fn rejects_invalid_arguments() {
        assert!(matches!(
            segment(10.0, 0),
            Err(BarTakeError::InvalidArgument(_))
        ));
        assert!(matches!(
            segment(-1.0, 8),
            Err(BarTakeError::InvalidArgument(_))
        ));
        assert!(segment(f64::NAN, 8).is_err());
    }

    #[test]
    fn lookup_stays_on_segment_until_its_end() {
        let segments = segment(24.0, 8).unwrap();
        let bar = segments[2];

        let mut t = bar.start;
        while t < bar.end {
            assert_eq!(active_segment(&segments, t), Some(2));
            t += 0.125;
        }
        assert_eq!(active_segment(&segments, bar.end), Some(3));
    }

    #[test]
    fn end_of_track_matches_no_segment() {
        let segments = segment(24.0, 8).unwrap();
        assert_eq!(active_segment(&segments, 24.0), None);
        assert_eq!(active_segment(&segments, -0.5), None);
        assert_eq!(active_segment(&segments, 0.0), Some(0));
    }
}
