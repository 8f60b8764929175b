use serde::{Deserialize, Serialize};

/// Amplitude extremes for one rendered pixel column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveformColumn {
    pub min: f32,
    pub max: f32,
}

impl WaveformColumn {
    /// Value emitted for a window that holds no samples. It is inverted
    /// (`min > max`), which draws as a flat column.
    pub const EMPTY: Self = Self {
        min: 1.0,
        max: -1.0,
    };

    /// Returns `true` when the column came from an empty window.
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// Maps the column onto a surface `height` units tall, returning the
    /// vertical coordinates of `min` and `max` in that order.
    pub fn vertical_extent(&self, height: f32) -> (f32, f32) {
        (
            (1.0 + self.min) * 0.5 * height,
            (1.0 + self.max) * 0.5 * height,
        )
    }
}

/// Summarises `samples` into exactly `width` columns of `len / width`
/// samples each. The trailing remainder that does not fill a window is
/// dropped.
///
/// When `samples.len() < width` the window size is zero and every column is
/// [`WaveformColumn::EMPTY`].
pub fn summarize(samples: &[f32], width: usize) -> Vec<WaveformColumn> {
    if width == 0 {
        return Vec::new();
    }

    let window = samples.len() / width;
    (0..width)
        .map(|column| {
            let start = column * window;
            samples[start..start + window].iter().fold(
                WaveformColumn::EMPTY,
                |mut acc, &sample| {
                    if sample < acc.min {
                        acc.min = sample;
                    }
                    if sample > acc.max {
                        acc.max = sample;
                    }
                    acc
                },
            )
        })
        .collect()
}

/// Builds the connected point path used to stroke a summary: a start point on
/// the centre line followed by the `min` and `max` points of every column.
pub fn polyline(columns: &[WaveformColumn], height: f32) -> Vec<(f32, f32)> {
    let mut points = Vec::with_capacity(columns.len() * 2 + 1);
    points.push((0.0, height * 0.5));
    for (x, column) in columns.iter().enumerate() {
        let (low, high) = column.vertical_extent(height);
        points.push((x as f32, low));
        points.push((x as f32, high));
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternating_signal_fills_every_column() {
        let samples: Vec<f32> = (0..1000)
            .map(|i| if i % 2 == 0 { -1.0 } else { 1.0 })
            .collect();
        let columns = summarize(&samples, 100);

        assert_eq!(columns.len(), 100);
        for column in &columns {
            assert_eq!(column.min, -1.0);
            assert_eq!(column.max, 1.0);
        }
    }

    #[test]
    fn column_count_matches_width_for_any_input() {
        let samples: Vec<f32> = (0..977).map(|i| ((i as f32) * 0.37).sin()).collect();
        for width in [1, 2, 7, 100, 977, 1500] {
            let columns = summarize(&samples, width);
            assert_eq!(columns.len(), width);
            assert!(columns
                .iter()
                .filter(|c| !c.is_empty())
                .all(|c| c.min <= c.max));
        }
    }

    #[test]
    fn short_input_produces_degenerate_columns() {
        let columns = summarize(&[0.5, -0.5], 4);
        assert_eq!(columns, vec![WaveformColumn::EMPTY; 4]);

        let columns = summarize(&[], 3);
        assert_eq!(columns.len(), 3);
        assert!(columns.iter().all(WaveformColumn::is_empty));
    }

    #[test]
    fn trailing_remainder_is_dropped() {
        // Window size is 2; the final 0.9 does not fill a window.
        let columns = summarize(&[0.1, 0.2, -0.3, 0.4, 0.9], 2);
        assert_eq!(columns[0], WaveformColumn { min: 0.1, max: 0.2 });
        assert_eq!(columns[1], WaveformColumn { min: -0.3, max: 0.4 });
    }

    #[test]
    fn zero_width_is_empty() {
        assert!(summarize(&[0.0; 16], 0).is_empty());
    }

    #[test]
    fn polyline_maps_extremes_onto_height() {
        let columns = [
            WaveformColumn { min: -1.0, max: 1.0 },
            WaveformColumn { min: 0.0, max: 0.5 },
        ];
        let points = polyline(&columns, 80.0);

        assert_eq!(
            points,
            vec![(0.0, 40.0), (0.0, 0.0), (0.0, 80.0), (1.0, 40.0), (1.0, 60.0)]
        );
    }
}
