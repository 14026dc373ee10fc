use serde::{Deserialize, Serialize};

use vdlx_core::Sample;

/// One fixed-width time bucket's aggregate over a sparse event series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub mean: f64,
    pub size: usize,
}

/// Summarizes a timestamp-ordered series into `bid_count` equal-duration
/// buckets for coarse time-course comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalBids {
    pub bid_count: usize,
}

impl Default for TemporalBids {
    fn default() -> Self {
        Self { bid_count: 5 }
    }
}

// Bid edges accumulate float error as they advance; points landing within
// this distance of an edge stay in the current bid.
const EDGE_EPSILON: f64 = 1e-6;

impl TemporalBids {
    pub fn new(bid_count: usize) -> Self {
        Self { bid_count }
    }

    /// Bins the points and reduces each bid to its mean and count. Bids
    /// that received no points are emitted as `mean = 0, size = 0`. Fewer
    /// points than bids cannot be usefully binned and yield nothing.
    pub fn get(&self, points: &[Sample]) -> Vec<Bid> {
        if self.bid_count == 0 || points.len() < self.bid_count {
            return Vec::new();
        }

        let first = points[0].timestamp;
        let last = points[points.len() - 1].timestamp;
        let width = (last - first) as f64 / self.bid_count as f64;

        let mut accumulators = vec![(0.0f64, 0usize); self.bid_count];
        let mut bid = 0usize;
        let mut edge = first as f64 + width;

        for point in points {
            while point.timestamp as f64 > edge + EDGE_EPSILON && bid + 1 < self.bid_count {
                bid += 1;
                edge += width;
            }
            accumulators[bid].0 += point.value;
            accumulators[bid].1 += 1;
        }

        accumulators
            .into_iter()
            .map(|(sum, size)| Bid {
                mean: if size > 0 { sum / size as f64 } else { 0.0 },
                size,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(timestamps_values: &[(i64, f64)]) -> Vec<Sample> {
        timestamps_values
            .iter()
            .map(|&(t, v)| Sample::new(t, v))
            .collect()
    }

    #[test]
    fn evenly_spaced_points_fill_bids_evenly() {
        let points: Vec<Sample> = (0..10).map(|i| Sample::new(i * 100, i as f64)).collect();

        let bids = TemporalBids::default().get(&points);

        assert_eq!(bids.len(), 5);
        assert!(bids.iter().all(|bid| bid.size == 2));
        assert_eq!(bids[0].mean, 0.5);
        assert_eq!(bids[4].mean, 8.5);
    }

    #[test]
    fn every_point_lands_in_exactly_one_bid() {
        let points = points(&[
            (0, 1.0),
            (7, 2.0),
            (13, 3.0),
            (14, 4.0),
            (90, 5.0),
            (95, 6.0),
            (100, 7.0),
        ]);

        let bids = TemporalBids::default().get(&points);

        assert_eq!(bids.iter().map(|bid| bid.size).sum::<usize>(), points.len());
    }

    #[test]
    fn empty_bids_are_emitted_as_zero() {
        // Everything clusters at both ends, leaving the middle bids empty.
        let points = points(&[(0, 2.0), (10, 4.0), (990, 6.0), (1000, 8.0), (1000, 10.0)]);

        let bids = TemporalBids::default().get(&points);

        assert_eq!(bids.len(), 5);
        assert_eq!(bids[0].size, 2);
        assert_eq!(bids[0].mean, 3.0);
        assert_eq!(bids[1], Bid { mean: 0.0, size: 0 });
        assert_eq!(bids[2], Bid { mean: 0.0, size: 0 });
        assert_eq!(bids[3], Bid { mean: 0.0, size: 0 });
        assert_eq!(bids[4].size, 3);
        assert_eq!(bids[4].mean, 8.0);
    }

    #[test]
    fn too_few_points_yield_nothing() {
        assert!(TemporalBids::default().get(&[]).is_empty());
        assert!(
            TemporalBids::default()
                .get(&points(&[(0, 1.0), (10, 2.0)]))
                .is_empty()
        );
    }
}
