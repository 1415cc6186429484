//! The five primary metrics computed over a file's events and edit regions.

use super::{EventSample, RegionSample};

const MONOTONIC_THRESHOLD: f32 = 0.95;
const ENTROPY_BINS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub monotonic_append_ratio: f64,
    pub edit_entropy: f64,
    pub median_interval_secs: f64,
    pub pos_neg_ratio: f64,
    pub deletion_clustering: f64,
}

/// Requires at least 5 events with at least one edit region total; returns
/// `None` (the caller's `InsufficientData`) otherwise.
pub fn compute(events: &[EventSample], regions: &[RegionSample]) -> Option<Metrics> {
    if events.len() < 5 || regions.is_empty() {
        return None;
    }
    Some(Metrics {
        monotonic_append_ratio: monotonic_append_ratio(regions),
        edit_entropy: edit_entropy(regions),
        median_interval_secs: median_interval_secs(events),
        pos_neg_ratio: pos_neg_ratio(regions),
        deletion_clustering: deletion_clustering(regions),
    })
}

fn monotonic_append_ratio(regions: &[RegionSample]) -> f64 {
    let at_tail = regions.iter().filter(|r| r.start_pct >= MONOTONIC_THRESHOLD).count();
    at_tail as f64 / regions.len() as f64
}

fn edit_entropy(regions: &[RegionSample]) -> f64 {
    let mut bins = [0u64; ENTROPY_BINS];
    for r in regions {
        let p = r.start_pct.clamp(0.0, 0.999_999);
        let bin = (p * ENTROPY_BINS as f32) as usize;
        bins[bin.min(ENTROPY_BINS - 1)] += 1;
    }
    let n = regions.len() as f64;
    bins.iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.log2()
        })
        .sum()
}

fn median_interval_secs(events: &[EventSample]) -> f64 {
    let mut sorted: Vec<i64> = events.iter().map(|e| e.timestamp_ns).collect();
    sorted.sort_unstable();
    let mut intervals: Vec<f64> = sorted.windows(2).map(|w| (w[1] - w[0]) as f64 * 1e-9).collect();
    if intervals.is_empty() {
        return 0.0;
    }
    intervals.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = intervals.len() / 2;
    if intervals.len() % 2 == 0 {
        (intervals[mid - 1] + intervals[mid]) / 2.0
    } else {
        intervals[mid]
    }
}

fn pos_neg_ratio(regions: &[RegionSample]) -> f64 {
    let positive = regions.iter().filter(|r| r.delta_sign > 0).count();
    let nonzero = regions.iter().filter(|r| r.delta_sign != 0).count();
    if nonzero == 0 {
        0.5
    } else {
        positive as f64 / nonzero as f64
    }
}

/// Nearest-neighbor mean distance of deletion positions, divided by the
/// expected uniform spacing `1/(n+1)` for `n` deletions in `[0,1]`.
fn deletion_clustering(regions: &[RegionSample]) -> f64 {
    let mut positions: Vec<f32> = regions
        .iter()
        .filter(|r| r.delta_sign < 0)
        .map(|r| r.start_pct)
        .collect();
    if positions.len() < 2 {
        return 0.0;
    }
    positions.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = positions.len();
    let mut nn_sum = 0.0f64;
    for i in 0..n {
        let mut best = f64::MAX;
        if i > 0 {
            best = best.min((positions[i] - positions[i - 1]).abs() as f64);
        }
        if i + 1 < n {
            best = best.min((positions[i + 1] - positions[i]).abs() as f64);
        }
        nn_sum += best;
    }
    let mean_nn = nn_sum / n as f64;
    let expected = 1.0 / (n as f64 + 1.0);
    mean_nn / expected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(n: usize) -> Vec<EventSample> {
        (0..n)
            .map(|i| EventSample {
                timestamp_ns: i as i64 * 1_000_000_000,
                size_delta: 1,
            })
            .collect()
    }

    #[test]
    fn insufficient_data_below_five_events() {
        let regions = vec![RegionSample { start_pct: 0.5, delta_sign: 1 }];
        assert!(compute(&events(4), &regions).is_none());
    }

    #[test]
    fn insufficient_data_with_no_regions() {
        assert!(compute(&events(5), &[]).is_none());
    }

    #[test]
    fn entropy_single_bin_is_zero() {
        let regions: Vec<_> = (0..10).map(|_| RegionSample { start_pct: 0.05, delta_sign: 1 }).collect();
        assert_eq!(edit_entropy(&regions), 0.0);
    }

    #[test]
    fn entropy_of_k_equal_bins_is_log2_k() {
        let mut regions = Vec::new();
        for bin in 0..4 {
            let p = bin as f32 / 20.0 + 0.001;
            for _ in 0..5 {
                regions.push(RegionSample { start_pct: p, delta_sign: 1 });
            }
        }
        let h = edit_entropy(&regions);
        assert!((h - (4.0f64).log2()).abs() < 1e-6);
    }

    #[test]
    fn deletion_clustering_below_two_deletions_is_zero() {
        let regions = vec![RegionSample { start_pct: 0.5, delta_sign: -1 }];
        assert_eq!(deletion_clustering(&regions), 0.0);
    }

    #[test]
    fn pos_neg_ratio_neutral_when_all_zero() {
        let regions = vec![RegionSample { start_pct: 0.1, delta_sign: 0 }];
        assert_eq!(pos_neg_ratio(&regions), 0.5);
    }

    #[test]
    fn median_interval_of_even_count_averages_middle_two() {
        let evs = vec![
            EventSample { timestamp_ns: 0, size_delta: 0 },
            EventSample { timestamp_ns: 1_000_000_000, size_delta: 0 },
            EventSample { timestamp_ns: 3_000_000_000, size_delta: 0 },
            EventSample { timestamp_ns: 6_000_000_000, size_delta: 0 },
        ];
        assert_eq!(median_interval_secs(&evs), 2.5);
    }
}
