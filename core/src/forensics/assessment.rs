//! The suspicious/consistent assessment, folding metrics and anomalies
//! together with the raw event count.

use super::anomaly::{Anomaly, Severity};
use super::metrics::Metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    Insufficient,
    Consistent,
    Suspicious,
}

pub fn assess(metrics: Option<&Metrics>, anomalies: &[Anomaly], event_count: usize) -> Assessment {
    let Some(metrics) = metrics else {
        return Assessment::Insufficient;
    };
    if event_count < 10 {
        return Assessment::Insufficient;
    }

    let indicators = [
        metrics.monotonic_append_ratio > 0.90,
        metrics.edit_entropy > 0.0 && metrics.edit_entropy < 1.0,
        metrics.pos_neg_ratio > 0.95,
        (0.9..=1.1).contains(&metrics.deletion_clustering),
    ]
    .iter()
    .filter(|&&b| b)
    .count();

    let alert_count = anomalies.iter().filter(|a| a.severity == Severity::Alert).count();
    let warning_count = anomalies.iter().filter(|a| a.severity == Severity::Warning).count();

    if alert_count >= 2 || indicators >= 3 || (warning_count >= 3 && indicators >= 2) {
        Assessment::Suspicious
    } else {
        Assessment::Consistent
    }
}
