//! Anomaly detection over primary metrics and raw event/region samples.

use super::metrics::Metrics;
use super::{EventSample, RegionSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyKind {
    Monotonic,
    LowEntropy,
    Gap,
    HighVelocity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Alert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub severity: Severity,
}

const GAP_SECS: f64 = 24.0 * 3600.0;
const HIGH_VELOCITY_BYTES_PER_SEC: f64 = 100.0;
const HIGH_VELOCITY_MAX_INTERVAL_SECS: f64 = 60.0;

pub fn detect(metrics: &Metrics, events: &[EventSample], _regions: &[RegionSample]) -> Vec<Anomaly> {
    let mut out = Vec::new();

    if metrics.monotonic_append_ratio > 0.85 {
        out.push(Anomaly { kind: AnomalyKind::Monotonic, severity: Severity::Warning });
    }
    if metrics.edit_entropy > 0.0 && metrics.edit_entropy < 1.5 {
        out.push(Anomaly { kind: AnomalyKind::LowEntropy, severity: Severity::Warning });
    }

    let mut sorted: Vec<&EventSample> = events.iter().collect();
    sorted.sort_by_key(|e| e.timestamp_ns);
    for pair in sorted.windows(2) {
        let interval_secs = (pair[1].timestamp_ns - pair[0].timestamp_ns) as f64 * 1e-9;
        if interval_secs > GAP_SECS {
            out.push(Anomaly { kind: AnomalyKind::Gap, severity: Severity::Info });
        }
        if interval_secs > 0.0 && interval_secs < HIGH_VELOCITY_MAX_INTERVAL_SECS {
            let velocity = (pair[1].size_delta.unsigned_abs() as f64) / interval_secs;
            if velocity > HIGH_VELOCITY_BYTES_PER_SEC {
                out.push(Anomaly { kind: AnomalyKind::HighVelocity, severity: Severity::Warning });
            }
        }
    }

    out
}
