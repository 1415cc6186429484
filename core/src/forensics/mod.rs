//! Forensic-metrics pipeline: primary metrics, anomaly detection, and the
//! suspicious/consistent assessment, computed over recorded edit regions.
//! Pure functions; no I/O.

pub mod anomaly;
pub mod assessment;
pub mod metrics;

pub use anomaly::{Anomaly, AnomalyKind, Severity};
pub use assessment::Assessment;
pub use metrics::Metrics;

/// The minimal event/region view the forensic pipeline needs; decoupled from
/// the storage layer's row types so these functions stay pure.
#[derive(Debug, Clone, Copy)]
pub struct EventSample {
    pub timestamp_ns: i64,
    pub size_delta: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct RegionSample {
    pub start_pct: f32,
    pub delta_sign: i8,
}
