//! Profile builder: aggregates metrics, anomalies, and an optional
//! correlator report into a single `AuthorshipProfile` with a verdict.

use crate::correlator::{self, Report as CorrelatorReport};
use crate::forensics::{self, Anomaly, Assessment, EventSample, Metrics, RegionSample};

#[derive(Debug, Clone)]
pub struct AuthorshipProfile {
    pub file_path: String,
    pub event_count: usize,
    pub metrics: Option<Metrics>,
    pub anomalies: Vec<Anomaly>,
    pub assessment: Assessment,
    pub correlator_report: Option<CorrelatorReport>,
}

pub fn build(
    file_path: &str,
    events: &[EventSample],
    regions: &[RegionSample],
    correlator_input: Option<correlator::Input>,
) -> AuthorshipProfile {
    let metrics = forensics::metrics::compute(events, regions);
    let anomalies = metrics
        .as_ref()
        .map(|m| forensics::anomaly::detect(m, events, regions))
        .unwrap_or_default();
    let assessment = forensics::assessment::assess(metrics.as_ref(), &anomalies, events.len());
    let correlator_report = correlator_input.map(correlator::correlate);

    AuthorshipProfile {
        file_path: file_path.to_string(),
        event_count: events.len(),
        metrics,
        anomalies,
        assessment,
        correlator_report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn few_events_yields_insufficient_assessment() {
        let profile = build("a.txt", &[], &[], None);
        assert_eq!(profile.assessment, Assessment::Insufficient);
        assert!(profile.metrics.is_none());
    }

    #[test]
    fn profile_carries_correlator_report_when_supplied() {
        let profile = build(
            "a.txt",
            &[],
            &[],
            Some(correlator::Input {
                document_length: 850.0,
                total_keystrokes: 1000.0,
                detected_paste_chars: 0.0,
                autocomplete_chars: 0.0,
                suspicious_bursts: 0,
                edit_ratio: None,
            }),
        );
        assert!(profile.correlator_report.is_some());
    }
}
