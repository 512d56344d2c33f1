//! Run summary.

use hdrhistogram::Histogram;
use indexmap::IndexMap;
use std::time::Duration;
use tracing::{info, warn};
use tracklab_core::Collection;
use tracklab_types::EventIndex;

/// An event aborted by a stage or writer failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEvent {
    pub event: EventIndex,
    /// Stage name, or `writer:<name>` for output failures.
    pub stage: String,
    pub reason: String,
}

/// Outcome of a single event.
#[derive(Debug, Clone)]
pub(crate) enum EventOutcome {
    Succeeded {
        latency: Duration,
        counts: Vec<(Collection, usize)>,
    },
    Failed(FailedEvent),
    Skipped,
}

/// Event-latency percentiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencySummary {
    pub p50: Duration,
    pub p90: Duration,
    pub p99: Duration,
    pub max: Duration,
}

/// Aggregate result of [`Sequencer::run`](crate::Sequencer::run).
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub requested: u64,
    pub succeeded: u64,
    /// Failed events in index order.
    pub failed: Vec<FailedEvent>,
    /// Events not started because the run was stopped.
    pub skipped: u64,
    /// Final size of each collection summed over succeeded events, in
    /// pipeline order.
    pub totals: IndexMap<Collection, u64>,
    pub latency: LatencySummary,
    pub wall_time: Duration,
}

impl RunSummary {
    /// Aggregate per-event outcomes, given in event index order.
    pub(crate) fn collect(
        requested: u64,
        outcomes: Vec<(EventIndex, EventOutcome)>,
        wall_time: Duration,
    ) -> Self {
        // Three significant figures, microseconds up to one hour.
        let mut histogram = Histogram::<u64>::new_with_bounds(1, 3_600_000_000, 3).ok();
        let mut summary = RunSummary {
            requested,
            succeeded: 0,
            failed: Vec::new(),
            skipped: 0,
            totals: IndexMap::new(),
            latency: LatencySummary::default(),
            wall_time,
        };

        for (_, outcome) in outcomes {
            match outcome {
                EventOutcome::Succeeded { latency, counts } => {
                    summary.succeeded += 1;
                    for (collection, count) in counts {
                        *summary.totals.entry(collection).or_insert(0) += count as u64;
                    }
                    if let Some(histogram) = histogram.as_mut() {
                        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
                        histogram.saturating_record(micros.max(1));
                    }
                }
                EventOutcome::Failed(failed) => summary.failed.push(failed),
                EventOutcome::Skipped => summary.skipped += 1,
            }
        }

        if let Some(histogram) = histogram.filter(|h| h.len() > 0) {
            let at = |q: f64| Duration::from_micros(histogram.value_at_quantile(q));
            summary.latency = LatencySummary {
                p50: at(0.5),
                p90: at(0.9),
                p99: at(0.99),
                max: Duration::from_micros(histogram.max()),
            };
        }
        summary
    }

    /// Whether every requested event was processed successfully.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped == 0 && self.succeeded == self.requested
    }

    pub fn log(&self) {
        info!(
            requested = self.requested,
            succeeded = self.succeeded,
            failed = self.failed.len(),
            skipped = self.skipped,
            wall_time_ms = self.wall_time.as_millis() as u64,
            p50_us = self.latency.p50.as_micros() as u64,
            p99_us = self.latency.p99.as_micros() as u64,
            "Run finished"
        );
        for (collection, total) in &self.totals {
            info!(collection = %collection, total, "Collection total");
        }
        for failed in &self.failed {
            warn!(
                event = failed.event.0,
                stage = %failed.stage,
                reason = %failed.reason,
                "Event failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn succeeded(micros: u64, tracks: usize) -> EventOutcome {
        EventOutcome::Succeeded {
            latency: Duration::from_micros(micros),
            counts: vec![(Collection::Seeds, 2 * tracks), (Collection::Tracks, tracks)],
        }
    }

    #[traced_test]
    #[test]
    fn test_collect_aggregates_outcomes() {
        let outcomes = vec![
            (EventIndex(0), succeeded(100, 1)),
            (
                EventIndex(1),
                EventOutcome::Failed(FailedEvent {
                    event: EventIndex(1),
                    stage: "tracking".to_string(),
                    reason: "bad".to_string(),
                }),
            ),
            (EventIndex(2), succeeded(300, 2)),
            (EventIndex(3), EventOutcome::Skipped),
        ];
        let summary = RunSummary::collect(4, outcomes, Duration::from_millis(5));

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].event, EventIndex(1));
        assert!(!summary.is_complete());
        assert_eq!(summary.totals[&Collection::Tracks], 3);
        assert_eq!(
            summary.totals.keys().copied().collect::<Vec<_>>(),
            vec![Collection::Seeds, Collection::Tracks]
        );
        assert!(summary.latency.max >= Duration::from_micros(299));
        assert!(summary.latency.p50 <= summary.latency.max);

        summary.log();
        assert!(logs_contain("Run finished"));
        assert!(logs_contain("Event failed"));
    }

    #[test]
    fn test_empty_run() {
        let summary = RunSummary::collect(0, Vec::new(), Duration::ZERO);
        assert!(summary.is_complete());
        assert_eq!(summary.latency, LatencySummary::default());
    }
}
