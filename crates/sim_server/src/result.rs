//! Published job snapshots.
//!
//! A [`SimulationResult`] is immutable once built. Progress is reported by
//! publishing a new snapshot, never by editing one in place.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sim_core::stage::StageResult;

/// Log text of a job whose loadout could not be built.
pub const SETUP_FAILURE_LOG: &str = "Error occurred during setup.";

/// Histogram key for one stage outcome.
///
/// Ordering follows declaration order, then turn, so histograms are always
/// emitted in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Run excluded by the strategy.
    Excluded,
    /// Enemy defeated.
    Victory {
        /// Turn the stage was won.
        turn: u32,
    },
    /// Turn limit reached.
    End,
    /// Team defeated.
    Wipe {
        /// Turn the team fell.
        turn: u32,
    },
    /// Play failed.
    Error,
}

impl From<&StageResult> for OutcomeKind {
    fn from(result: &StageResult) -> Self {
        match result {
            StageResult::Excluded => Self::Excluded,
            StageResult::Victory { turn } => Self::Victory { turn: *turn },
            StageResult::OutOfTurns => Self::End,
            StageResult::TeamWipe { turn } => Self::Wipe { turn: *turn },
            StageResult::PlayError(_) => Self::Error,
        }
    }
}

/// One histogram bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistogramEntry {
    /// Outcome counted by this bucket.
    pub outcome: OutcomeKind,
    /// Number of iterations with that outcome.
    pub count: u64,
}

/// Outcome counts, owned by the aggregator while a job runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Histogram {
    buckets: BTreeMap<OutcomeKind, u64>,
}

impl Histogram {
    /// Create an empty histogram.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one outcome.
    pub fn record(&mut self, outcome: OutcomeKind) {
        *self.buckets.entry(outcome).or_insert(0) += 1;
    }

    /// Sum of all counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.buckets.values().sum()
    }

    /// Count for one outcome.
    #[must_use]
    pub fn count(&self, outcome: OutcomeKind) -> u64 {
        self.buckets.get(&outcome).copied().unwrap_or(0)
    }

    /// Buckets in outcome order.
    #[must_use]
    pub fn entries(&self) -> Vec<HistogramEntry> {
        self.buckets
            .iter()
            .map(|(&outcome, &count)| HistogramEntry { outcome, count })
            .collect()
    }
}

/// Snapshot of a job, as seen through the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Requested iterations.
    pub max_iterations: u32,
    /// Iterations consumed so far.
    pub completed_iterations: u32,
    /// Outcome counts in outcome order.
    pub histogram: Vec<HistogramEntry>,
    /// Log of the representative run. Present only on final snapshots.
    pub full_log: Option<String>,
    /// The job was abandoned before any iteration ran.
    pub cancelled: bool,
    /// Diagnostic text, if the job or its representative run failed.
    pub error: Option<String>,
}

impl SimulationResult {
    /// Zero-progress snapshot published at submit time.
    #[must_use]
    pub fn pending(max_iterations: u32) -> Self {
        Self {
            max_iterations,
            completed_iterations: 0,
            histogram: Vec::new(),
            full_log: None,
            cancelled: false,
            error: None,
        }
    }

    /// Intermediate snapshot with no log.
    #[must_use]
    pub fn progress(max_iterations: u32, completed_iterations: u32, histogram: &Histogram) -> Self {
        Self {
            completed_iterations,
            histogram: histogram.entries(),
            ..Self::pending(max_iterations)
        }
    }

    /// Snapshot for a job whose loadout could not be built.
    #[must_use]
    pub fn setup_failed(max_iterations: u32, diagnostic: String) -> Self {
        Self {
            full_log: Some(SETUP_FAILURE_LOG.to_string()),
            cancelled: true,
            error: Some(diagnostic),
            ..Self::pending(max_iterations)
        }
    }

    /// Attach the representative log.
    #[must_use]
    pub fn with_log(mut self, log: String) -> Self {
        self.full_log = Some(log);
        self
    }

    /// Attach a diagnostic.
    #[must_use]
    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }

    /// Sum of histogram counts.
    #[must_use]
    pub fn histogram_total(&self) -> u64 {
        self.histogram.iter().map(|entry| entry.count).sum()
    }

    /// Count for one outcome.
    #[must_use]
    pub fn count(&self, outcome: OutcomeKind) -> u64 {
        self.histogram
            .iter()
            .find(|entry| entry.outcome == outcome)
            .map_or(0, |entry| entry.count)
    }

    /// Every requested iteration has been consumed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_iterations >= self.max_iterations
    }

    /// No further snapshot will follow this one.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.cancelled || self.full_log.is_some() || self.error.is_some()
    }

    /// Fraction of iterations consumed, in `0.0..=1.0`.
    #[must_use]
    pub fn progress_ratio(&self) -> f64 {
        f64::from(self.completed_iterations) / f64::from(self.max_iterations.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::error::PlayError;

    #[test]
    fn test_outcome_kind_from_stage_result() {
        assert_eq!(OutcomeKind::from(&StageResult::Excluded), OutcomeKind::Excluded);
        assert_eq!(
            OutcomeKind::from(&StageResult::Victory { turn: 4 }),
            OutcomeKind::Victory { turn: 4 }
        );
        assert_eq!(OutcomeKind::from(&StageResult::OutOfTurns), OutcomeKind::End);
        assert_eq!(
            OutcomeKind::from(&StageResult::PlayError(PlayError::Engine("x".into()))),
            OutcomeKind::Error
        );
    }

    #[test]
    fn test_histogram_orders_entries() {
        let mut histogram = Histogram::new();
        histogram.record(OutcomeKind::Error);
        histogram.record(OutcomeKind::Victory { turn: 9 });
        histogram.record(OutcomeKind::Victory { turn: 3 });
        histogram.record(OutcomeKind::Victory { turn: 3 });

        let entries = histogram.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].outcome, OutcomeKind::Victory { turn: 3 });
        assert_eq!(entries[0].count, 2);
        assert_eq!(entries[2].outcome, OutcomeKind::Error);
        assert_eq!(histogram.total(), 4);
    }

    #[test]
    fn test_setup_failed_snapshot() {
        let snapshot = SimulationResult::setup_failed(100, "bad loadout".to_string());

        assert!(snapshot.cancelled);
        assert_eq!(snapshot.completed_iterations, 0);
        assert!(snapshot.histogram.is_empty());
        assert_eq!(snapshot.full_log.as_deref(), Some(SETUP_FAILURE_LOG));
        assert!(snapshot.is_final());
    }

    #[test]
    fn test_progress_snapshot_conserves_counts() {
        let mut histogram = Histogram::new();
        histogram.record(OutcomeKind::End);
        histogram.record(OutcomeKind::Wipe { turn: 2 });

        let snapshot = SimulationResult::progress(10, 2, &histogram);
        assert_eq!(snapshot.histogram_total(), 2);
        assert_eq!(snapshot.count(OutcomeKind::End), 1);
        assert!(!snapshot.is_complete());
        assert!(!snapshot.is_final());
        assert!((snapshot.progress_ratio() - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_snapshot_serializes_to_json() {
        let mut histogram = Histogram::new();
        histogram.record(OutcomeKind::Victory { turn: 7 });
        let snapshot = SimulationResult::progress(1, 1, &histogram).with_log("done".into());

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"kind\":\"victory\""));
        assert!(json.contains("\"turn\":7"));

        let parsed: SimulationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
