//! Result aggregation and representative selection.
//!
//! The aggregator is the single consumer of a job's result channel. It owns
//! the histogram and the representative tracker outright; the only thing it
//! shares is each snapshot it hands to its publish callback.

use std::sync::mpsc::Receiver;

use sim_core::error::diagnostic;
use sim_core::stage::{Loadout, StageResult};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::executor::{play_logged, IterationResult};
use crate::result::{Histogram, OutcomeKind, SimulationResult};
use crate::seeds::IterationSeed;

/// Selection priority of an outcome. Higher ranks are more worth reporting.
#[must_use]
pub fn severity_rank(result: &StageResult) -> u8 {
    match result {
        StageResult::Excluded => 0,
        StageResult::Victory { .. } => 1,
        StageResult::OutOfTurns => 2,
        StageResult::TeamWipe { .. } => 3,
        StageResult::PlayError(_) => 4,
    }
}

/// Tracks the most reportable iteration seen so far.
///
/// Higher [`severity_rank`] wins; equal ranks keep the lower index. The
/// choice is independent of the order results arrive in.
#[derive(Debug, Clone, Default)]
pub struct RepresentativeSelector {
    best: Option<(u8, IterationSeed)>,
}

impl RepresentativeSelector {
    /// Create an empty selector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consider one iteration. Returns `true` if it became the new best.
    pub fn offer(&mut self, index: u32, seed: u64, result: &StageResult) -> bool {
        let rank = severity_rank(result);
        let better = match &self.best {
            None => true,
            Some((best_rank, best)) => {
                rank > *best_rank || (rank == *best_rank && index < best.index)
            }
        };
        if better {
            self.best = Some((rank, IterationSeed { index, seed }));
        }
        better
    }

    /// The selected iteration, if any was offered.
    #[must_use]
    pub fn selected(&self) -> Option<IterationSeed> {
        self.best.map(|(_, item)| item)
    }
}

/// The result channel closed before every iteration was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("result stream closed after {received} of {expected} iterations")]
pub struct Shortfall {
    /// Results received before the channel closed.
    pub received: u32,
    /// Results the job expected.
    pub expected: u32,
}

/// Consumes iteration results and publishes snapshots.
pub struct Aggregator<P> {
    max_iterations: u32,
    update_interval: u32,
    completed: u32,
    histogram: Histogram,
    selector: RepresentativeSelector,
    publish: P,
}

impl<P> Aggregator<P>
where
    P: FnMut(SimulationResult),
{
    /// Create an aggregator expecting `max_iterations` results.
    pub fn new(max_iterations: u32, update_interval: u32, publish: P) -> Self {
        Self {
            max_iterations,
            update_interval: update_interval.max(1),
            completed: 0,
            histogram: Histogram::new(),
            selector: RepresentativeSelector::new(),
            publish,
        }
    }

    /// Count one result, publishing a progress snapshot on interval
    /// boundaries.
    pub fn record(&mut self, item: &IterationResult) {
        self.histogram.record(OutcomeKind::from(&item.result));
        self.selector.offer(item.index, item.seed, &item.result);
        self.completed += 1;

        if self.completed % self.update_interval == 0 {
            debug!(
                completed = self.completed,
                total = self.max_iterations,
                "Publishing progress"
            );
            (self.publish)(SimulationResult::progress(
                self.max_iterations,
                self.completed,
                &self.histogram,
            ));
        }
    }

    /// Receive until every expected result has arrived.
    pub fn consume(&mut self, receiver: &Receiver<IterationResult>) -> Result<(), Shortfall> {
        while self.completed < self.max_iterations {
            match receiver.recv() {
                Ok(item) => self.record(&item),
                Err(_) => {
                    return Err(Shortfall {
                        received: self.completed,
                        expected: self.max_iterations,
                    })
                }
            }
        }
        Ok(())
    }

    /// Replay the representative run with logging and publish the final
    /// snapshot.
    pub fn finish<L: Loadout>(mut self, loadout: &L, max_turns: u32) -> SimulationResult {
        let mut snapshot =
            SimulationResult::progress(self.max_iterations, self.completed, &self.histogram);

        match self.selector.selected() {
            Some(best) => {
                info!(index = best.index, seed = best.seed, "Replaying representative run");
                let (result, log) = play_logged(loadout, best.seed, max_turns);
                snapshot = snapshot.with_log(format!("Iteration {}\n{}", best.index + 1, log));
                if let StageResult::PlayError(error) = &result {
                    snapshot = snapshot.with_error(diagnostic(error));
                }
            }
            None => snapshot = snapshot.with_log(String::new()),
        }

        (self.publish)(snapshot.clone());
        snapshot
    }

    /// Publish the progress so far together with the shortfall diagnostic.
    pub fn fail(mut self, shortfall: &Shortfall) -> SimulationResult {
        warn!(
            received = shortfall.received,
            expected = shortfall.expected,
            "Result stream closed early"
        );
        let snapshot =
            SimulationResult::progress(self.max_iterations, self.completed, &self.histogram)
                .with_error(shortfall.to_string());
        (self.publish)(snapshot.clone());
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::error::PlayError;
    use sim_test_utils::fixtures::{outcome_from_seed, ScriptedLoadout};
    use std::sync::mpsc;

    fn play_error() -> StageResult {
        StageResult::PlayError(PlayError::Engine("boom".to_string()))
    }

    #[test]
    fn test_error_outranks_everything() {
        let mut selector = RepresentativeSelector::new();
        selector.offer(5, 50, &StageResult::Victory { turn: 3 });
        selector.offer(2, 20, &play_error());
        selector.offer(9, 90, &StageResult::TeamWipe { turn: 7 });

        assert_eq!(selector.selected(), Some(IterationSeed { index: 2, seed: 20 }));
    }

    #[test]
    fn test_ties_prefer_lower_index() {
        let mut selector = RepresentativeSelector::new();
        selector.offer(7, 70, &play_error());
        selector.offer(4, 40, &play_error());
        assert_eq!(selector.selected().map(|s| s.index), Some(4));

        let mut reversed = RepresentativeSelector::new();
        reversed.offer(4, 40, &play_error());
        reversed.offer(7, 70, &play_error());
        assert_eq!(reversed.selected().map(|s| s.index), Some(4));
    }

    #[test]
    fn test_rank_order() {
        let ordered = [
            StageResult::Excluded,
            StageResult::Victory { turn: 1 },
            StageResult::OutOfTurns,
            StageResult::TeamWipe { turn: 1 },
            play_error(),
        ];
        for pair in ordered.windows(2) {
            assert!(severity_rank(&pair[0]) < severity_rank(&pair[1]));
        }
    }

    #[test]
    fn test_snapshots_conserve_counts() {
        let mut snapshots = Vec::new();
        let mut aggregator = Aggregator::new(10, 3, |snapshot| snapshots.push(snapshot));

        for index in 0..10u32 {
            let seed = u64::from(index) * 31;
            aggregator.record(&IterationResult {
                index,
                seed,
                result: outcome_from_seed(seed),
            });
        }
        let last = aggregator.finish(&ScriptedLoadout::new(), 30);

        assert_eq!(snapshots.len(), 4);
        for snapshot in &snapshots {
            assert_eq!(snapshot.histogram_total(), u64::from(snapshot.completed_iterations));
        }
        assert_eq!(snapshots[0].completed_iterations, 3);
        assert!(snapshots[0].full_log.is_none());
        assert_eq!(last.completed_iterations, 10);
        assert!(last.full_log.as_deref().unwrap().starts_with("Iteration "));
    }

    #[test]
    fn test_final_snapshot_carries_replay_diagnostic() {
        let loadout = ScriptedLoadout::new().panicking_on(11);
        let mut aggregator = Aggregator::new(2, 100, |_| {});
        aggregator.record(&IterationResult {
            index: 0,
            seed: 10,
            result: outcome_from_seed(10),
        });
        aggregator.record(&IterationResult {
            index: 1,
            seed: 11,
            result: StageResult::PlayError(PlayError::Panicked("scripted".to_string())),
        });

        let last = aggregator.finish(&loadout, 30);
        assert!(last.full_log.as_deref().unwrap().starts_with("Iteration 2\n"));
        assert!(last.error.as_deref().unwrap().contains("engine panicked"));
    }

    #[test]
    fn test_disconnect_reports_shortfall() {
        let (sender, receiver) = mpsc::sync_channel(4);
        sender
            .send(IterationResult {
                index: 0,
                seed: 1,
                result: StageResult::OutOfTurns,
            })
            .unwrap();
        drop(sender);

        let mut published = Vec::new();
        let mut aggregator = Aggregator::new(5, 100, |snapshot| published.push(snapshot));
        let shortfall = aggregator.consume(&receiver).unwrap_err();
        assert_eq!(shortfall, Shortfall { received: 1, expected: 5 });

        let last = aggregator.fail(&shortfall);
        assert_eq!(last.completed_iterations, 1);
        assert_eq!(last.histogram_total(), 1);
        assert!(last.error.as_deref().unwrap().contains("1 of 5"));
        assert_eq!(published.len(), 1);
    }
}
