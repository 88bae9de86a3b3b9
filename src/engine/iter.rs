//! Iterator form of the discovery loop.

use std::iter::FusedIterator;

use super::driver::Step;
use super::{DiscoveryEngine, DiscoveryState, IterationSnapshot, RunReport};
use crate::error::DiscoveryResult;
use crate::knowledge::KnowledgeGraph;

/// Runs one iteration per call to `next()`.
///
/// Yields a snapshot after every completed iteration, including the one that
/// solves the problem. Reaching the iteration ceiling ends the iterator
/// without a snapshot; [`state`](Self::state) then reports `Exhausted`.
pub struct DiscoveryIter<'e> {
    engine: &'e mut DiscoveryEngine,
    done: bool,
}

impl<'e> DiscoveryIter<'e> {
    pub(crate) fn new(engine: &'e mut DiscoveryEngine) -> Self {
        Self {
            engine,
            done: false,
        }
    }

    /// The knowledge graph as of the last completed iteration.
    pub fn knowledge(&self) -> &KnowledgeGraph {
        self.engine.knowledge()
    }

    pub fn state(&self) -> DiscoveryState {
        self.engine.state()
    }

    pub fn iteration(&self) -> u64 {
        self.engine.iteration()
    }

    /// Stop iterating and summarize the run so far.
    pub fn into_report(self) -> RunReport {
        self.engine.report()
    }
}

impl Iterator for DiscoveryIter<'_> {
    type Item = DiscoveryResult<IterationSnapshot>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.engine.step(false) {
            Ok(Step::Completed(snapshot)) => {
                self.done = snapshot.state.is_terminal();
                Some(Ok(snapshot))
            }
            Ok(Step::Exhausted | Step::Paused) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl FusedIterator for DiscoveryIter<'_> {}

#[cfg(test)]
mod tests {
    use crate::angle::{Angle, AngleResult};
    use crate::config::EngineConfig;
    use crate::engine::{DiscoveryEngine, DiscoveryRequest, DiscoveryState};
    use crate::error::DiscoveryResult;
    use crate::knowledge::KnowledgeGraph;

    #[test]
    fn yields_each_iteration_then_stops() {
        let mut engine = DiscoveryEngine::new(EngineConfig {
            max_iterations: 3,
            ..Default::default()
        });
        let mut iter = engine.iterate(DiscoveryRequest::new("p")).unwrap();
        let mut seen = Vec::new();
        let mut grown = 0;
        while let Some(step) = iter.next() {
            let snapshot = step.unwrap();
            assert_eq!(snapshot.state, DiscoveryState::Running);
            assert_eq!(snapshot.angles_executed, snapshot.n);
            grown += snapshot.angles_executed;
            assert_eq!(iter.knowledge().angle_count(), grown);
            seen.push(snapshot.iteration);
        }
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(iter.state(), DiscoveryState::Exhausted);
        assert!(iter.next().is_none());
    }

    #[test]
    fn ignores_pause_requests() {
        let mut engine = DiscoveryEngine::new(EngineConfig {
            max_iterations: 2,
            ..Default::default()
        });
        engine.pause_handle().pause();
        let iter = engine.iterate(DiscoveryRequest::new("p")).unwrap();
        assert_eq!(iter.count(), 2);
    }

    #[test]
    fn solved_is_last_snapshot() {
        let mut engine = DiscoveryEngine::new(EngineConfig {
            max_iterations: 10,
            max_branch_depth: Some(0),
            ..Default::default()
        })
        .with_executor(|angle: &Angle, _: &KnowledgeGraph| -> DiscoveryResult<AngleResult> {
            Ok(AngleResult::signal(angle.clone(), 0.7))
        })
        .with_checker(|_: &str, found: &[crate::angle::Discovery]| -> bool { !found.is_empty() });

        let snapshots: Vec<_> = engine
            .iterate(DiscoveryRequest::new("p"))
            .unwrap()
            .collect::<DiscoveryResult<_>>()
            .unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].state, DiscoveryState::Solved);
        assert_eq!(snapshots[0].discoveries_this_iteration, snapshots[0].n);
        assert_eq!(engine.state(), DiscoveryState::Solved);
    }
}
