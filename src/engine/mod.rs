//! The discovery loop: estimate, generate, execute, branch, synthesize, check.
//!
//! [`DiscoveryEngine`] owns one run's state and drives it either to a terminal
//! [`RunReport`] (`run`, honoring pause requests) or one iteration at a time
//! through [`DiscoveryIter`]. A paused run leaves a [`Checkpoint`] that can be
//! saved to disk and handed back to `resume`.

pub mod checkpoint;
pub mod driver;
pub mod iter;
pub mod report;
pub mod strategy;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::knowledge::KnowledgeGraph;
use crate::probability::ProblemProfile;

pub use checkpoint::{Checkpoint, CheckpointResult};
pub use driver::DiscoveryEngine;
pub use iter::DiscoveryIter;
pub use report::{AuditRecord, IterationSnapshot, RunReport};
pub use strategy::{AngleExecutor, NeverSolved, SilentExecutor, SolutionChecker};

/// Lifecycle of a discovery run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryState {
    Initialized,
    Running,
    Paused,
    Solved,
    Exhausted,
}

impl DiscoveryState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Solved => "solved",
            Self::Exhausted => "exhausted",
        }
    }

    /// Whether the loop has stopped for this run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paused | Self::Solved | Self::Exhausted)
    }
}

impl std::fmt::Display for DiscoveryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Inputs to a discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryRequest {
    pub problem: String,
    /// Desired probability of at least one discovery per iteration (default 0.95).
    pub target_confidence: f64,
    pub profile: ProblemProfile,
    /// Extra named multipliers applied to every estimate.
    pub custom_factors: BTreeMap<String, f64>,
    /// Knowledge to continue from instead of an empty graph.
    pub initial_knowledge: Option<KnowledgeGraph>,
}

impl DiscoveryRequest {
    pub fn new(problem: impl Into<String>) -> Self {
        Self {
            problem: problem.into(),
            target_confidence: 0.95,
            profile: ProblemProfile::default(),
            custom_factors: BTreeMap::new(),
            initial_knowledge: None,
        }
    }

    pub fn with_target_confidence(mut self, target_confidence: f64) -> Self {
        self.target_confidence = target_confidence;
        self
    }

    pub fn with_profile(mut self, profile: ProblemProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_custom_factor(mut self, name: impl Into<String>, multiplier: f64) -> Self {
        self.custom_factors.insert(name.into(), multiplier);
        self
    }

    pub fn with_initial_knowledge(mut self, knowledge: KnowledgeGraph) -> Self {
        self.initial_knowledge = Some(knowledge);
        self
    }
}

/// Shareable pause switch for a running engine.
///
/// Tripping it from another thread, a signal handler, or an executor makes
/// the blocking loop stop at the top of its next iteration.
#[derive(Debug, Clone, Default)]
pub struct PauseHandle(Arc<AtomicBool>);

impl PauseHandle {
    pub fn pause(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Consume a pending request, returning whether there was one.
    pub(crate) fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// The underlying flag, for `signal_hook::flag::register`.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!DiscoveryState::Initialized.is_terminal());
        assert!(!DiscoveryState::Running.is_terminal());
        assert!(DiscoveryState::Paused.is_terminal());
        assert!(DiscoveryState::Solved.is_terminal());
        assert!(DiscoveryState::Exhausted.is_terminal());
        assert_eq!(
            serde_json::to_string(&DiscoveryState::Exhausted).unwrap(),
            "\"exhausted\""
        );
    }

    #[test]
    fn pause_handle_is_shared() {
        let handle = PauseHandle::default();
        let clone = handle.clone();
        clone.pause();
        assert!(handle.is_requested());
        assert!(handle.take());
        assert!(!clone.is_requested());
        assert!(!handle.take());
    }

    #[test]
    fn request_builder() {
        let request = DiscoveryRequest::new("p")
            .with_target_confidence(0.9)
            .with_custom_factor("lead", 2.0);
        assert_eq!(request.target_confidence, 0.9);
        assert_eq!(request.custom_factors["lead"], 2.0);
        assert!(request.initial_knowledge.is_none());
    }
}
