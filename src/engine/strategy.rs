//! Injection points for the discovery loop: executing angles and judging
//! whether accumulated discoveries solve the problem.
//!
//! Both traits have a single method and are implemented for plain closures,
//! so tests and small callers can pass a lambda.

use crate::angle::{Angle, AngleResult, Discovery};
use crate::error::DiscoveryResult;
use crate::knowledge::KnowledgeGraph;

/// Executes one angle against the problem.
///
/// Implementations may read the knowledge graph but never mutate it; the
/// engine is its only writer. An `Err` is recorded as a failed angle and the
/// run continues.
pub trait AngleExecutor {
    fn execute(&self, angle: &Angle, knowledge: &KnowledgeGraph) -> DiscoveryResult<AngleResult>;
}

/// Decides whether the discoveries so far solve the problem.
pub trait SolutionChecker {
    fn is_solved(&self, problem: &str, discoveries: &[Discovery]) -> bool;
}

impl<F> AngleExecutor for F
where
    F: Fn(&Angle, &KnowledgeGraph) -> DiscoveryResult<AngleResult>,
{
    fn execute(&self, angle: &Angle, knowledge: &KnowledgeGraph) -> DiscoveryResult<AngleResult> {
        self(angle, knowledge)
    }
}

impl<F> SolutionChecker for F
where
    F: Fn(&str, &[Discovery]) -> bool,
{
    fn is_solved(&self, problem: &str, discoveries: &[Discovery]) -> bool {
        self(problem, discoveries)
    }
}

/// Default executor: never finds a signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentExecutor;

impl AngleExecutor for SilentExecutor {
    fn execute(&self, angle: &Angle, _knowledge: &KnowledgeGraph) -> DiscoveryResult<AngleResult> {
        Ok(AngleResult::no_signal(angle.clone()))
    }
}

/// Default checker: never considers the problem solved.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSolved;

impl SolutionChecker for NeverSolved {
    fn is_solved(&self, _problem: &str, _discoveries: &[Discovery]) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::AngleCategory;

    #[test]
    fn defaults_never_signal_or_solve() {
        let angle = Angle::new(AngleCategory::Technical, "t");
        let result = SilentExecutor.execute(&angle, &KnowledgeGraph::new()).unwrap();
        assert!(!result.has_signal);
        assert_eq!(result.angle.id, angle.id);
        assert!(!NeverSolved.is_solved("p", &[]));
    }

    #[test]
    fn closures_implement_strategies() {
        let executor = |angle: &Angle, _: &KnowledgeGraph| -> DiscoveryResult<AngleResult> {
            Ok(AngleResult::signal(angle.clone(), 0.9))
        };
        let checker = |_: &str, discoveries: &[Discovery]| -> bool { !discoveries.is_empty() };
        let angle = Angle::new(AngleCategory::Meta, "m");
        let result = executor.execute(&angle, &KnowledgeGraph::new()).unwrap();
        assert!(result.is_discovery());
        assert!(checker.is_solved("p", &[Discovery::from_result(&result)]));
        assert!(!checker.is_solved("p", &[]));
    }
}
