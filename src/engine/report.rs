//! Outputs of a discovery run: the terminal report, per-iteration snapshots,
//! and audit records.

use serde::Serialize;

use super::DiscoveryState;
use crate::angle::Discovery;
use crate::knowledge::KnowledgeGraph;
use crate::probability::ProbabilityLog;

/// Final report of a blocking run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub state: DiscoveryState,
    pub problem: String,
    /// Iterations actually executed, counting those before a resume.
    pub iterations: u64,
    pub discoveries: Vec<Discovery>,
    pub knowledge: KnowledgeGraph,
    pub probability_logs: Vec<ProbabilityLog>,
    pub total_angles: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Discovery run: {}", self.state)?;
        writeln!(f, "  problem:     {}", self.problem)?;
        writeln!(f, "  iterations:  {}", self.iterations)?;
        writeln!(
            f,
            "  angles:      {} ({} with signal, {} failed)",
            self.total_angles, self.succeeded, self.failed
        )?;
        write!(f, "  discoveries: {}", self.discoveries.len())?;
        for discovery in &self.discoveries {
            write!(
                f,
                "\n    - {} (confidence {:.2}): {}",
                discovery.title, discovery.confidence, discovery.description
            )?;
        }
        Ok(())
    }
}

/// Progress after one iteration of the iterator form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationSnapshot {
    pub state: DiscoveryState,
    pub iteration: u64,
    pub p: f64,
    pub n: usize,
    /// Includes branch angles appended during the iteration.
    pub angles_executed: usize,
    pub discoveries_this_iteration: usize,
    pub total_discoveries: usize,
}

impl std::fmt::Display for IterationSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "iteration {} [{}]: p={:.4} n={} executed={} discoveries={}/{}",
            self.iteration,
            self.state,
            self.p,
            self.n,
            self.angles_executed,
            self.discoveries_this_iteration,
            self.total_discoveries
        )
    }
}

/// One exported probability estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub timestamp: u64,
    pub iteration: u64,
    pub estimated_p: f64,
    pub target_confidence: f64,
    pub calculated_n: usize,
    pub factors: std::collections::BTreeMap<String, f64>,
    pub reasoning: String,
}

impl From<&ProbabilityLog> for AuditRecord {
    fn from(log: &ProbabilityLog) -> Self {
        Self {
            timestamp: log.timestamp,
            iteration: log.loop_iteration,
            estimated_p: log.estimated_p,
            target_confidence: log.target_confidence,
            calculated_n: log.calculated_n,
            factors: log.factors.clone(),
            reasoning: log.reasoning.clone(),
        }
    }
}
