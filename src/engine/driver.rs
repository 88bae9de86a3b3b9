//! The discovery engine and its iteration body.

use std::collections::{BTreeMap, VecDeque};

use crate::angle::{Angle, AngleResult, Discovery, truncate_chars};
use crate::config::EngineConfig;
use crate::error::{DiscoveryResult, EngineError, ProbabilityError};
use crate::generator::{AngleGenerator, DefaultAngleGenerator};
use crate::knowledge::KnowledgeGraph;
use crate::probability::{
    ProbabilityEstimator, ProbabilityLog, ProblemProfile, angles_needed, breakthrough_probability,
};

use super::{
    AngleExecutor, AuditRecord, Checkpoint, DiscoveryIter, DiscoveryRequest, DiscoveryState,
    IterationSnapshot, NeverSolved, PauseHandle, RunReport, SilentExecutor, SolutionChecker,
};

/// Relationship label from a signalling angle to each of its branches.
pub const BRANCHES_TO: &str = "branches_to";
/// Relationship label from a discovery to its source angle.
pub const SYNTHESIZED_FROM: &str = "synthesized_from";

/// How one pass through the loop ended.
pub(crate) enum Step {
    Exhausted,
    Paused,
    Completed(IterationSnapshot),
}

/// Drives the angle-exhaustion loop for one problem at a time.
///
/// Strategies are injected at construction; everything else is run state
/// reset by [`run`](Self::run) and restored by [`resume`](Self::resume).
pub struct DiscoveryEngine {
    config: EngineConfig,
    generator: Box<dyn AngleGenerator>,
    estimator: ProbabilityEstimator,
    executor: Box<dyn AngleExecutor>,
    checker: Box<dyn SolutionChecker>,

    state: DiscoveryState,
    iteration: u64,
    problem: String,
    target_confidence: f64,
    profile: ProblemProfile,
    custom_factors: BTreeMap<String, f64>,
    knowledge: KnowledgeGraph,
    discoveries: Vec<Discovery>,
    probability_logs: Vec<ProbabilityLog>,
    pause: PauseHandle,
    checkpoint: Option<Checkpoint>,
}

impl DiscoveryEngine {
    /// Create an engine with the default generator and stub strategies.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            generator: Box::new(DefaultAngleGenerator),
            estimator: ProbabilityEstimator::new(),
            executor: Box::new(SilentExecutor),
            checker: Box::new(NeverSolved),
            state: DiscoveryState::Initialized,
            iteration: 0,
            problem: String::new(),
            target_confidence: 0.95,
            profile: ProblemProfile::default(),
            custom_factors: BTreeMap::new(),
            knowledge: KnowledgeGraph::new(),
            discoveries: Vec::new(),
            probability_logs: Vec::new(),
            pause: PauseHandle::default(),
            checkpoint: None,
        }
    }

    pub fn with_executor(mut self, executor: impl AngleExecutor + 'static) -> Self {
        self.executor = Box::new(executor);
        self
    }

    pub fn with_checker(mut self, checker: impl SolutionChecker + 'static) -> Self {
        self.checker = Box::new(checker);
        self
    }

    pub fn with_generator(mut self, generator: impl AngleGenerator + 'static) -> Self {
        self.generator = Box::new(generator);
        self
    }

    pub fn with_estimator(mut self, estimator: ProbabilityEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    // -----------------------------------------------------------------------
    // Driving
    // -----------------------------------------------------------------------

    /// Run the loop until solved, exhausted, or paused.
    ///
    /// A pending pause request from before the call is discarded.
    pub fn run(&mut self, request: DiscoveryRequest) -> DiscoveryResult<RunReport> {
        self.begin(request)?;
        self.pause.clear();
        self.drive()
    }

    /// Start a run that advances one iteration per `next()`.
    ///
    /// The iterator ignores pause requests; stop it by dropping it.
    pub fn iterate(&mut self, request: DiscoveryRequest) -> DiscoveryResult<DiscoveryIter<'_>> {
        self.begin(request)?;
        Ok(DiscoveryIter::new(self))
    }

    /// Ask the blocking loop to stop before its next iteration.
    pub fn pause(&self) {
        tracing::info!("pause requested; stopping before the next iteration");
        self.pause.pause();
    }

    /// A handle that can request a pause from elsewhere.
    pub fn pause_handle(&self) -> PauseHandle {
        self.pause.clone()
    }

    /// Continue a paused run.
    ///
    /// Uses `checkpoint` when given, else the one stored by the last pause.
    /// Iteration numbering continues from the checkpoint and the iteration
    /// ceiling counts iterations from before the pause.
    pub fn resume(&mut self, checkpoint: Option<Checkpoint>) -> DiscoveryResult<RunReport> {
        let checkpoint = match checkpoint {
            Some(checkpoint) => checkpoint,
            None => self.checkpoint.clone().ok_or(EngineError::NoCheckpoint)?,
        };
        validate_target(checkpoint.target_confidence)?;

        self.knowledge = checkpoint.restore_knowledge()?;
        self.problem = checkpoint.problem.clone();
        self.target_confidence = checkpoint.target_confidence;
        self.profile = checkpoint.profile;
        self.custom_factors = checkpoint.custom_factors.clone();
        self.discoveries = self.knowledge.discoveries().into_iter().cloned().collect();
        self.probability_logs = checkpoint.probability_logs.clone();
        self.iteration = checkpoint.iteration.saturating_sub(1);
        self.checkpoint = Some(checkpoint);
        self.state = DiscoveryState::Running;
        self.pause.clear();

        tracing::info!(
            iteration = self.iteration + 1,
            angles = self.knowledge.angle_count(),
            "resuming discovery run"
        );
        self.drive()
    }

    fn begin(&mut self, request: DiscoveryRequest) -> DiscoveryResult<()> {
        validate_target(request.target_confidence)?;

        let mut knowledge = request.initial_knowledge.unwrap_or_default();
        knowledge.set_domain_knowledge("problem", serde_json::Value::String(request.problem.clone()));

        self.discoveries = knowledge.discoveries().into_iter().cloned().collect();
        self.knowledge = knowledge;
        self.problem = request.problem;
        self.target_confidence = request.target_confidence;
        self.profile = request.profile;
        self.custom_factors = request.custom_factors;
        self.probability_logs.clear();
        self.iteration = 0;
        self.state = DiscoveryState::Running;

        tracing::info!(
            problem = %truncate_chars(&self.problem, 100),
            target = self.target_confidence,
            "starting discovery run"
        );
        Ok(())
    }

    fn drive(&mut self) -> DiscoveryResult<RunReport> {
        loop {
            match self.step(true)? {
                Step::Completed(snapshot) if snapshot.state == DiscoveryState::Solved => break,
                Step::Completed(_) => {}
                Step::Exhausted | Step::Paused => break,
            }
        }
        Ok(self.report())
    }

    /// One pass of the loop. Pause requests are only observed when
    /// `honor_pause` is set.
    pub(crate) fn step(&mut self, honor_pause: bool) -> DiscoveryResult<Step> {
        let next = self.iteration + 1;
        if next > self.config.max_iterations {
            tracing::warn!(
                max_iterations = self.config.max_iterations,
                discoveries = self.discoveries.len(),
                "iteration ceiling reached; search exhausted"
            );
            self.state = DiscoveryState::Exhausted;
            return Ok(Step::Exhausted);
        }

        if honor_pause && self.pause.take() {
            self.checkpoint = Some(self.snapshot_checkpoint(next)?);
            self.state = DiscoveryState::Paused;
            tracing::info!(iteration = next, "discovery paused; checkpoint stored");
            return Ok(Step::Paused);
        }

        self.iteration = next;

        // -- Estimate ---------------------------------------------------------
        let (p, mut log) = self
            .estimator
            .estimate(&self.profile, &self.custom_factors, next);
        let n = angles_needed(p, self.target_confidence)?;
        log.target_confidence = self.target_confidence;
        log.calculated_n = n;
        self.probability_logs.push(log);
        let expected = breakthrough_probability(p, n)?;
        tracing::info!(iteration = next, p, n, breakthrough = expected, "starting iteration");

        // -- Generate and execute ---------------------------------------------
        let mut worklist: VecDeque<Angle> = self
            .generator
            .generate(&self.problem, &self.knowledge, n, None)
            .into();
        let capacity = self.config.max_angles_per_iteration.max(n);
        let mut queued = worklist.len();
        let mut results: Vec<AngleResult> = Vec::with_capacity(queued);

        while let Some(angle) = worklist.pop_front() {
            if self.knowledge.contains_angle(&angle.id) {
                tracing::debug!(angle = %angle.id, "skipping already registered angle");
                continue;
            }
            self.knowledge.add_angle(angle.clone())?;
            let result = self.execute_angle(&angle);
            self.knowledge.add_result(result.clone())?;

            if result.has_signal {
                tracing::debug!(
                    angle = %angle.id,
                    strength = result.signal_strength,
                    description = %truncate_chars(&angle.description, 50),
                    "signal detected"
                );
                if self
                    .config
                    .max_branch_depth
                    .is_none_or(|max_depth| angle.depth < max_depth)
                {
                    let requested = self.config.branch_count(result.signal_strength);
                    let room = capacity.saturating_sub(queued);
                    if room < requested {
                        tracing::debug!(requested, room, "branch request truncated at worklist cap");
                    }
                    let count = requested.min(room);
                    if count > 0 {
                        for branch in self.generator.branch_on_discovery(&result, count).into_iter().take(count) {
                            self.knowledge
                                .add_connection(angle.id.as_str(), branch.id.as_str(), BRANCHES_TO);
                            worklist.push_back(branch);
                            queued += 1;
                        }
                    }
                }
            }
            results.push(result);
        }

        // -- Synthesize -------------------------------------------------------
        let found: Vec<Discovery> = results
            .iter()
            .filter(|r| r.is_discovery())
            .map(Discovery::from_result)
            .collect();
        let failures = results.iter().filter(|r| !r.has_signal).count();
        tracing::info!(
            iteration = next,
            executed = results.len(),
            discoveries = found.len(),
            failures,
            "iteration complete"
        );

        let discoveries_this_iteration = found.len();
        for discovery in found {
            for source in &discovery.source_angles {
                self.knowledge
                    .add_connection(discovery.id.as_str(), source.as_str(), SYNTHESIZED_FROM);
            }
            self.knowledge.add_discovery(discovery.clone());
            self.discoveries.push(discovery);
        }

        // -- Check and adapt --------------------------------------------------
        let mut solved = false;
        if discoveries_this_iteration > 0 {
            if self.checker.is_solved(&self.problem, &self.discoveries) {
                solved = true;
            } else {
                self.profile.record_progress();
            }
        } else {
            tracing::debug!("no discoveries; treating the failures as evidence of difficulty");
            self.profile.record_failure();
        }

        self.knowledge.merge(&results)?;

        if solved {
            self.state = DiscoveryState::Solved;
            tracing::info!(
                iteration = next,
                discoveries = self.discoveries.len(),
                "problem solved"
            );
        }

        Ok(Step::Completed(IterationSnapshot {
            state: self.state,
            iteration: next,
            p,
            n,
            angles_executed: results.len(),
            discoveries_this_iteration,
            total_discoveries: self.discoveries.len(),
        }))
    }

    /// Execute one angle, turning executor faults into a failed result.
    fn execute_angle(&self, angle: &Angle) -> AngleResult {
        match self.executor.execute(angle, &self.knowledge) {
            Ok(result) if result.angle.id == angle.id => result,
            Ok(result) => {
                tracing::warn!(
                    angle = %angle.id,
                    returned = %result.angle.id,
                    "executor returned a result for a different angle; recording as failed"
                );
                AngleResult::failed(
                    angle.clone(),
                    format!("executor returned a result for {}", result.angle.id),
                )
            }
            Err(err) => {
                tracing::warn!(angle = %angle.id, error = %err, "executor failed; recording as failed");
                AngleResult::failed(angle.clone(), err.to_string())
            }
        }
    }

    fn snapshot_checkpoint(&self, next: u64) -> DiscoveryResult<Checkpoint> {
        Ok(Checkpoint {
            problem: self.problem.clone(),
            target_confidence: self.target_confidence,
            iteration: next,
            knowledge: self.knowledge.to_value()?,
            probability_logs: self.probability_logs.clone(),
            profile: self.profile,
            custom_factors: self.custom_factors.clone(),
        })
    }

    /// Summary of the current run.
    pub fn report(&self) -> RunReport {
        RunReport {
            state: self.state,
            problem: self.problem.clone(),
            iterations: self.iteration,
            discoveries: self.discoveries.clone(),
            knowledge: self.knowledge.clone(),
            probability_logs: self.probability_logs.clone(),
            total_angles: self.knowledge.angle_count(),
            succeeded: self.knowledge.successful_results().len(),
            failed: self.knowledge.failed_results().len(),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> DiscoveryState {
        self.state
    }

    /// Iterations executed so far in this run.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn knowledge(&self) -> &KnowledgeGraph {
        &self.knowledge
    }

    /// Discoveries in the order they were made.
    pub fn discoveries(&self) -> &[Discovery] {
        &self.discoveries
    }

    /// Descriptors as adapted so far.
    pub fn profile(&self) -> &ProblemProfile {
        &self.profile
    }

    /// The checkpoint stored by the most recent pause, if any.
    pub fn checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoint.as_ref()
    }

    pub fn probability_logs(&self) -> &[ProbabilityLog] {
        &self.probability_logs
    }

    pub fn estimator(&self) -> &ProbabilityEstimator {
        &self.estimator
    }

    /// One record per estimate made in this run, oldest first.
    pub fn audit_log(&self) -> Vec<AuditRecord> {
        self.probability_logs.iter().map(AuditRecord::from).collect()
    }

    /// The audit log as pretty JSON.
    pub fn audit_log_json(&self) -> DiscoveryResult<String> {
        serde_json::to_string_pretty(&self.audit_log()).map_err(|e| {
            EngineError::AuditExport {
                message: e.to_string(),
            }
            .into()
        })
    }
}

impl Default for DiscoveryEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn validate_target(target_confidence: f64) -> Result<(), ProbabilityError> {
    if target_confidence > 0.0 && target_confidence < 1.0 {
        Ok(())
    } else {
        Err(ProbabilityError::InvalidConfidence {
            value: target_confidence,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
