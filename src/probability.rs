//! Probability model: per-angle success estimation and the breakthrough math.
//!
//! ```text
//! P(breakthrough) = 1 - (1 - p)^n
//! n               = ceil( ln(1 - target) / ln(1 - p) )
//! ```
//!
//! `p` comes from [`ProbabilityEstimator`], which maps four qualitative problem
//! descriptors to a number and keeps an audit trail of every estimate.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::angle::unix_now;
use crate::error::ProbabilityError;

/// Result type for probability operations.
pub type ProbabilityResult<T> = std::result::Result<T, ProbabilityError>;

/// Lower clamp for estimated `p`.
pub const MIN_P: f64 = 0.001;
/// Upper clamp for estimated `p`.
pub const MAX_P: f64 = 0.5;

fn in_open_unit(value: f64) -> bool {
    value > 0.0 && value < 1.0
}

/// Number of independent angles needed so that at least one succeeds with
/// probability `target_confidence`. Always at least 1.
pub fn angles_needed(p: f64, target_confidence: f64) -> ProbabilityResult<usize> {
    if !in_open_unit(p) {
        return Err(ProbabilityError::InvalidProbability { value: p });
    }
    if !in_open_unit(target_confidence) {
        return Err(ProbabilityError::InvalidConfidence {
            value: target_confidence,
        });
    }
    // ln_1p keeps precision for p below f64 epsilon, where 1 - p rounds to 1.
    let n = ((-target_confidence).ln_1p() / (-p).ln_1p()).ceil();
    if !n.is_finite() || n >= usize::MAX as f64 {
        return Err(ProbabilityError::AngleCountOverflow {
            p,
            target_confidence,
        });
    }
    Ok((n as usize).max(1))
}

/// Probability that at least one of `n` angles succeeds.
pub fn breakthrough_probability(p: f64, n: usize) -> ProbabilityResult<f64> {
    if !in_open_unit(p) {
        return Err(ProbabilityError::InvalidProbability { value: p });
    }
    if n < 1 {
        return Err(ProbabilityError::InvalidAngleCount { n });
    }
    Ok(-(n as f64 * (-p).ln_1p()).exp_m1())
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// How well studied the problem's domain is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Novelty {
    WellStudied,
    #[default]
    PartiallyExplored,
    CompletelyNovel,
}

/// How much data is available to test angles against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataAvailability {
    Rich,
    #[default]
    Moderate,
    Sparse,
}

/// How bounded the solution space is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintLevel {
    HighlyConstrained,
    #[default]
    ModeratelyConstrained,
    WideOpen,
}

/// What is known about earlier attempts at the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorWork {
    ManyFailures,
    #[default]
    SomeAttempts,
    FreshProblem,
}

impl Novelty {
    pub fn label(&self) -> &'static str {
        match self {
            Self::WellStudied => "well_studied",
            Self::PartiallyExplored => "partially_explored",
            Self::CompletelyNovel => "completely_novel",
        }
    }

    /// Base probability range for this level.
    pub fn range(&self) -> (f64, f64) {
        match self {
            Self::WellStudied => (0.10, 0.25),
            Self::PartiallyExplored => (0.03, 0.10),
            Self::CompletelyNovel => (0.01, 0.03),
        }
    }

    /// One step harder; `CompletelyNovel` stays put.
    pub fn degrade(&self) -> Self {
        match self {
            Self::WellStudied => Self::PartiallyExplored,
            Self::PartiallyExplored | Self::CompletelyNovel => Self::CompletelyNovel,
        }
    }
}

impl DataAvailability {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rich => "rich",
            Self::Moderate => "moderate",
            Self::Sparse => "sparse",
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Rich => 1.5,
            Self::Moderate => 1.0,
            Self::Sparse => 0.5,
        }
    }
}

impl ConstraintLevel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::HighlyConstrained => "highly_constrained",
            Self::ModeratelyConstrained => "moderately_constrained",
            Self::WideOpen => "wide_open",
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            Self::HighlyConstrained => 2.0,
            Self::ModeratelyConstrained => 1.0,
            Self::WideOpen => 0.5,
        }
    }
}

impl PriorWork {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ManyFailures => "many_failures",
            Self::SomeAttempts => "some_attempts",
            Self::FreshProblem => "fresh_problem",
        }
    }

    /// Additive probability range for this level.
    pub fn range(&self) -> (f64, f64) {
        match self {
            Self::ManyFailures => (0.01, 0.02),
            Self::SomeAttempts => (0.03, 0.08),
            Self::FreshProblem => (0.05, 0.15),
        }
    }
}

/// Strict and lenient string parsing for the descriptor enums.
macro_rules! descriptor_parsing {
    ($ty:ident, $name:literal, [$($variant:ident),+]) => {
        impl $ty {
            /// Parse a label, falling back to the default level when unknown.
            pub fn parse_or_default(label: &str) -> Self {
                label.parse().unwrap_or_else(|_| {
                    tracing::debug!(descriptor = $name, value = label, "unknown descriptor, using default");
                    Self::default()
                })
            }
        }

        impl FromStr for $ty {
            type Err = ProbabilityError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase();
                let all = [$(Self::$variant),+];
                all.into_iter()
                    .find(|v| v.label() == wanted)
                    .ok_or_else(|| ProbabilityError::UnknownDescriptor {
                        descriptor: $name,
                        value: s.to_string(),
                        expected: all.map(|v| v.label()).join(", "),
                    })
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.label())
            }
        }
    };
}

descriptor_parsing!(Novelty, "novelty", [WellStudied, PartiallyExplored, CompletelyNovel]);
descriptor_parsing!(DataAvailability, "data_availability", [Rich, Moderate, Sparse]);
descriptor_parsing!(ConstraintLevel, "constraint_level", [HighlyConstrained, ModeratelyConstrained, WideOpen]);
descriptor_parsing!(PriorWork, "prior_work", [ManyFailures, SomeAttempts, FreshProblem]);

/// The four qualitative descriptors of a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemProfile {
    pub novelty: Novelty,
    pub data_availability: DataAvailability,
    pub constraint_level: ConstraintLevel,
    pub prior_work: PriorWork,
}

impl ProblemProfile {
    /// Build a profile from free-form labels, defaulting unknown values.
    pub fn from_labels(novelty: &str, data: &str, constraints: &str, prior: &str) -> Self {
        Self {
            novelty: Novelty::parse_or_default(novelty),
            data_availability: DataAvailability::parse_or_default(data),
            constraint_level: ConstraintLevel::parse_or_default(constraints),
            prior_work: PriorWork::parse_or_default(prior),
        }
    }

    /// Adjust after an iteration that produced discoveries.
    pub fn record_progress(&mut self) {
        self.data_availability = DataAvailability::Rich;
    }

    /// Adjust after an iteration where nothing qualified as a discovery.
    pub fn record_failure(&mut self) {
        self.novelty = self.novelty.degrade();
        self.prior_work = PriorWork::ManyFailures;
    }
}

// ---------------------------------------------------------------------------
// Estimation
// ---------------------------------------------------------------------------

/// Audit record for one probability estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityLog {
    /// Unix seconds.
    pub timestamp: u64,
    pub loop_iteration: u64,
    pub estimated_p: f64,
    /// Filled in by the engine; zero for standalone estimates.
    pub target_confidence: f64,
    /// Filled in by the engine; zero for standalone estimates.
    pub calculated_n: usize,
    pub factors: BTreeMap<String, f64>,
    pub reasoning: String,
}

/// Estimates per-angle success probability from problem characteristics.
#[derive(Debug, Clone, Default)]
pub struct ProbabilityEstimator {
    history: Vec<ProbabilityLog>,
}

fn midpoint((lo, hi): (f64, f64)) -> f64 {
    (lo + hi) / 2.0
}

impl ProbabilityEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimate `p` for a problem profile.
    ///
    /// `custom_factors` multiply the estimate and are recorded by name. The
    /// result is clamped to [`MIN_P`]..=[`MAX_P`].
    pub fn estimate(
        &mut self,
        profile: &ProblemProfile,
        custom_factors: &BTreeMap<String, f64>,
        loop_iteration: u64,
    ) -> (f64, ProbabilityLog) {
        let novelty_mid = midpoint(profile.novelty.range());
        let prior_mid = midpoint(profile.prior_work.range());
        let data_mult = profile.data_availability.multiplier();
        let constraint_mult = profile.constraint_level.multiplier();

        let combined_base = novelty_mid * 0.6 + prior_mid * 0.4;
        let mut estimated_p = combined_base * data_mult * constraint_mult;

        let mut factors = BTreeMap::from([
            ("novelty".to_string(), novelty_mid),
            ("data_availability".to_string(), data_mult),
            ("constraint_level".to_string(), constraint_mult),
            ("prior_work".to_string(), prior_mid),
        ]);
        for (name, multiplier) in custom_factors {
            estimated_p *= multiplier;
            factors.insert(name.clone(), *multiplier);
        }

        // NaN from a bad custom factor collapses to the floor.
        let estimated_p = if estimated_p.is_nan() {
            MIN_P
        } else {
            estimated_p.clamp(MIN_P, MAX_P)
        };

        let log = ProbabilityLog {
            timestamp: unix_now(),
            loop_iteration,
            estimated_p,
            target_confidence: 0.0,
            calculated_n: 0,
            factors,
            reasoning: format!(
                "Novelty={}, Data={}, Constraints={}, Prior={}",
                profile.novelty,
                profile.data_availability,
                profile.constraint_level,
                profile.prior_work
            ),
        };
        self.history.push(log.clone());
        tracing::debug!(p = estimated_p, iteration = loop_iteration, "estimated per-angle probability");

        (estimated_p, log)
    }

    /// Every estimate made so far, oldest first.
    pub fn history(&self) -> &[ProbabilityLog] {
        &self.history
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
