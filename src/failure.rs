//! Post-hoc failure analysis over a batch of angle results.
//!
//! Failed angles are data: the per-category breakdown shows which
//! perspectives are not paying off.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::angle::{AngleCategory, AngleResult};

/// Failure rate above which a change of categories is recommended.
pub const FAILURE_RATE_THRESHOLD: f64 = 0.9;

/// Coarse advice derived from the failure rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    TryDifferentCategories,
    ContinueCurrentApproach,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TryDifferentCategories => write!(f, "Try different categories"),
            Self::ContinueCurrentApproach => write!(f, "Continue current approach"),
        }
    }
}

/// Summary of where a batch of angles failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    pub total_failures: usize,
    /// Failures / results; 0.0 for an empty batch.
    pub failure_rate: f64,
    /// Every category is present, zero when it had no failures.
    pub failures_by_category: BTreeMap<AngleCategory, usize>,
    /// Category with the most failures; first in canonical order on ties.
    pub worst_performing_category: Option<AngleCategory>,
    pub recommendation: Recommendation,
}

/// Analyze failure patterns in a batch of results.
pub fn analyze_failure_patterns(results: &[AngleResult]) -> FailureReport {
    let mut failures_by_category: BTreeMap<AngleCategory, usize> =
        AngleCategory::ALL.iter().map(|c| (*c, 0)).collect();
    let mut total_failures = 0;
    for result in results.iter().filter(|r| !r.has_signal) {
        *failures_by_category.entry(result.angle.category).or_insert(0) += 1;
        total_failures += 1;
    }

    let mut worst_performing_category = None;
    let mut worst = 0;
    for category in AngleCategory::ALL {
        let count = failures_by_category[&category];
        if count > worst {
            worst = count;
            worst_performing_category = Some(category);
        }
    }

    let failure_rate = if results.is_empty() {
        0.0
    } else {
        total_failures as f64 / results.len() as f64
    };
    let recommendation = if failure_rate > FAILURE_RATE_THRESHOLD {
        Recommendation::TryDifferentCategories
    } else {
        Recommendation::ContinueCurrentApproach
    };

    FailureReport {
        total_failures,
        failure_rate,
        failures_by_category,
        worst_performing_category,
        recommendation,
    }
}
