//! Core angle types: categories, angles, execution results, and discoveries.
//!
//! An [`Angle`] is one analytical perspective on a problem, drawn from one of
//! eight fixed [`AngleCategory`] values. Executing an angle yields an
//! [`AngleResult`]; discovery-grade results are synthesized into [`Discovery`]
//! records by the engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Minimum signal strength for a signalling result to count as a discovery.
pub const DISCOVERY_THRESHOLD: f64 = 0.3;

/// Current Unix time in seconds.
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Truncate to at most `max` characters without splitting a code point.
pub(crate) fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// The eight perspective categories an angle can be drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleCategory {
    /// Time-based patterns, sequences, correlation with events.
    Temporal,
    /// Format, encoding, nesting, length patterns.
    Structural,
    /// Connections to other data, networks, similarities.
    Relational,
    /// Meaning, language, cultural context.
    Semantic,
    /// Who made this, why, what changed.
    Meta,
    /// Human intel, archives, existing tools, communities.
    Source,
    /// Algorithms, methods, edge cases.
    Technical,
    /// What would make this unsolvable, which assumptions are wrong.
    Inverse,
}

impl AngleCategory {
    /// All eight categories in canonical order.
    pub const ALL: [AngleCategory; 8] = [
        AngleCategory::Temporal,
        AngleCategory::Structural,
        AngleCategory::Relational,
        AngleCategory::Semantic,
        AngleCategory::Meta,
        AngleCategory::Source,
        AngleCategory::Technical,
        AngleCategory::Inverse,
    ];

    /// Lowercase label for this category.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Temporal => "temporal",
            Self::Structural => "structural",
            Self::Relational => "relational",
            Self::Semantic => "semantic",
            Self::Meta => "meta",
            Self::Source => "source",
            Self::Technical => "technical",
            Self::Inverse => "inverse",
        }
    }

    /// Phrasing templates for angles in this category.
    ///
    /// `{problem}` is substituted with the (truncated) problem text.
    pub fn templates(&self) -> &'static [&'static str] {
        match self {
            Self::Temporal => &[
                "Analyze time-based patterns in {problem}",
                "Look for sequences and progressions",
                "Correlate with known events or timelines",
                "Examine frequency distributions over time",
                "Search for periodic or cyclical patterns",
            ],
            Self::Structural => &[
                "Examine format and encoding structures of {problem}",
                "Look for nesting and hierarchical patterns",
                "Analyze length and size distributions",
                "Search for delimiters and boundaries",
                "Investigate byte-level patterns",
            ],
            Self::Relational => &[
                "Map connections from {problem} to related data sources",
                "Build network graphs of relationships",
                "Find similarities with known patterns",
                "Trace dependencies and references",
                "Cluster by similarity metrics",
            ],
            Self::Semantic => &[
                "Extract meaning and intent behind {problem}",
                "Analyze language and terminology",
                "Consider cultural context",
                "Examine selection criteria and significance",
                "Look for hidden messages or encodings",
            ],
            Self::Meta => &[
                "Investigate who created {problem} and why",
                "Look for what is being hidden or obscured",
                "Track what changed and when",
                "Examine metadata and provenance",
                "Analyze the creation process itself",
            ],
            Self::Source => &[
                "Search for people who know about {problem}",
                "Examine archives and historical records",
                "Look for existing tools and solutions",
                "Find communities who have worked on similar problems",
                "Gather domain expert knowledge",
            ],
            Self::Technical => &[
                "Apply standard algorithms to {problem}",
                "Try edge case handling approaches",
                "Combine multiple techniques",
                "Use brute force enumeration where feasible",
                "Apply statistical analysis methods",
            ],
            Self::Inverse => &[
                "What would make {problem} unsolvable?",
                "Which assumptions might be wrong?",
                "What if the problem is misframed?",
                "What constraints might be artificial?",
                "What would disprove the current theory?",
            ],
        }
    }

    /// Categories explored when branching from a signal in this category.
    ///
    /// The first entry is always the category itself.
    pub fn related(&self) -> [AngleCategory; 3] {
        use AngleCategory::*;
        match self {
            Temporal => [Temporal, Structural, Meta],
            Structural => [Structural, Technical, Relational],
            Relational => [Relational, Semantic, Source],
            Semantic => [Semantic, Meta, Inverse],
            Meta => [Meta, Source, Temporal],
            Source => [Source, Relational, Technical],
            Technical => [Technical, Structural, Inverse],
            Inverse => [Inverse, Semantic, Meta],
        }
    }
}

impl std::fmt::Display for AngleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Unique identifier for an angle: 16 lowercase hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AngleId(String);

impl AngleId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(format!("{:016x}", rand::random::<u64>()))
    }

    /// Wrap an existing id string (e.g. one restored from a checkpoint).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AngleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "angle:{}", self.0)
    }
}

/// Unique identifier for a discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscoveryId(String);

impl DiscoveryId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(format!("{:016x}", rand::random::<u64>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DiscoveryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "discovery:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Angle
// ---------------------------------------------------------------------------

/// A specific frame or perspective on a problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Angle {
    pub id: AngleId,
    pub category: AngleCategory,
    /// Human-readable description of what the angle looks at.
    pub description: String,
    /// What the angle expects to find.
    pub hypothesis: String,
    /// How the angle should be executed.
    pub method: String,
    /// Set when the angle was branched from another angle's signal.
    pub parent_id: Option<AngleId>,
    /// Branching depth: 0 for generated angles, parent depth + 1 for branches.
    pub depth: u32,
    /// Unix seconds.
    pub created_at: u64,
}

impl Angle {
    /// Create a root angle with a fresh id.
    pub fn new(category: AngleCategory, description: impl Into<String>) -> Self {
        Self {
            id: AngleId::generate(),
            category,
            description: description.into(),
            hypothesis: String::new(),
            method: String::new(),
            parent_id: None,
            depth: 0,
            created_at: unix_now(),
        }
    }

    pub fn with_hypothesis(mut self, hypothesis: impl Into<String>) -> Self {
        self.hypothesis = hypothesis.into();
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Mark this angle as a branch of `parent`.
    pub fn branched_from(mut self, parent: &Angle) -> Self {
        self.parent_id = Some(parent.id.clone());
        self.depth = parent.depth + 1;
        self
    }
}

// ---------------------------------------------------------------------------
// Angle results
// ---------------------------------------------------------------------------

/// Outcome of executing a single angle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleResult {
    pub angle: Angle,
    pub has_signal: bool,
    /// Signal strength in [0.0, 1.0].
    pub signal_strength: f64,
    pub findings: Vec<String>,
    /// Open-ended executor artifacts.
    #[serde(default)]
    pub artifacts: BTreeMap<String, serde_json::Value>,
    pub duration_ms: u64,
    pub error: Option<String>,
    /// Unix seconds.
    pub executed_at: u64,
}

impl AngleResult {
    /// A result with no signal.
    pub fn no_signal(angle: Angle) -> Self {
        Self {
            angle,
            has_signal: false,
            signal_strength: 0.0,
            findings: Vec::new(),
            artifacts: BTreeMap::new(),
            duration_ms: 0,
            error: None,
            executed_at: unix_now(),
        }
    }

    /// A signalling result. Strength is clamped to [0.0, 1.0].
    pub fn signal(angle: Angle, strength: f64) -> Self {
        Self {
            has_signal: true,
            signal_strength: clamp_unit(strength),
            ..Self::no_signal(angle)
        }
    }

    /// A failed execution with the error captured.
    pub fn failed(angle: Angle, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::no_signal(angle)
        }
    }

    /// Override signal strength without changing `has_signal`.
    pub fn with_strength(mut self, strength: f64) -> Self {
        self.signal_strength = clamp_unit(strength);
        self
    }

    pub fn with_finding(mut self, finding: impl Into<String>) -> Self {
        self.findings.push(finding.into());
        self
    }

    pub fn with_artifact(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.artifacts.insert(key.into(), value);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Whether this result counts as a discovery: signal of at least
    /// [`DISCOVERY_THRESHOLD`] strength.
    pub fn is_discovery(&self) -> bool {
        self.has_signal && self.signal_strength >= DISCOVERY_THRESHOLD
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Discoveries
// ---------------------------------------------------------------------------

/// A validated finding synthesized from discovery-grade results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discovery {
    pub id: DiscoveryId,
    pub title: String,
    pub description: String,
    /// Confidence in [0.0, 1.0].
    pub confidence: f64,
    pub source_angles: Vec<AngleId>,
    pub implications: Vec<String>,
    pub next_questions: Vec<String>,
    /// Unix seconds.
    pub created_at: u64,
}

impl Discovery {
    /// Synthesize a discovery from a single discovery-grade result.
    pub fn from_result(result: &AngleResult) -> Self {
        let description = if result.findings.is_empty() {
            "Signal detected".to_string()
        } else {
            result.findings.join("; ")
        };
        Self {
            id: DiscoveryId::generate(),
            title: format!("Discovery from {} analysis", result.angle.category),
            description,
            confidence: result.signal_strength,
            source_angles: vec![result.angle.id.clone()],
            implications: Vec::new(),
            next_questions: Vec::new(),
            created_at: unix_now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_round_trip_through_serde() {
        for category in AngleCategory::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.label()));
            let back: AngleCategory = serde_json::from_str(&json).unwrap();
            assert_eq!(back, category);
        }
    }

    #[test]
    fn every_category_has_five_templates() {
        for category in AngleCategory::ALL {
            assert_eq!(category.templates().len(), 5, "{category}");
        }
    }

    #[test]
    fn related_categories_start_with_self() {
        for category in AngleCategory::ALL {
            assert_eq!(category.related()[0], category);
        }
    }

    #[test]
    fn angle_ids_are_unique() {
        let ids: std::collections::HashSet<_> = (0..1000)
            .map(|_| Angle::new(AngleCategory::Technical, "x").id)
            .collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn angle_id_is_sixteen_hex_digits() {
        let id = AngleId::generate();
        assert_eq!(id.as_str().len(), 16);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn branched_angle_tracks_parent_and_depth() {
        let root = Angle::new(AngleCategory::Meta, "root");
        let child = Angle::new(AngleCategory::Source, "child").branched_from(&root);
        let grandchild = Angle::new(AngleCategory::Meta, "grandchild").branched_from(&child);
        assert_eq!(child.parent_id.as_ref(), Some(&root.id));
        assert_eq!(child.depth, 1);
        assert_eq!(grandchild.depth, 2);
    }

    #[test]
    fn discovery_threshold_boundary() {
        let angle = Angle::new(AngleCategory::Technical, "t");
        assert!(AngleResult::signal(angle.clone(), 0.3).is_discovery());
        assert!(!AngleResult::signal(angle.clone(), 0.2999).is_discovery());
        assert!(AngleResult::signal(angle.clone(), 0.5).is_discovery());
    }

    #[test]
    fn strength_without_signal_is_not_discovery() {
        let angle = Angle::new(AngleCategory::Technical, "t");
        let result = AngleResult::no_signal(angle).with_strength(0.9);
        assert!(!result.has_signal);
        assert!(!result.is_discovery());
    }

    #[test]
    fn signal_strength_is_clamped() {
        let angle = Angle::new(AngleCategory::Inverse, "i");
        assert_eq!(AngleResult::signal(angle.clone(), 3.0).signal_strength, 1.0);
        assert_eq!(AngleResult::signal(angle.clone(), -1.0).signal_strength, 0.0);
        assert_eq!(AngleResult::signal(angle, f64::NAN).signal_strength, 0.0);
    }

    #[test]
    fn failed_result_captures_error() {
        let angle = Angle::new(AngleCategory::Source, "s");
        let result = AngleResult::failed(angle, "timeout");
        assert!(!result.has_signal);
        assert_eq!(result.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn discovery_synthesis_joins_findings() {
        let angle = Angle::new(AngleCategory::Structural, "s");
        let result = AngleResult::signal(angle.clone(), 0.7)
            .with_finding("header repeats")
            .with_finding("offset 0x40");
        let discovery = Discovery::from_result(&result);
        assert_eq!(discovery.title, "Discovery from structural analysis");
        assert_eq!(discovery.description, "header repeats; offset 0x40");
        assert!((discovery.confidence - 0.7).abs() < f64::EPSILON);
        assert_eq!(discovery.source_angles, vec![angle.id]);
    }

    #[test]
    fn discovery_synthesis_falls_back_without_findings() {
        let result = AngleResult::signal(Angle::new(AngleCategory::Meta, "m"), 0.4);
        assert_eq!(Discovery::from_result(&result).description, "Signal detected");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
