//! Knowledge graph: the append-only working memory of one discovery run.
//!
//! Records every angle tried, every result, every synthesized discovery, and
//! free-form connections between them. Entries are only ever added. Derived
//! views (failed angles, category coverage) are computed by scanning so they
//! can never go stale.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::angle::{Angle, AngleCategory, AngleId, AngleResult, Discovery, DiscoveryId, unix_now};
use crate::error::KnowledgeError;

/// Result type for knowledge graph operations.
pub type KnowledgeResult<T> = std::result::Result<T, KnowledgeError>;

/// A directed, labelled link between two recorded entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
    pub relationship: String,
}

/// Accumulated knowledge across discovery iterations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    angles: HashMap<AngleId, Angle>,
    results: HashMap<AngleId, AngleResult>,
    discoveries: HashMap<DiscoveryId, Discovery>,
    /// Discovery ids in the order they were recorded.
    #[serde(default)]
    discovery_order: Vec<DiscoveryId>,
    /// Caller-supplied context; the engine stores the problem under `"problem"`.
    pub domain_knowledge: BTreeMap<String, serde_json::Value>,
    connections: Vec<Connection>,
    created_at: u64,
    last_updated: u64,
}

impl KnowledgeGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        let now = unix_now();
        Self {
            angles: HashMap::new(),
            results: HashMap::new(),
            discoveries: HashMap::new(),
            discovery_order: Vec::new(),
            domain_knowledge: BTreeMap::new(),
            connections: Vec::new(),
            created_at: now,
            last_updated: now,
        }
    }

    fn touch(&mut self) {
        self.last_updated = unix_now();
    }

    // -- Mutation -----------------------------------------------------------

    /// Register an angle. Fails if the id is already known.
    pub fn add_angle(&mut self, angle: Angle) -> KnowledgeResult<()> {
        if self.angles.contains_key(&angle.id) {
            return Err(KnowledgeError::DuplicateAngle {
                angle_id: angle.id.as_str().to_string(),
            });
        }
        self.angles.insert(angle.id.clone(), angle);
        self.touch();
        Ok(())
    }

    /// Record the result of an angle execution.
    ///
    /// The angle must already be registered. Recording a result for the same
    /// angle again replaces it, which makes re-merging a batch idempotent.
    pub fn add_result(&mut self, result: AngleResult) -> KnowledgeResult<()> {
        if !self.angles.contains_key(&result.angle.id) {
            return Err(KnowledgeError::UnregisteredAngle {
                angle_id: result.angle.id.as_str().to_string(),
            });
        }
        self.results.insert(result.angle.id.clone(), result);
        self.touch();
        Ok(())
    }

    /// Record a synthesized discovery.
    pub fn add_discovery(&mut self, discovery: Discovery) {
        let id = discovery.id.clone();
        if self.discoveries.insert(id.clone(), discovery).is_none() {
            self.discovery_order.push(id);
        }
        self.touch();
    }

    /// Record a relationship between two entities.
    pub fn add_connection(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        relationship: impl Into<String>,
    ) {
        self.connections.push(Connection {
            from: from.into(),
            to: to.into(),
            relationship: relationship.into(),
        });
        self.touch();
    }

    /// Store a piece of caller-supplied context.
    pub fn set_domain_knowledge(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.domain_knowledge.insert(key.into(), value);
        self.touch();
    }

    /// Merge a batch of results into the graph.
    pub fn merge<'a, I>(&mut self, results: I) -> KnowledgeResult<&mut Self>
    where
        I: IntoIterator<Item = &'a AngleResult>,
    {
        for result in results {
            self.add_result(result.clone())?;
        }
        Ok(self)
    }

    // -- Queries ------------------------------------------------------------

    pub fn angle(&self, id: &AngleId) -> Option<&Angle> {
        self.angles.get(id)
    }

    pub fn result(&self, id: &AngleId) -> Option<&AngleResult> {
        self.results.get(id)
    }

    pub fn contains_angle(&self, id: &AngleId) -> bool {
        self.angles.contains_key(id)
    }

    pub fn angles(&self) -> impl Iterator<Item = &Angle> {
        self.angles.values()
    }

    pub fn results(&self) -> impl Iterator<Item = &AngleResult> {
        self.results.values()
    }

    pub fn angle_count(&self) -> usize {
        self.angles.len()
    }

    pub fn result_count(&self) -> usize {
        self.results.len()
    }

    pub fn discovery_count(&self) -> usize {
        self.discoveries.len()
    }

    /// Discoveries in the order they were recorded.
    pub fn discoveries(&self) -> Vec<&Discovery> {
        let mut list: Vec<&Discovery> = self
            .discovery_order
            .iter()
            .filter_map(|id| self.discoveries.get(id))
            .collect();
        if list.len() < self.discoveries.len() {
            // Graphs serialized without an order: the rest by creation time, then id.
            let mut rest: Vec<&Discovery> = self
                .discoveries
                .values()
                .filter(|d| !self.discovery_order.contains(&d.id))
                .collect();
            rest.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
            list.extend(rest);
        }
        list
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Results that had signal.
    pub fn successful_results(&self) -> Vec<&AngleResult> {
        self.results.values().filter(|r| r.has_signal).collect()
    }

    /// Results that had no signal.
    pub fn failed_results(&self) -> Vec<&AngleResult> {
        self.results.values().filter(|r| !r.has_signal).collect()
    }

    /// Ids of angles whose result had no signal.
    pub fn failed_approaches(&self) -> Vec<&AngleId> {
        self.results
            .values()
            .filter(|r| !r.has_signal)
            .map(|r| &r.angle.id)
            .collect()
    }

    /// Number of registered angles per category, every category present.
    pub fn coverage_by_category(&self) -> BTreeMap<AngleCategory, usize> {
        let mut coverage: BTreeMap<AngleCategory, usize> =
            AngleCategory::ALL.iter().map(|c| (*c, 0)).collect();
        for angle in self.angles.values() {
            *coverage.entry(angle.category).or_insert(0) += 1;
        }
        coverage
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn last_updated(&self) -> u64 {
        self.last_updated
    }

    // -- Serialization ------------------------------------------------------

    /// Serialize to a JSON value (used inside checkpoints).
    pub fn to_value(&self) -> KnowledgeResult<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| KnowledgeError::Serialization {
            message: e.to_string(),
        })
    }

    /// Restore from a JSON value produced by [`to_value`](Self::to_value).
    pub fn from_value(value: serde_json::Value) -> KnowledgeResult<Self> {
        serde_json::from_value(value).map_err(|e| KnowledgeError::Serialization {
            message: e.to_string(),
        })
    }

    /// Serialize to a pretty JSON string.
    pub fn to_json(&self) -> KnowledgeResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| KnowledgeError::Serialization {
            message: e.to_string(),
        })
    }

    /// Parse a graph from a JSON string.
    pub fn from_json(json: &str) -> KnowledgeResult<Self> {
        serde_json::from_str(json).map_err(|e| KnowledgeError::Serialization {
            message: e.to_string(),
        })
    }
}

impl Default for KnowledgeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for KnowledgeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "knowledge graph")?;
        writeln!(f, "  angles:       {}", self.angles.len())?;
        writeln!(f, "  results:      {}", self.results.len())?;
        writeln!(f, "  failed:       {}", self.failed_approaches().len())?;
        writeln!(f, "  discoveries:  {}", self.discoveries.len())?;
        writeln!(f, "  connections:  {}", self.connections.len())?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn registered(kg: &mut KnowledgeGraph, category: AngleCategory) -> Angle {
        let angle = Angle::new(category, "test");
        kg.add_angle(angle.clone()).unwrap();
        angle
    }

    #[test]
    fn add_and_retrieve_angle() {
        let mut kg = KnowledgeGraph::new();
        let angle = registered(&mut kg, AngleCategory::Technical);
        assert_eq!(kg.angle(&angle.id), Some(&angle));
        assert_eq!(kg.angle_count(), 1);
    }

    #[test]
    fn duplicate_angle_rejected() {
        let mut kg = KnowledgeGraph::new();
        let angle = registered(&mut kg, AngleCategory::Technical);
        let err = kg.add_angle(angle).unwrap_err();
        assert!(matches!(err, KnowledgeError::DuplicateAngle { .. }));
        assert_eq!(kg.angle_count(), 1);
    }

    #[test]
    fn result_requires_registered_angle() {
        let mut kg = KnowledgeGraph::new();
        let orphan = Angle::new(AngleCategory::Meta, "orphan");
        let err = kg.add_result(AngleResult::no_signal(orphan)).unwrap_err();
        assert!(matches!(err, KnowledgeError::UnregisteredAngle { .. }));
        assert_eq!(kg.result_count(), 0);
    }

    #[test]
    fn failed_approaches_are_derived() {
        let mut kg = KnowledgeGraph::new();
        let hit = registered(&mut kg, AngleCategory::Technical);
        let miss = registered(&mut kg, AngleCategory::Semantic);
        kg.add_result(AngleResult::signal(hit.clone(), 0.5)).unwrap();
        kg.add_result(AngleResult::no_signal(miss.clone())).unwrap();

        assert_eq!(kg.failed_approaches(), vec![&miss.id]);
        let successful = kg.successful_results();
        assert_eq!(successful.len(), 1);
        assert_eq!(successful[0].angle.id, hit.id);
        assert_eq!(kg.failed_results().len(), 1);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut kg = KnowledgeGraph::new();
        let a = registered(&mut kg, AngleCategory::Temporal);
        let b = registered(&mut kg, AngleCategory::Inverse);
        let batch = vec![AngleResult::signal(a, 0.6), AngleResult::no_signal(b)];
        kg.merge(&batch).unwrap();
        kg.merge(&batch).unwrap();
        assert_eq!(kg.result_count(), 2);
        assert_eq!(kg.failed_approaches().len(), 1);
    }

    #[test]
    fn coverage_counts_every_category() {
        let mut kg = KnowledgeGraph::new();
        registered(&mut kg, AngleCategory::Technical);
        registered(&mut kg, AngleCategory::Technical);
        registered(&mut kg, AngleCategory::Semantic);

        let coverage = kg.coverage_by_category();
        assert_eq!(coverage.len(), 8);
        assert_eq!(coverage[&AngleCategory::Technical], 2);
        assert_eq!(coverage[&AngleCategory::Semantic], 1);
        assert_eq!(coverage[&AngleCategory::Inverse], 0);
    }

    #[test]
    fn mutations_refresh_last_updated() {
        let mut kg = KnowledgeGraph::new();
        let before = kg.last_updated();
        kg.add_connection("a", "b", "relates_to");
        assert!(kg.last_updated() >= before);
        assert_eq!(kg.connections().len(), 1);
        assert_eq!(kg.connections()[0].relationship, "relates_to");
    }

    #[test]
    fn json_round_trip_preserves_contents() {
        let mut kg = KnowledgeGraph::new();
        let angle = registered(&mut kg, AngleCategory::Structural);
        let result = AngleResult::signal(angle.clone(), 0.8)
            .with_finding("found")
            .with_artifact("offset", serde_json::json!(64));
        kg.add_result(result.clone()).unwrap();
        kg.add_discovery(Discovery::from_result(&result));
        kg.add_connection("x", angle.id.as_str(), "synthesized_from");
        kg.set_domain_knowledge("problem", serde_json::json!("decode it"));

        let restored = KnowledgeGraph::from_json(&kg.to_json().unwrap()).unwrap();
        assert_eq!(restored.angle(&angle.id), Some(&angle));
        assert_eq!(restored.result(&angle.id), Some(&result));
        assert_eq!(restored.discovery_count(), 1);
        assert_eq!(restored.connections(), kg.connections());
        assert_eq!(restored.domain_knowledge["problem"], "decode it");
        assert_eq!(restored.created_at(), kg.created_at());
    }

    #[test]
    fn discoveries_keep_recording_order() {
        let mut kg = KnowledgeGraph::new();
        let mut recorded = Vec::new();
        for category in AngleCategory::ALL.iter().cycle().take(20) {
            let angle = registered(&mut kg, *category);
            let discovery = Discovery::from_result(&AngleResult::signal(angle, 0.5));
            recorded.push(discovery.id.clone());
            kg.add_discovery(discovery);
        }
        // Re-recording an existing discovery keeps its position.
        let first = kg.discoveries()[0].clone();
        kg.add_discovery(first);

        let ids: Vec<_> = kg.discoveries().iter().map(|d| d.id.clone()).collect();
        assert_eq!(ids, recorded);

        let restored = KnowledgeGraph::from_json(&kg.to_json().unwrap()).unwrap();
        let ids: Vec<_> = restored.discoveries().iter().map(|d| d.id.clone()).collect();
        assert_eq!(ids, recorded);
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let err = KnowledgeGraph::from_json("{not json").unwrap_err();
        assert!(matches!(err, KnowledgeError::Serialization { .. }));
    }
}
