//! Angle generation: category-balanced batches and focused branching.
//!
//! The [`AngleGenerator`] trait is one of the engine's three injection points.
//! [`DefaultAngleGenerator`] spreads a batch across categories, handing the
//! remainder to the least-covered categories first so that a run steadily
//! drifts toward perspectives it has not tried yet.

use std::collections::HashSet;

use crate::angle::{Angle, AngleCategory, AngleResult, truncate_chars};
use crate::knowledge::KnowledgeGraph;

/// Produces angles for a problem.
pub trait AngleGenerator {
    /// Generate up to `count` distinct angles.
    ///
    /// `categories` restricts generation; `None` means all eight.
    fn generate(
        &self,
        problem: &str,
        knowledge: &KnowledgeGraph,
        count: usize,
        categories: Option<&[AngleCategory]>,
    ) -> Vec<Angle>;

    /// Generate `count` follow-up angles around a signalling result.
    ///
    /// Every returned angle has `parent_id` set to the result's angle.
    fn branch_on_discovery(&self, result: &AngleResult, count: usize) -> Vec<Angle>;
}

/// Template-driven generator covering all eight categories.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAngleGenerator;

impl DefaultAngleGenerator {
    pub fn new() -> Self {
        Self
    }

    fn root_angle(problem: &str, category: AngleCategory, slot: usize) -> Angle {
        let templates = category.templates();
        let template = templates[slot % templates.len()];
        Angle::new(
            category,
            template.replace("{problem}", truncate_chars(problem, 100)),
        )
        .with_hypothesis(format!(
            "The {category} perspective may reveal patterns in: {}",
            truncate_chars(problem, 50)
        ))
        .with_method(format!("Apply {category} analysis techniques"))
    }
}

impl AngleGenerator for DefaultAngleGenerator {
    fn generate(
        &self,
        problem: &str,
        knowledge: &KnowledgeGraph,
        count: usize,
        categories: Option<&[AngleCategory]>,
    ) -> Vec<Angle> {
        let mut categories: Vec<AngleCategory> = match categories {
            Some(list) if !list.is_empty() => {
                let mut seen = HashSet::new();
                list.iter().copied().filter(|c| seen.insert(*c)).collect()
            }
            _ => AngleCategory::ALL.to_vec(),
        };
        if count == 0 {
            return Vec::new();
        }

        // Least covered first; stable sort keeps canonical order on ties.
        let coverage = knowledge.coverage_by_category();
        categories.sort_by_key(|c| coverage.get(c).copied().unwrap_or(0));

        let per_category = count / categories.len();
        let remainder = count % categories.len();

        let mut seen_ids = HashSet::new();
        let mut angles = Vec::with_capacity(count);
        for (rank, category) in categories.iter().enumerate() {
            let quota = per_category + usize::from(rank < remainder);
            for slot in 0..quota {
                let angle = Self::root_angle(problem, *category, slot);
                if knowledge.contains_angle(&angle.id) || !seen_ids.insert(angle.id.clone()) {
                    continue;
                }
                angles.push(angle);
            }
        }

        tracing::debug!(
            generated = angles.len(),
            categories = categories.len(),
            "generated angle batch"
        );
        angles.truncate(count);
        angles
    }

    fn branch_on_discovery(&self, result: &AngleResult, count: usize) -> Vec<Angle> {
        let source = &result.angle;
        let related = source.category.related();
        let base = truncate_chars(&source.description, 50);

        let angles: Vec<Angle> = (0..count)
            .map(|i| {
                let category = related[i % related.len()];
                Angle::new(
                    category,
                    format!("Follow up on signal: {base} - variation {}", i + 1),
                )
                .with_hypothesis(format!("Deeper exploration of {} finding", source.category))
                .with_method(format!("Specialized {category} analysis"))
                .branched_from(source)
            })
            .collect();

        tracing::debug!(
            branched = angles.len(),
            category = %source.category,
            parent = %source.id,
            "branched angles from signal"
        );
        angles
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn category_counts(angles: &[Angle]) -> BTreeMap<AngleCategory, usize> {
        let mut counts = BTreeMap::new();
        for angle in angles {
            *counts.entry(angle.category).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn generates_exact_count() {
        let kg = KnowledgeGraph::new();
        for count in [1, 5, 8, 20, 24, 48, 173] {
            let angles = DefaultAngleGenerator.generate("Test problem", &kg, count, None);
            assert_eq!(angles.len(), count);
        }
    }

    #[test]
    fn zero_count_is_empty() {
        let kg = KnowledgeGraph::new();
        assert!(DefaultAngleGenerator.generate("p", &kg, 0, None).is_empty());
    }

    #[test]
    fn twenty_four_spans_categories() {
        let kg = KnowledgeGraph::new();
        let angles = DefaultAngleGenerator.generate("Test problem", &kg, 24, None);
        let counts = category_counts(&angles);
        assert!(counts.len() >= 4);
        // 24 / 8 = 3 per category, no remainder.
        assert!(counts.values().all(|&c| c == 3));
    }

    #[test]
    fn respects_category_filter() {
        let kg = KnowledgeGraph::new();
        let allowed = [AngleCategory::Technical, AngleCategory::Inverse];
        let angles = DefaultAngleGenerator.generate("Test problem", &kg, 10, Some(&allowed));
        assert_eq!(angles.len(), 10);
        assert!(angles.iter().all(|a| allowed.contains(&a.category)));
    }

    #[test]
    fn remainder_goes_to_least_covered() {
        let mut kg = KnowledgeGraph::new();
        // Cover every category except Inverse and Meta.
        for category in AngleCategory::ALL {
            if category != AngleCategory::Inverse && category != AngleCategory::Meta {
                kg.add_angle(Angle::new(category, "seen")).unwrap();
            }
        }
        let angles = DefaultAngleGenerator.generate("p", &kg, 2, None);
        let counts = category_counts(&angles);
        assert_eq!(counts.get(&AngleCategory::Meta), Some(&1));
        assert_eq!(counts.get(&AngleCategory::Inverse), Some(&1));
    }

    #[test]
    fn coverage_steers_successive_batches() {
        let mut kg = KnowledgeGraph::new();
        let first = DefaultAngleGenerator.generate("p", &kg, 4, None);
        for angle in &first {
            kg.add_angle(angle.clone()).unwrap();
        }
        let second = DefaultAngleGenerator.generate("p", &kg, 4, None);
        let first_categories: HashSet<_> = first.iter().map(|a| a.category).collect();
        let second_categories: HashSet<_> = second.iter().map(|a| a.category).collect();
        assert!(first_categories.is_disjoint(&second_categories));
    }

    #[test]
    fn templates_cycle_within_category() {
        let kg = KnowledgeGraph::new();
        let angles =
            DefaultAngleGenerator.generate("p", &kg, 7, Some(&[AngleCategory::Temporal]));
        assert_eq!(angles.len(), 7);
        assert_eq!(angles[0].description, "Analyze time-based patterns in p");
        assert_eq!(angles[5].description, angles[0].description);
        assert_eq!(angles[6].description, angles[1].description);
        assert_ne!(angles[0].id, angles[5].id);
    }

    #[test]
    fn problem_text_is_truncated() {
        let kg = KnowledgeGraph::new();
        let problem = "x".repeat(300);
        let angle = &DefaultAngleGenerator.generate(&problem, &kg, 1, Some(&[AngleCategory::Technical]))[0];
        assert_eq!(angle.description, format!("Apply standard algorithms to {}", "x".repeat(100)));
        assert!(angle.hypothesis.ends_with(&"x".repeat(50)));
        assert!(!angle.hypothesis.ends_with(&"x".repeat(51)));
    }

    #[test]
    fn branch_sets_parent_and_count() {
        let source = Angle::new(AngleCategory::Structural, "Examine format");
        let result = AngleResult::signal(source.clone(), 0.8);
        let branches = DefaultAngleGenerator.branch_on_discovery(&result, 15);
        assert_eq!(branches.len(), 15);
        for angle in &branches {
            assert_eq!(angle.parent_id.as_ref(), Some(&source.id));
            assert_eq!(angle.depth, 1);
        }
    }

    #[test]
    fn branch_cycles_related_categories() {
        let source = Angle::new(AngleCategory::Structural, "s");
        let result = AngleResult::signal(source, 0.5);
        let branches = DefaultAngleGenerator.branch_on_discovery(&result, 6);
        let categories: Vec<_> = branches.iter().map(|a| a.category).collect();
        assert_eq!(
            categories,
            vec![
                AngleCategory::Structural,
                AngleCategory::Technical,
                AngleCategory::Relational,
                AngleCategory::Structural,
                AngleCategory::Technical,
                AngleCategory::Relational,
            ]
        );
        assert_eq!(branches[0].description, "Follow up on signal: s - variation 1");
    }
}
