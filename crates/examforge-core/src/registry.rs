//! Run-scoped generation bookkeeping.
//!
//! The single biggest risk in large-scale generation is semantic monotony:
//! the same concept angle or the same verb repeated across dozens of items.
//! The registry forces lexical and conceptual rotation by tracking which
//! concepts, operations, and concept × operation pairs have been consumed
//! within one assembly run. It is caller-constructed, passed by reference
//! into each stage, and discarded when the run ends; it has no persistence
//! contract.

use std::collections::{HashMap, HashSet};

use crate::fidelity;
use crate::model::{CognitiveLevel, Item};
use crate::similarity;

/// Fixed pool of concept angles rotated per topic.
pub const CONCEPT_POOL: &[&str] = &[
    "core definition",
    "underlying principle",
    "practical application",
    "common misconception",
    "boundary conditions",
    "comparison with alternatives",
    "real-world example",
    "failure mode",
    "historical development",
    "measurement and evaluation",
    "interaction with adjacent concepts",
    "trade-offs",
];

/// Ephemeral rotation state for one assembly run.
#[derive(Debug, Default)]
pub struct GenerationRegistry {
    /// Topic → concepts consumed (offered by rotation or extracted from
    /// accepted bank items).
    used_concepts: HashMap<String, Vec<String>>,
    /// Topic → pool-concept offers, for wrap-around once the pool is spent.
    concept_offers: HashMap<String, usize>,
    /// (topic, level) → operations consumed.
    used_operations: HashMap<(String, CognitiveLevel), Vec<String>>,
    /// (topic, level) → operation offers, for wrap-around.
    operation_offers: HashMap<(String, CognitiveLevel), usize>,
    /// Consumed topic|concept|operation combinations.
    used_pairs: HashSet<String>,
    /// Fingerprint and optional embedding of every accepted item text.
    accepted_texts: Vec<(String, Option<Vec<f32>>)>,
}

impl GenerationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first pool concept not yet used for this topic. Once the pool is
    /// exhausted the rotation wraps around rather than failing, so very
    /// large runs stay live.
    ///
    /// The returned concept is immediately marked used: a rejected
    /// generation attempt must not redraw the same concept.
    pub fn next_concept(&mut self, topic: &str) -> String {
        let unused = {
            let used = self.used_concepts.entry(topic.to_string()).or_default();
            CONCEPT_POOL
                .iter()
                .find(|c| !used.iter().any(|u| u == *c))
                .copied()
        };
        let concept = match unused {
            Some(c) => c.to_string(),
            None => {
                let offers = self.concept_offers.entry(topic.to_string()).or_default();
                let c = CONCEPT_POOL[*offers % CONCEPT_POOL.len()];
                *offers += 1;
                c.to_string()
            }
        };
        self.used_concepts
            .entry(topic.to_string())
            .or_default()
            .push(concept.clone());
        concept
    }

    /// The first cognitive-operation verb for this level not yet used for
    /// this topic × level pair, wrapping once exhausted.
    pub fn next_operation(&mut self, topic: &str, level: CognitiveLevel) -> String {
        let pool = fidelity::rules_for(level).operations;
        let key = (topic.to_string(), level);
        let unused = {
            let used = self.used_operations.entry(key.clone()).or_default();
            pool.iter()
                .find(|op| !used.iter().any(|u| u == *op))
                .copied()
        };
        let operation = match unused {
            Some(op) => op.to_string(),
            None => {
                let offers = self.operation_offers.entry(key.clone()).or_default();
                let op = pool[*offers % pool.len()];
                *offers += 1;
                op.to_string()
            }
        };
        self.used_operations
            .entry(key)
            .or_default()
            .push(operation.clone());
        operation
    }

    /// Record a concept × operation combination. Returns `false` if the
    /// combination was already consumed this run.
    pub fn mark_pair(&mut self, topic: &str, concept: &str, operation: &str) -> bool {
        self.used_pairs
            .insert(format!("{topic}|{concept}|{operation}"))
    }

    /// Register an accepted item (from either the bank selector or the
    /// fallback generator): its text fingerprint, embedding, and concept.
    pub fn register(&mut self, topic: &str, item: &Item, concept: Option<String>) {
        self.accepted_texts
            .push((similarity::fingerprint(&item.text), item.embedding.clone()));
        if let Some(concept) = concept {
            self.used_concepts
                .entry(topic.to_string())
                .or_default()
                .push(concept);
        }
    }

    /// Whether `text` is too close (similarity >= `threshold`) to any item
    /// already accepted in this run.
    pub fn is_near_duplicate(
        &self,
        text: &str,
        embedding: Option<&[f32]>,
        threshold: f64,
    ) -> bool {
        let fp = similarity::fingerprint(text);
        self.accepted_texts.iter().any(|(accepted, accepted_emb)| {
            similarity::item_similarity(&fp, accepted, embedding, accepted_emb.as_deref())
                >= threshold
        })
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted_texts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, ItemBody};
    use uuid::Uuid;

    fn item(text: &str) -> Item {
        Item {
            id: Uuid::new_v4(),
            text: text.to_string(),
            topic: "networks".to_string(),
            level: CognitiveLevel::Remembering,
            difficulty: Difficulty::Easy,
            body: ItemBody::TrueFalse { answer: true },
            embedding: None,
            quality_score: 0.5,
            usage: vec![],
            approved: true,
        }
    }

    #[test]
    fn concepts_never_repeat_while_pool_remains() {
        let mut registry = GenerationRegistry::new();
        let mut seen = HashSet::new();
        for _ in 0..CONCEPT_POOL.len() {
            assert!(seen.insert(registry.next_concept("networks")));
        }
        // Pool exhausted: rotation wraps instead of failing.
        let wrapped = registry.next_concept("networks");
        assert!(CONCEPT_POOL.contains(&wrapped.as_str()));
    }

    #[test]
    fn concept_rotation_is_per_topic() {
        let mut registry = GenerationRegistry::new();
        let a = registry.next_concept("networks");
        let b = registry.next_concept("databases");
        assert_eq!(a, b); // independent rotations both start at the pool head
    }

    #[test]
    fn bank_extracted_concepts_are_skipped_by_rotation() {
        let mut registry = GenerationRegistry::new();
        registry.register(
            "networks",
            &item("What is the core definition of a subnet?"),
            Some(CONCEPT_POOL[0].to_string()),
        );
        assert_eq!(registry.next_concept("networks"), CONCEPT_POOL[1]);
    }

    #[test]
    fn operations_rotate_per_topic_level() {
        let mut registry = GenerationRegistry::new();
        let first = registry.next_operation("networks", CognitiveLevel::Analyzing);
        let second = registry.next_operation("networks", CognitiveLevel::Analyzing);
        assert_ne!(first, second);
        // A different level starts its own rotation.
        let other = registry.next_operation("networks", CognitiveLevel::Remembering);
        assert!(fidelity::rules_for(CognitiveLevel::Remembering)
            .operations
            .contains(&other.as_str()));
    }

    #[test]
    fn operation_rotation_wraps() {
        let mut registry = GenerationRegistry::new();
        let pool = fidelity::rules_for(CognitiveLevel::Applying).operations;
        for _ in 0..pool.len() {
            registry.next_operation("math", CognitiveLevel::Applying);
        }
        let wrapped = registry.next_operation("math", CognitiveLevel::Applying);
        assert!(pool.contains(&wrapped.as_str()));
    }

    #[test]
    fn pair_marking_detects_repeats() {
        let mut registry = GenerationRegistry::new();
        assert!(registry.mark_pair("networks", "trade-offs", "compare"));
        assert!(!registry.mark_pair("networks", "trade-offs", "compare"));
        assert!(registry.mark_pair("networks", "trade-offs", "contrast"));
    }

    #[test]
    fn near_duplicate_detection() {
        let mut registry = GenerationRegistry::new();
        registry.register(
            "networks",
            &item("Explain the difference between TCP and UDP transport protocols"),
            None,
        );
        assert!(registry.is_near_duplicate(
            "Explain the difference between TCP and UDP transport protocols",
            None,
            similarity::BANK_DEDUP_THRESHOLD
        ));
        assert!(!registry.is_near_duplicate(
            "Compute the number of hosts in a /26 subnet",
            None,
            similarity::BANK_DEDUP_THRESHOLD
        ));
    }
}
