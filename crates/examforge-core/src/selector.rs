//! Bank selection: filling slots from the existing item pool.
//!
//! Slots are grouped by (topic, level, difficulty, item type) for batched
//! retrieval — one store query per group, issued concurrently since the
//! groups are disjoint. Consumption is sequential: it mutates the shared
//! candidate pool and the registry. Within a group, candidates are taken
//! greedily per slot, skipping structurally broken items and anything too
//! close to text already accepted this run.

use std::collections::BTreeMap;

use futures::stream::{FuturesUnordered, StreamExt};

use crate::model::{CognitiveLevel, Difficulty, Item, ItemType};
use crate::planner::{Slot, SlotSource};
use crate::registry::GenerationRegistry;
use crate::similarity::BANK_DEDUP_THRESHOLD;
use crate::traits::{ItemQuery, ItemStore};

type GroupKey = (String, CognitiveLevel, Difficulty, ItemType);

/// Result of a bank-selection pass.
#[derive(Debug, Default)]
pub struct SelectionOutcome {
    /// Slots filled from the bank.
    pub filled: usize,
    pub warnings: Vec<String>,
}

/// Fill as many unfilled slots as the bank can supply.
///
/// A store error for one group marks that whole group unfilled; there is no
/// partial-group retry at this layer — the fallback generator covers the
/// gap one level up.
pub async fn fill(
    slots: &mut [Slot],
    registry: &mut GenerationRegistry,
    store: &dyn ItemStore,
    allow_unapproved: bool,
) -> SelectionOutcome {
    let mut groups: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
    for (i, slot) in slots.iter().enumerate() {
        if !slot.is_filled() {
            let key = (
                slot.topic.clone(),
                slot.level,
                slot.difficulty,
                slot.item_type,
            );
            groups.entry(key).or_default().push(i);
        }
    }

    // Disjoint groups: fan the queries out, then merge by key before the
    // sequential slot-by-slot consumption.
    let mut queries = FuturesUnordered::new();
    for key in groups.keys().cloned() {
        let query = ItemQuery {
            topic: key.0.clone(),
            level: key.1,
            difficulty: key.2,
            item_type: key.3,
            approved_only: !allow_unapproved,
        };
        queries.push(async move {
            let result = store.search(&query).await;
            (key, result)
        });
    }

    let mut results: BTreeMap<GroupKey, anyhow::Result<Vec<Item>>> = BTreeMap::new();
    while let Some((key, result)) = queries.next().await {
        results.insert(key, result);
    }

    let mut outcome = SelectionOutcome::default();
    for (key, slot_indices) in &groups {
        let mut candidates = match results.remove(key) {
            Some(Ok(items)) => items,
            Some(Err(e)) => {
                tracing::warn!(
                    topic = %key.0, level = %key.1, difficulty = %key.2,
                    "bank query failed: {e:#}"
                );
                outcome.warnings.push(format!(
                    "bank query failed for {}/{}/{}/{}; {} slot(s) left unfilled",
                    key.0,
                    key.1,
                    key.2,
                    key.3,
                    slot_indices.len()
                ));
                continue;
            }
            None => continue,
        };

        // Least-used first, older last use preferred, then quality.
        candidates.sort_by(|a, b| {
            a.usage_count()
                .cmp(&b.usage_count())
                .then_with(|| a.last_used_at().cmp(&b.last_used_at()))
                .then_with(|| {
                    b.quality_score
                        .partial_cmp(&a.quality_score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });

        for &slot_index in slot_indices {
            let Some(pos) = candidates.iter().position(|c| acceptable(c, registry)) else {
                continue; // no acceptable candidate; the generator may cover it
            };
            // Accepted items leave the pool: no reuse across slots in a run.
            let item = candidates.remove(pos);
            let concept = extract_concept(&item.text);
            registry.register(&key.0, &item, concept);
            slots[slot_index].fill(item, SlotSource::Bank);
            outcome.filled += 1;
        }
    }

    outcome
}

fn acceptable(candidate: &Item, registry: &GenerationRegistry) -> bool {
    if candidate.body.validate().is_err() {
        return false;
    }
    !registry.is_near_duplicate(
        &candidate.text,
        candidate.embedding.as_deref(),
        BANK_DEDUP_THRESHOLD,
    )
}

/// Best-effort concept extraction from an item stem.
///
/// Tries, in order: a quoted phrase, the object of an "of the ..."
/// construction, and a capitalized multi-word run. Returns `None` when
/// nothing plausible is found; the registry rotation does not depend on it.
pub fn extract_concept(text: &str) -> Option<String> {
    for quote in ['"', '\''] {
        let mut parts = text.split(quote);
        if let (Some(_), Some(inner)) = (parts.next(), parts.next()) {
            let inner = inner.trim();
            if inner.len() > 2 && inner.split_whitespace().count() <= 6 {
                return Some(inner.to_lowercase());
            }
        }
    }

    const STOPWORDS: [&str; 12] = [
        "in", "on", "of", "to", "for", "and", "or", "the", "a", "an", "with", "is",
    ];
    for marker in [" of the ", " of a ", " of an ", " of "] {
        if let Some(pos) = text.find(marker) {
            let tail = &text[pos + marker.len()..];
            let phrase: Vec<&str> = tail
                .split_whitespace()
                .take_while(|w| {
                    w.chars().all(|c| c.is_alphanumeric() || c == '-')
                        && !STOPWORDS.contains(&w.to_lowercase().as_str())
                })
                .take(3)
                .collect();
            if !phrase.is_empty() {
                return Some(phrase.join(" ").to_lowercase());
            }
        }
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let mut run: Vec<&str> = Vec::new();
    for word in words.iter().skip(1) {
        let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric());
        if trimmed.chars().next().is_some_and(|c| c.is_uppercase()) && trimmed.len() > 2 {
            run.push(trimmed);
        } else {
            if run.len() >= 2 {
                break;
            }
            run.clear();
        }
    }
    if !run.is_empty() {
        return Some(run.join(" ").to_lowercase());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CoveragePlan, ItemBody, TopicRequirement};
    use crate::planner;
    use async_trait::async_trait;
    use std::collections::BTreeMap as Map;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct StubStore {
        items: Mutex<Vec<Item>>,
        fail_for_topic: Option<String>,
    }

    #[async_trait]
    impl ItemStore for StubStore {
        async fn search(&self, query: &ItemQuery) -> anyhow::Result<Vec<Item>> {
            if self.fail_for_topic.as_deref() == Some(query.topic.as_str()) {
                anyhow::bail!("store offline");
            }
            Ok(self
                .items
                .lock()
                .unwrap()
                .iter()
                .filter(|i| {
                    i.topic == query.topic
                        && i.level == query.level
                        && i.difficulty == query.difficulty
                        && i.item_type() == query.item_type
                        && (!query.approved_only || i.approved)
                })
                .cloned()
                .collect())
        }

        async fn insert_many(&self, items: Vec<Item>) -> anyhow::Result<Vec<Item>> {
            self.items.lock().unwrap().extend(items.clone());
            Ok(items)
        }

        async fn record_usage(&self, _item_ids: &[Uuid], _test_id: Uuid) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn tf_item(topic: &str, level: CognitiveLevel, difficulty: Difficulty, text: &str) -> Item {
        Item {
            id: Uuid::new_v4(),
            text: text.to_string(),
            topic: topic.to_string(),
            level,
            difficulty,
            body: ItemBody::TrueFalse { answer: true },
            embedding: None,
            quality_score: 0.5,
            usage: vec![],
            approved: true,
        }
    }

    fn mc_item(topic: &str, level: CognitiveLevel, difficulty: Difficulty, text: &str) -> Item {
        let choices: Map<String, String> = [
            ("A".to_string(), format!("{text} option one")),
            ("B".to_string(), format!("{text} option two")),
            ("C".to_string(), format!("{text} option three")),
            ("D".to_string(), format!("{text} option four")),
        ]
        .into();
        Item {
            body: ItemBody::MultipleChoice {
                choices,
                correct: "B".to_string(),
            },
            ..tf_item(topic, level, difficulty, text)
        }
    }

    fn small_plan(topic: &str) -> CoveragePlan {
        CoveragePlan {
            id: "p".into(),
            name: "p".into(),
            description: String::new(),
            topics: vec![TopicRequirement {
                topic: topic.to_string(),
                hours: 1.0,
                per_level: [(CognitiveLevel::Remembering, 1u32)].into(),
                per_difficulty: [(Difficulty::Easy, 1u32)].into(),
            }],
        }
    }

    #[tokio::test]
    async fn fills_from_bank_and_registers() {
        let mut slots = planner::expand(&small_plan("os"), 3);
        let store = StubStore {
            items: Mutex::new(vec![
                mc_item("os", CognitiveLevel::Remembering, Difficulty::Easy, "What does a scheduler decide for runnable processes?"),
                mc_item("os", CognitiveLevel::Remembering, Difficulty::Easy, "Which table maps virtual pages onto physical frames?"),
                mc_item("os", CognitiveLevel::Remembering, Difficulty::Easy, "Where does the kernel keep per-process open file state?"),
            ]),
            fail_for_topic: None,
        };
        let mut registry = GenerationRegistry::new();

        let outcome = fill(&mut slots, &mut registry, &store, false).await;
        assert_eq!(outcome.filled, 3);
        assert!(slots.iter().all(|s| s.is_filled()));
        assert!(slots.iter().all(|s| s.source == Some(SlotSource::Bank)));
        assert_eq!(registry.accepted_count(), 3);
    }

    #[tokio::test]
    async fn near_duplicates_are_rejected() {
        let mut slots = planner::expand(&small_plan("os"), 2);
        let store = StubStore {
            items: Mutex::new(vec![
                mc_item("os", CognitiveLevel::Remembering, Difficulty::Easy, "Which table maps virtual pages onto physical frames today?"),
                mc_item("os", CognitiveLevel::Remembering, Difficulty::Easy, "Which table maps virtual pages onto physical frames now?"),
            ]),
            fail_for_topic: None,
        };
        let mut registry = GenerationRegistry::new();

        let outcome = fill(&mut slots, &mut registry, &store, false).await;
        assert_eq!(outcome.filled, 1, "second candidate is a near duplicate");
        assert_eq!(slots.iter().filter(|s| s.is_filled()).count(), 1);
    }

    #[tokio::test]
    async fn least_used_items_are_preferred() {
        let mut slots = planner::expand(&small_plan("os"), 1);
        let mut worn = mc_item(
            "os",
            CognitiveLevel::Remembering,
            Difficulty::Easy,
            "What does a context switch save before yielding the core?",
        );
        worn.usage = vec![crate::model::UsageRecord {
            test_id: Uuid::new_v4(),
            used_at: chrono::Utc::now(),
        }];
        let fresh = mc_item(
            "os",
            CognitiveLevel::Remembering,
            Difficulty::Easy,
            "Which interrupt fires when a time slice expires under preemption?",
        );
        let fresh_id = fresh.id;
        let store = StubStore {
            items: Mutex::new(vec![worn, fresh]),
            fail_for_topic: None,
        };
        let mut registry = GenerationRegistry::new();

        fill(&mut slots, &mut registry, &store, false).await;
        assert_eq!(slots[0].item.as_ref().unwrap().id, fresh_id);
    }

    #[tokio::test]
    async fn unapproved_items_are_excluded_by_default() {
        let mut slots = planner::expand(&small_plan("os"), 1);
        let mut draft = mc_item(
            "os",
            CognitiveLevel::Remembering,
            Difficulty::Easy,
            "Which syscall creates a copy of the calling process?",
        );
        draft.approved = false;
        let store = StubStore {
            items: Mutex::new(vec![draft]),
            fail_for_topic: None,
        };
        let mut registry = GenerationRegistry::new();

        let outcome = fill(&mut slots, &mut registry, &store, false).await;
        assert_eq!(outcome.filled, 0);

        let outcome = fill(&mut slots, &mut registry, &store, true).await;
        assert_eq!(outcome.filled, 1);
    }

    #[tokio::test]
    async fn store_error_marks_group_unfilled_with_warning() {
        let mut slots = planner::expand(&small_plan("os"), 2);
        let store = StubStore {
            items: Mutex::new(vec![]),
            fail_for_topic: Some("os".to_string()),
        };
        let mut registry = GenerationRegistry::new();

        let outcome = fill(&mut slots, &mut registry, &store, false).await;
        assert_eq!(outcome.filled, 0);
        assert!(!outcome.warnings.is_empty());
        assert!(slots.iter().all(|s| !s.is_filled()));
    }

    #[test]
    fn concept_extraction_heuristics() {
        assert_eq!(
            extract_concept("Explain the role of 'virtual memory' in isolation"),
            Some("virtual memory".to_string())
        );
        assert_eq!(
            extract_concept("What is the purpose of the page table in translation?"),
            Some("page table".to_string())
        );
        assert_eq!(
            extract_concept("Compare the Virtual Memory subsystem with segmentation"),
            Some("virtual memory".to_string())
        );
        assert_eq!(extract_concept(""), None);
    }
}
