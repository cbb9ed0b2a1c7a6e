//! Generative fallback: synthesizing items for slots the bank cannot fill.
//!
//! Slots are grouped by (topic, level, item type). Each group sends one
//! batched request per attempt to the generative service, carrying an
//! explicit cognitive-fidelity contract: the mental action the student must
//! perform plus the level's forbidden phrasing patterns. Candidates that
//! are structurally broken, phrased like a lower level, or too close to
//! already-accepted text are discarded. A group retries up to a bounded
//! number of attempts with freshly drawn concept/operation intents;
//! whatever remains unfilled is surfaced in the report, never fatal.

use std::collections::BTreeMap;
use std::time::Duration;

use uuid::Uuid;

use crate::error::ServiceError;
use crate::fidelity;
use crate::model::{CognitiveLevel, Item, ItemType};
use crate::planner::{Slot, SlotSource};
use crate::registry::GenerationRegistry;
use crate::similarity::GENERATED_DEDUP_THRESHOLD;
use crate::traits::{DraftItem, GenerationIntent, GenerationRequest, ItemGenerator};

type GroupKey = (String, CognitiveLevel, ItemType);

/// Tuning for the generation loop.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Attempts per slot group before giving up.
    pub max_attempts: u32,
    /// Pause between service calls, for external rate limits.
    pub batch_delay: Duration,
    /// Quality score stamped onto accepted generated items.
    pub generated_quality: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            batch_delay: Duration::from_millis(500),
            generated_quality: 0.5,
        }
    }
}

/// Result of a generation pass.
#[derive(Debug, Default)]
pub struct GenerationOutcome {
    /// Slots filled by generation.
    pub filled: usize,
    /// Accepted new items, for insertion into the bank (unapproved).
    pub generated: Vec<Item>,
    pub warnings: Vec<String>,
}

/// Fill remaining unfilled slots through the generative service.
///
/// Batches run sequentially, not concurrently: every batch mutates the
/// registry and must observe earlier batches' concept/operation consumption
/// to avoid duplicate intents.
pub async fn fill(
    slots: &mut [Slot],
    registry: &mut GenerationRegistry,
    service: &dyn ItemGenerator,
    config: &GeneratorConfig,
) -> GenerationOutcome {
    let mut groups: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
    for (i, slot) in slots.iter().enumerate() {
        if !slot.is_filled() {
            let key = (slot.topic.clone(), slot.level, slot.item_type);
            groups.entry(key).or_default().push(i);
        }
    }

    let mut outcome = GenerationOutcome::default();
    let mut first_call = true;

    'groups: for ((topic, level, item_type), slot_indices) in groups {
        let mut pending: Vec<usize> = slot_indices;
        let mut attempt = 0u32;

        while !pending.is_empty() && attempt < config.max_attempts {
            attempt += 1;
            if !first_call {
                tokio::time::sleep(config.batch_delay).await;
            }
            first_call = false;

            let request = build_request(&topic, level, item_type, &pending, slots, registry);
            let candidates = match service.generate(&request).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::warn!(
                        %topic, %level, attempt,
                        "generation request failed: {e:#}"
                    );
                    let permanent = e
                        .downcast_ref::<ServiceError>()
                        .is_some_and(ServiceError::is_permanent);
                    if permanent {
                        outcome.warnings.push(format!(
                            "generative service rejected credentials; abandoning generation ({e})"
                        ));
                        report_shortage(&mut outcome, &topic, level, item_type, pending.len());
                        // Skip remaining groups too: they would hit the same wall.
                        for ((t, l, ty), idxs) in groups_after(slots, &topic, level, item_type) {
                            report_shortage(&mut outcome, &t, l, ty, idxs);
                        }
                        break 'groups;
                    }
                    continue;
                }
            };

            if candidates.is_empty() {
                // Zero progress with nothing to validate: retrying with the
                // same service state will not improve, exit early.
                break;
            }

            let accepted =
                consume_candidates(candidates, &mut pending, slots, registry, config, level);
            outcome.filled += accepted.len();
            outcome.generated.extend(accepted);
        }

        if !pending.is_empty() {
            report_shortage(&mut outcome, &topic, level, item_type, pending.len());
        }
    }

    outcome
}

fn report_shortage(
    outcome: &mut GenerationOutcome,
    topic: &str,
    level: CognitiveLevel,
    item_type: ItemType,
    count: usize,
) {
    outcome.warnings.push(format!(
        "could not generate {count} {item_type} item(s) for {topic}/{level}"
    ));
}

/// Pending counts for the groups ordered after the current one, used when a
/// permanent service error abandons the whole generation stage.
fn groups_after(
    slots: &[Slot],
    topic: &str,
    level: CognitiveLevel,
    item_type: ItemType,
) -> Vec<((String, CognitiveLevel, ItemType), usize)> {
    let current = (topic.to_string(), level, item_type);
    let mut groups: BTreeMap<GroupKey, usize> = BTreeMap::new();
    for slot in slots.iter().filter(|s| !s.is_filled()) {
        let key = (slot.topic.clone(), slot.level, slot.item_type);
        if key > current {
            *groups.entry(key).or_default() += 1;
        }
    }
    groups.into_iter().collect()
}

fn build_request(
    topic: &str,
    level: CognitiveLevel,
    item_type: ItemType,
    pending: &[usize],
    slots: &[Slot],
    registry: &mut GenerationRegistry,
) -> GenerationRequest {
    let rules = fidelity::rules_for(level);
    let intents = pending
        .iter()
        .map(|&i| {
            let slot = &slots[i];
            let concept = registry.next_concept(topic);
            let mut operation = registry.next_operation(topic, level);
            // Avoid re-issuing a combination a rejected attempt already used.
            for _ in 0..rules.operations.len() {
                if registry.mark_pair(topic, &concept, &operation) {
                    break;
                }
                operation = registry.next_operation(topic, level);
            }
            GenerationIntent {
                concept,
                operation,
                answer_hint: rules.answer_hint.to_string(),
                difficulty: slot.difficulty,
                points: slot.points,
            }
        })
        .collect();

    GenerationRequest {
        topic: topic.to_string(),
        level,
        item_type,
        intents,
        action_contract: rules.action_contract.to_string(),
        forbidden_patterns: rules
            .forbidden_patterns
            .iter()
            .map(|p| p.to_string())
            .collect(),
    }
}

fn consume_candidates(
    candidates: Vec<DraftItem>,
    pending: &mut Vec<usize>,
    slots: &mut [Slot],
    registry: &mut GenerationRegistry,
    config: &GeneratorConfig,
    level: CognitiveLevel,
) -> Vec<Item> {
    let mut accepted = Vec::new();

    for draft in candidates {
        if pending.is_empty() {
            break;
        }
        let slot_index = pending[0];
        let (topic, difficulty, wanted_type) = {
            let slot = &slots[slot_index];
            (slot.topic.clone(), slot.difficulty, slot.item_type)
        };

        if let Err(reason) = validate_candidate(&draft, wanted_type, level, registry) {
            tracing::debug!(%topic, %level, "rejected candidate: {reason}");
            continue;
        }

        let item = Item {
            id: Uuid::new_v4(),
            text: draft.text,
            topic: topic.clone(),
            level,
            difficulty,
            body: draft.body,
            embedding: None,
            quality_score: config.generated_quality,
            usage: vec![],
            approved: false,
        };
        registry.register(&topic, &item, draft.concept);
        slots[slot_index].fill(item.clone(), SlotSource::Generated);
        pending.remove(0);
        accepted.push(item);
    }

    accepted
}

/// Structural and cognitive-fidelity validation of one candidate.
fn validate_candidate(
    draft: &DraftItem,
    wanted_type: ItemType,
    level: CognitiveLevel,
    registry: &GenerationRegistry,
) -> Result<(), String> {
    if draft.text.trim().is_empty() {
        return Err("empty stem".to_string());
    }
    if draft.body.item_type() != wanted_type {
        return Err(format!(
            "wrong item type: wanted {wanted_type}, got {}",
            draft.body.item_type()
        ));
    }
    draft.body.validate()?;

    // A generated item is rejected on cognitive-fidelity grounds even when
    // otherwise well-formed: the label alone does not make an analysis item.
    if let Some(pattern) = fidelity::violated_pattern(level, &draft.text) {
        return Err(format!("stem violates level phrasing rule '{pattern}'"));
    }
    if let Some(answer) = draft.body.answer_text() {
        if let Some(pattern) = fidelity::violated_pattern(level, answer) {
            return Err(format!("answer violates level phrasing rule '{pattern}'"));
        }
    }

    if registry.is_near_duplicate(&draft.text, None, GENERATED_DEDUP_THRESHOLD) {
        return Err("near duplicate of an accepted item".to_string());
    }
    Ok(())
}
