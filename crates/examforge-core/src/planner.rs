//! Slot planning: expanding a coverage plan into discrete requirement slots.
//!
//! Topic totals are apportioned from instructional hours, then distributed
//! across difficulty bands and cognitive levels with largest-remainder
//! correction so counts sum exactly. Item-type quotas (essay cap, one
//! secondary family per run) are applied in two passes: natural-affinity
//! assignment first, then conversion of remaining multiple-choice slots
//! until quotas are exactly met. Output ordering is stable (topic, then
//! level, then difficulty) so the rest of the pipeline is deterministic.

use serde::{Deserialize, Serialize};

use crate::model::{CognitiveLevel, CoveragePlan, Difficulty, Item, ItemType, KnowledgeDimension};

/// Essays only appear at or above this many total items.
pub const ESSAY_MIN_TOTAL_ITEMS: u32 = 20;

/// Which component filled a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotSource {
    Bank,
    Generated,
}

/// One discrete, typed requirement awaiting an item.
///
/// Created in bulk by `expand`; filled exactly once by either the bank
/// selector or the fallback generator; never deleted, only reported as
/// unfilled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: u32,
    pub topic: String,
    pub level: CognitiveLevel,
    pub knowledge_dimension: KnowledgeDimension,
    pub difficulty: Difficulty,
    pub item_type: ItemType,
    pub points: u32,
    #[serde(default)]
    pub item: Option<Item>,
    #[serde(default)]
    pub source: Option<SlotSource>,
}

impl Slot {
    pub fn is_filled(&self) -> bool {
        self.item.is_some()
    }

    /// Fill the slot. Slots are filled at most once; a second fill is a
    /// pipeline bug.
    pub fn fill(&mut self, item: Item, source: SlotSource) {
        debug_assert!(self.item.is_none(), "slot {} filled twice", self.id);
        self.item = Some(item);
        self.source = Some(source);
    }
}

/// Largest-remainder apportionment of `total` across `weights`.
///
/// Floors the exact shares, then hands remaining units to the entries with
/// the largest fractional parts; ties resolve to the earlier entry, so the
/// remainder lands in the earliest equally-deserving bucket.
fn largest_remainder(total: u32, weights: &[f64]) -> Vec<u32> {
    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 || total == 0 {
        return vec![0; weights.len()];
    }

    let exact: Vec<f64> = weights
        .iter()
        .map(|w| f64::from(total) * w / sum)
        .collect();
    let mut counts: Vec<u32> = exact.iter().map(|e| e.floor() as u32).collect();
    let assigned: u32 = counts.iter().sum();

    let mut order: Vec<usize> = (0..weights.len()).collect();
    // Stable sort: equal fractional parts keep index order.
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal)
    });

    for &i in order.iter().take((total - assigned) as usize) {
        counts[i] += 1;
    }
    counts
}

/// Expand `counts[i]` copies of `values[i]` into a flat ordered list.
fn repeat_each<T: Copy>(values: &[T], counts: &[u32]) -> Vec<T> {
    values
        .iter()
        .zip(counts)
        .flat_map(|(v, n)| std::iter::repeat(*v).take(*n as usize))
        .collect()
}

/// Expand a coverage plan into an ordered list of requirement slots.
///
/// Zero-hour topics produce zero slots. A total too small to support any
/// essay yields a zero essay quota, not an error.
pub fn expand(plan: &CoveragePlan, total_items: u32) -> Vec<Slot> {
    let hours: Vec<f64> = plan.topics.iter().map(|t| t.hours.max(0.0)).collect();
    let topic_totals = largest_remainder(total_items, &hours);

    let mut slots = Vec::with_capacity(total_items as usize);
    for (topic, &topic_total) in plan.topics.iter().zip(&topic_totals) {
        if topic_total == 0 {
            continue;
        }

        let difficulty_weights: Vec<f64> = Difficulty::ALL
            .iter()
            .map(|d| f64::from(topic.per_difficulty.get(d).copied().unwrap_or(0)))
            .collect();
        let difficulty_weights = if difficulty_weights.iter().sum::<f64>() > 0.0 {
            difficulty_weights
        } else {
            vec![1.0; Difficulty::ALL.len()]
        };
        let band_counts = largest_remainder(topic_total, &difficulty_weights);

        let level_weights: Vec<f64> = CognitiveLevel::ALL
            .iter()
            .map(|l| f64::from(topic.per_level.get(l).copied().unwrap_or(0)))
            .collect();
        let level_weights = if level_weights.iter().sum::<f64>() > 0.0 {
            level_weights
        } else {
            vec![1.0; CognitiveLevel::ALL.len()]
        };
        let level_counts = largest_remainder(topic_total, &level_weights);

        // Both sequences are sorted by their natural order; pairing them
        // index-wise keeps lower levels with easier bands, which is the
        // pairing the type-affinity pass expects.
        let levels = repeat_each(&CognitiveLevel::ALL, &level_counts);
        let difficulties = repeat_each(&Difficulty::ALL, &band_counts);

        for (level, difficulty) in levels.into_iter().zip(difficulties) {
            slots.push(Slot {
                id: 0, // assigned after type quotas
                topic: topic.topic.clone(),
                level,
                knowledge_dimension: level.knowledge_dimension(),
                difficulty,
                item_type: ItemType::MultipleChoice,
                points: ItemType::MultipleChoice.points(),
                item: None,
                source: None,
            });
        }
    }

    apply_type_quotas(&mut slots);

    for (i, slot) in slots.iter_mut().enumerate() {
        slot.id = i as u32;
        slot.points = slot.item_type.points();
    }
    slots
}

/// Essay quota for a run of `n` items: none below the minimum threshold, at
/// most one per ~50 items, never more than two.
fn essay_quota(n: usize) -> usize {
    if (n as u32) < ESSAY_MIN_TOTAL_ITEMS {
        0
    } else {
        (n / 50).clamp(1, 2)
    }
}

/// The secondary item-type family, chosen once per run: binary items when
/// the run leans lower-order, short answers otherwise.
fn secondary_family(slots: &[Slot]) -> ItemType {
    let lower = slots.iter().filter(|s| s.level.is_lower_order()).count();
    if lower * 2 >= slots.len() {
        ItemType::TrueFalse
    } else {
        ItemType::ShortAnswer
    }
}

fn has_affinity(item_type: ItemType, slot: &Slot) -> bool {
    match item_type {
        ItemType::Essay => slot.level.is_higher_order() && slot.difficulty == Difficulty::Hard,
        ItemType::TrueFalse => slot.level.is_lower_order() && slot.difficulty == Difficulty::Easy,
        ItemType::ShortAnswer => matches!(
            slot.level,
            CognitiveLevel::Understanding | CognitiveLevel::Applying
        ),
        ItemType::MultipleChoice => true,
    }
}

/// Convert up to `quota` multiple-choice slots to `item_type`: first the
/// slots with natural affinity, then any remaining multiple-choice slots in
/// stable order until the quota is exactly met.
fn assign_quota(slots: &mut [Slot], item_type: ItemType, quota: usize) {
    let mut remaining = quota;

    for slot in slots.iter_mut() {
        if remaining == 0 {
            return;
        }
        if slot.item_type == ItemType::MultipleChoice && has_affinity(item_type, slot) {
            slot.item_type = item_type;
            remaining -= 1;
        }
    }

    for slot in slots.iter_mut() {
        if remaining == 0 {
            return;
        }
        if slot.item_type == ItemType::MultipleChoice {
            slot.item_type = item_type;
            remaining -= 1;
        }
    }
}

fn apply_type_quotas(slots: &mut [Slot]) {
    if slots.is_empty() {
        return;
    }
    let n = slots.len();

    assign_quota(slots, ItemType::Essay, essay_quota(n));

    let secondary = secondary_family(slots);
    let secondary_quota = n / 10;
    assign_quota(slots, secondary, secondary_quota);
}
