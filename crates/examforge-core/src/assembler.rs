//! Version assembly: producing N parallel test forms from filled slots.
//!
//! Each form optionally shuffles item order and, per multiple-choice item,
//! the option → label mapping. The operations run in a fixed sequence —
//! items first, then choices — and the answer key is rebuilt from scratch
//! after both, never patched incrementally, so `answer_key[i]` always
//! matches the correct option of `items[i]`.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::AssemblyError;
use crate::model::{Item, ItemBody};
use crate::planner::Slot;

/// Hard cap on parallel forms; labels run A..E.
pub const MAX_VERSIONS: usize = 5;

/// One positioned item on a form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormItem {
    pub item: Item,
    pub points: u32,
}

/// One shuffled variant of the assembled test. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestForm {
    /// "A".."E".
    pub version_label: String,
    pub items: Vec<FormItem>,
    /// Position (0-based) → answer string.
    pub answer_key: BTreeMap<usize, String>,
    pub total_points: u32,
}

/// Options for version assembly.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub version_count: usize,
    pub shuffle_items: bool,
    pub shuffle_choices: bool,
    /// Fixed seed for reproducible forms; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            version_count: 1,
            shuffle_items: true,
            shuffle_choices: true,
            seed: None,
        }
    }
}

/// Produce `version_count` parallel forms from the filled slots.
///
/// Unfilled slots are ignored here; the caller reports them separately.
pub fn assemble(slots: &[Slot], options: &AssembleOptions) -> Result<Vec<TestForm>, AssemblyError> {
    if options.version_count == 0 || options.version_count > MAX_VERSIONS {
        return Err(AssemblyError::InvalidConfig(format!(
            "version count must be between 1 and {MAX_VERSIONS}, got {}",
            options.version_count
        )));
    }

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::seed_from_u64(rand::thread_rng().gen()),
    };

    let base: Vec<FormItem> = slots
        .iter()
        .filter_map(|slot| {
            slot.item.as_ref().map(|item| FormItem {
                item: item.clone(),
                points: slot.points,
            })
        })
        .collect();

    let mut forms = Vec::with_capacity(options.version_count);
    for version in 0..options.version_count {
        let label = char::from(b'A' + version as u8).to_string();
        let mut items = base.clone();

        if options.shuffle_items {
            items.shuffle(&mut rng);
        }
        if options.shuffle_choices {
            for form_item in &mut items {
                shuffle_choices(&mut form_item.item.body, &mut rng);
            }
        }

        // The key is rebuilt from the final item order, after both shuffles.
        let answer_key = items
            .iter()
            .enumerate()
            .map(|(i, fi)| (i, fi.item.body.answer_label()))
            .collect();
        let total_points = items.iter().map(|fi| fi.points).sum();

        forms.push(TestForm {
            version_label: label,
            items,
            answer_key,
            total_points,
        });
    }

    Ok(forms)
}

/// Shuffle a multiple-choice body's option → label mapping and remap the
/// correct-answer label to the correct option's new position. The
/// underlying correct option never changes, only its visible label.
fn shuffle_choices(body: &mut ItemBody, rng: &mut StdRng) {
    let ItemBody::MultipleChoice { choices, correct } = body else {
        return;
    };
    let Some(correct_text) = choices.get(correct).cloned() else {
        return; // structurally invalid bodies never get this far
    };

    let labels: Vec<String> = choices.keys().cloned().collect();
    let mut texts: Vec<String> = choices.values().cloned().collect();
    texts.shuffle(rng);

    *choices = labels.iter().cloned().zip(texts).collect();
    if let Some((label, _)) = choices.iter().find(|(_, text)| **text == correct_text) {
        *correct = label.clone();
    }
}
