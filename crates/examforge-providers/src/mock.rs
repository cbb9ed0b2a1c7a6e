//! Mock generator for testing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use examforge_core::model::{ItemBody, ItemType};
use examforge_core::traits::{DraftItem, GenerationRequest, ItemGenerator};

/// A mock generative service for testing the assembly engine without real
/// API calls.
///
/// Synthesizes one distinct, intent-respecting draft per requested intent,
/// or fails every call when constructed with `failing()`.
pub struct MockGenerator {
    fail: bool,
    call_count: AtomicU32,
    serial: AtomicU32,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            fail: false,
            call_count: AtomicU32::new(0),
            serial: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// A mock that refuses every request, for shortage-path tests.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Number of generate calls made.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// The last request received.
    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ItemGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<Vec<DraftItem>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap() = Some(request.clone());

        if self.fail {
            anyhow::bail!("mock generator configured to fail");
        }

        // Distinct scenario words keep synthesized stems apart so the
        // engine's near-duplicate check exercises realistic variety.
        const SCENARIOS: [&str; 12] = [
            "amber", "cobalt", "crimson", "indigo", "jade", "magenta", "ochre", "sable",
            "teal", "umber", "violet", "zinc",
        ];

        let drafts = request
            .intents
            .iter()
            .map(|intent| {
                let n = self.serial.fetch_add(1, Ordering::Relaxed);
                let scenario = SCENARIOS[n as usize % SCENARIOS.len()];
                let stem = format!(
                    "In {}, {} the {} for the {scenario} deployment case {n}",
                    request.topic, intent.operation, intent.concept
                );
                let body = match request.item_type {
                    ItemType::MultipleChoice => {
                        let choices: BTreeMap<String, String> = [
                            ("A".to_string(), format!("plausible distractor red {n}")),
                            ("B".to_string(), format!("plausible distractor blue {n}")),
                            ("C".to_string(), format!("credited response green {n}")),
                            ("D".to_string(), format!("plausible distractor grey {n}")),
                        ]
                        .into();
                        ItemBody::MultipleChoice {
                            choices,
                            correct: "C".to_string(),
                        }
                    }
                    ItemType::TrueFalse => ItemBody::TrueFalse { answer: n % 2 == 0 },
                    ItemType::ShortAnswer => ItemBody::ShortAnswer {
                        model_answer: format!(
                            "A worked response contrasting both mechanisms, variant {n}"
                        ),
                    },
                    ItemType::Essay => ItemBody::Essay {
                        rubric: format!(
                            "Full credit requires a defended position with two criteria, variant {n}"
                        ),
                    },
                };
                DraftItem {
                    text: stem,
                    body,
                    concept: Some(intent.concept.clone()),
                    operation: Some(intent.operation.clone()),
                }
            })
            .collect();
        Ok(drafts)
    }
}
