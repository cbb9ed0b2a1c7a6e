//! End-to-end pipeline tests wiring the real collaborators together:
//! MemoryBank + MockGenerator through the full assembly engine.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use examforge_bank::MemoryBank;
use examforge_core::engine::{AssemblyEngine, EngineConfig, NoopReporter};
use examforge_core::model::{
    CognitiveLevel, CoveragePlan, Difficulty, Item, ItemBody, TopicRequirement,
};
use examforge_providers::mock::MockGenerator;

const SUBJECTS: [&str; 20] = [
    "paging",
    "scheduling",
    "caching",
    "interrupts",
    "pipelining",
    "virtualization",
    "journaling",
    "buffering",
    "swapping",
    "threading",
    "deadlock",
    "semaphores",
    "filesystems",
    "sockets",
    "drivers",
    "signals",
    "allocators",
    "latency",
    "throughput",
    "checkpointing",
];

fn bank_item(topic: &str, n: usize) -> Item {
    let w1 = SUBJECTS[n % SUBJECTS.len()];
    let w2 = SUBJECTS[(n + 7) % SUBJECTS.len()];
    let choices: BTreeMap<String, String> = [
        ("A".to_string(), format!("effect on {w1} only")),
        ("B".to_string(), format!("effect on {w2} only")),
        ("C".to_string(), "both interact".to_string()),
        ("D".to_string(), "neither applies".to_string()),
    ]
    .into();
    Item {
        id: Uuid::new_v4(),
        text: format!("How does {w1} interact with {w2} on a loaded system"),
        topic: topic.to_string(),
        level: CognitiveLevel::Remembering,
        difficulty: Difficulty::Easy,
        body: ItemBody::MultipleChoice {
            choices,
            correct: "C".to_string(),
        },
        embedding: None,
        quality_score: 0.9,
        usage: vec![],
        approved: true,
    }
}

fn plan(topic: &str) -> CoveragePlan {
    CoveragePlan {
        id: "e2e-plan".into(),
        name: "E2E Plan".into(),
        description: String::new(),
        topics: vec![TopicRequirement {
            topic: topic.to_string(),
            hours: 4.0,
            per_level: [(CognitiveLevel::Remembering, 1u32)].into(),
            per_difficulty: [(Difficulty::Easy, 1u32)].into(),
        }],
    }
}

fn config(versions: usize) -> EngineConfig {
    EngineConfig {
        version_count: versions,
        shuffle_seed: Some(2024),
        generation_batch_delay: Duration::ZERO,
        ..Default::default()
    }
}

#[tokio::test]
async fn bank_shortage_covered_by_generation() {
    // 20 items wanted, 5 approved matches in the bank, reachable service.
    let bank = Arc::new(MemoryBank::with_items(
        (0..5).map(|n| bank_item("os", n)).collect(),
    ));
    let generator = Arc::new(MockGenerator::new());
    let engine = AssemblyEngine::new(bank.clone(), Some(generator.clone()), config(1));

    let output = engine
        .assemble(&plan("os"), 20, &NoopReporter)
        .await
        .unwrap();

    assert_eq!(output.report.planned_slots, 20);
    assert_eq!(output.report.filled_slots, 20);
    assert!(output.report.unfilled.is_empty());
    assert_eq!(output.report.bank_count, 5);
    assert_eq!(output.report.generated_count, 15);
    assert!(output.report.warnings.iter().any(|w| w.contains("generated")));
    assert!(generator.call_count() >= 1);

    // Generated items were persisted, unapproved, into the shared bank.
    assert_eq!(bank.len().await, 20);
    let unapproved = bank
        .all_items()
        .await
        .iter()
        .filter(|i| !i.approved)
        .count();
    assert_eq!(unapproved, 15);
}

#[tokio::test]
async fn unreachable_service_returns_partial_result() {
    let bank = Arc::new(MemoryBank::with_items(
        (0..15).map(|n| bank_item("os", n)).collect(),
    ));
    let generator = Arc::new(MockGenerator::failing());
    let engine = AssemblyEngine::new(bank, Some(generator), config(1));

    let output = engine
        .assemble(&plan("os"), 20, &NoopReporter)
        .await
        .unwrap();

    assert_eq!(output.report.unfilled.len(), 5);
    assert_eq!(output.report.generated_count, 0);
    assert!(!output.report.warnings.is_empty());
    // The run still returns the successfully filled slots' forms.
    assert_eq!(output.forms.len(), 1);
    assert_eq!(output.forms[0].items.len(), 15);
}

#[tokio::test]
async fn three_shuffled_forms_stay_self_consistent() {
    let bank = Arc::new(MemoryBank::with_items(
        (0..10).map(|n| bank_item("os", n)).collect(),
    ));
    let engine = AssemblyEngine::new(bank, None, config(3));

    let output = engine
        .assemble(&plan("os"), 9, &NoopReporter)
        .await
        .unwrap();

    assert_eq!(output.forms.len(), 3);
    for form in &output.forms {
        assert_eq!(form.items.len(), 9);
        for (i, fi) in form.items.iter().enumerate() {
            let ItemBody::MultipleChoice { choices, correct } = &fi.item.body else {
                panic!("bank only holds multiple choice");
            };
            assert_eq!(&form.answer_key[&i], correct);
            assert_eq!(choices[correct], "both interact");
        }
    }

    let order = |i: usize| -> Vec<Uuid> {
        output.forms[i].items.iter().map(|fi| fi.item.id).collect()
    };
    assert!(
        order(0) != order(1) || order(0) != order(2),
        "with this seed at least one pair of forms differs in item order"
    );
}

#[tokio::test]
async fn usage_history_lands_in_the_bank() {
    let bank = Arc::new(MemoryBank::with_items(
        (0..5).map(|n| bank_item("os", n)).collect(),
    ));
    let engine = AssemblyEngine::new(bank.clone(), None, config(1));

    let output = engine
        .assemble(&plan("os"), 5, &NoopReporter)
        .await
        .unwrap();

    let items = bank.all_items().await;
    assert!(items.iter().all(|i| i.usage.len() == 1));
    assert!(items.iter().all(|i| i.usage[0].test_id == output.report.id));
}
