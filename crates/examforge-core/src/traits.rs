//! Collaborator trait definitions.
//!
//! These async traits are the engine's only view of the outside world: the
//! item bank, the generative text service, and the optional embedding
//! service. Implemented by the `examforge-bank` and `examforge-providers`
//! crates respectively.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{CognitiveLevel, Difficulty, Item, ItemBody, ItemType};

// ---------------------------------------------------------------------------
// Item store trait
// ---------------------------------------------------------------------------

/// One slot group's retrieval query against the item bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemQuery {
    pub topic: String,
    pub level: CognitiveLevel,
    pub difficulty: Difficulty,
    pub item_type: ItemType,
    /// When set, unapproved (e.g. freshly generated) items are excluded.
    pub approved_only: bool,
}

/// Trait for item-bank backends.
///
/// `search` results are expected in ascending usage-count order (least-used
/// items first); the selector re-sorts defensively but well-behaved stores
/// should not rely on that.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Items matching the query, least-used first.
    async fn search(&self, query: &ItemQuery) -> anyhow::Result<Vec<Item>>;

    /// Persist new items (e.g. generated ones), returning them with ids.
    async fn insert_many(&self, items: Vec<Item>) -> anyhow::Result<Vec<Item>>;

    /// Append a usage record to each listed item.
    async fn record_usage(&self, item_ids: &[Uuid], test_id: Uuid) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Generative text service trait
// ---------------------------------------------------------------------------

/// What one generated item must contain, derived from the registry's
/// rotation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationIntent {
    /// Concept angle the item must address.
    pub concept: String,
    /// Cognitive-operation verb the stem must be built around.
    pub operation: String,
    /// Expected answer shape, from the level's rule table.
    pub answer_hint: String,
    pub difficulty: Difficulty,
    pub points: u32,
}

/// A batched request to the generative text service: one topic, one
/// cognitive level, one item type, one intent per pending slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    pub level: CognitiveLevel,
    pub item_type: ItemType,
    pub intents: Vec<GenerationIntent>,
    /// The mental action the student must perform, stated verbatim to the
    /// service as part of the cognitive-fidelity contract.
    pub action_contract: String,
    /// Phrasing the service must not produce at this level.
    #[serde(default)]
    pub forbidden_patterns: Vec<String>,
}

/// An unvalidated candidate returned by the generative service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftItem {
    /// The question stem.
    pub text: String,
    pub body: ItemBody,
    /// Which intent concept the service claims to have addressed.
    #[serde(default)]
    pub concept: Option<String>,
    #[serde(default)]
    pub operation: Option<String>,
}

/// Trait for generative text backends that synthesize items.
#[async_trait]
pub trait ItemGenerator: Send + Sync {
    /// Human-readable service name (e.g. "anthropic").
    fn name(&self) -> &str;

    /// Generate candidate items for a batch of intents. A wholesale failure
    /// (network, quota) is an error; the caller treats it as zero
    /// candidates for the batch, not a fatal condition.
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<Vec<DraftItem>>;
}

// ---------------------------------------------------------------------------
// Embedding service trait
// ---------------------------------------------------------------------------

/// Optional embedding backend. When absent, the similarity engine uses its
/// lexical fallback exclusively.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}
