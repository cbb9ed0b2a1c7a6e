//! In-memory item bank.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use examforge_core::model::{Item, UsageRecord};
use examforge_core::traits::{ItemQuery, ItemStore};

/// An in-memory item bank.
///
/// Interior mutability lets the selector's concurrent group queries share
/// one bank; writes (inserts, usage records) take the write lock briefly.
#[derive(Debug, Default)]
pub struct MemoryBank {
    items: RwLock<Vec<Item>>,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<Item>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Snapshot of all items, for export.
    pub async fn all_items(&self) -> Vec<Item> {
        self.items.read().await.clone()
    }
}

/// Sort matching items least-used first, breaking ties toward the older
/// last use and then the higher quality score.
pub(crate) fn sort_least_used(items: &mut [Item]) {
    items.sort_by(|a, b| {
        a.usage_count()
            .cmp(&b.usage_count())
            .then_with(|| a.last_used_at().cmp(&b.last_used_at()))
            .then_with(|| {
                b.quality_score
                    .partial_cmp(&a.quality_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
}

#[async_trait]
impl ItemStore for MemoryBank {
    async fn search(&self, query: &ItemQuery) -> anyhow::Result<Vec<Item>> {
        let items = self.items.read().await;
        let mut matches: Vec<Item> = items
            .iter()
            .filter(|i| {
                i.topic == query.topic
                    && i.level == query.level
                    && i.difficulty == query.difficulty
                    && i.item_type() == query.item_type
                    && (!query.approved_only || i.approved)
            })
            .cloned()
            .collect();
        sort_least_used(&mut matches);
        Ok(matches)
    }

    async fn insert_many(&self, mut new_items: Vec<Item>) -> anyhow::Result<Vec<Item>> {
        for item in &mut new_items {
            if item.id.is_nil() {
                item.id = Uuid::new_v4();
            }
        }
        self.items.write().await.extend(new_items.clone());
        Ok(new_items)
    }

    async fn record_usage(&self, item_ids: &[Uuid], test_id: Uuid) -> anyhow::Result<()> {
        let now = Utc::now();
        let mut items = self.items.write().await;
        for item in items.iter_mut() {
            if item_ids.contains(&item.id) {
                item.usage.push(UsageRecord {
                    test_id,
                    used_at: now,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use examforge_core::model::{CognitiveLevel, Difficulty, ItemBody};

    fn item(text: &str, approved: bool) -> Item {
        Item {
            id: Uuid::new_v4(),
            text: text.to_string(),
            topic: "algebra".to_string(),
            level: CognitiveLevel::Applying,
            difficulty: Difficulty::Medium,
            body: ItemBody::ShortAnswer {
                model_answer: "x = 4".to_string(),
            },
            embedding: None,
            quality_score: 0.5,
            usage: vec![],
            approved,
        }
    }

    fn query(approved_only: bool) -> ItemQuery {
        ItemQuery {
            topic: "algebra".to_string(),
            level: CognitiveLevel::Applying,
            difficulty: Difficulty::Medium,
            item_type: examforge_core::model::ItemType::ShortAnswer,
            approved_only,
        }
    }

    #[tokio::test]
    async fn search_filters_on_all_axes() {
        let mut off_topic = item("Solve for y in the system", true);
        off_topic.topic = "geometry".to_string();
        let bank = MemoryBank::with_items(vec![item("Solve 2x + 1 = 9 for x", true), off_topic]);

        let found = bank.search(&query(true)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].text.starts_with("Solve 2x"));
    }

    #[tokio::test]
    async fn approved_only_excludes_drafts() {
        let bank = MemoryBank::with_items(vec![
            item("Solve 2x + 1 = 9 for x", true),
            item("Factor the quadratic expression fully", false),
        ]);

        assert_eq!(bank.search(&query(true)).await.unwrap().len(), 1);
        assert_eq!(bank.search(&query(false)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn search_orders_least_used_first() {
        let mut used = item("Apply the distributive law to expand", true);
        used.usage.push(UsageRecord {
            test_id: Uuid::new_v4(),
            used_at: Utc::now(),
        });
        let fresh = item("Compute the remainder of the division", true);
        let fresh_id = fresh.id;
        let bank = MemoryBank::with_items(vec![used, fresh]);

        let found = bank.search(&query(true)).await.unwrap();
        assert_eq!(found[0].id, fresh_id);
    }

    #[tokio::test]
    async fn insert_assigns_ids_to_nil() {
        let bank = MemoryBank::new();
        let mut draft = item("Evaluate the expression at x = 2", false);
        draft.id = Uuid::nil();

        let inserted = bank.insert_many(vec![draft]).await.unwrap();
        assert!(!inserted[0].id.is_nil());
        assert_eq!(bank.len().await, 1);
    }

    #[tokio::test]
    async fn record_usage_appends_history() {
        let a = item("Solve 2x + 1 = 9 for x", true);
        let a_id = a.id;
        let b = item("Factor the quadratic expression fully", true);
        let bank = MemoryBank::with_items(vec![a, b]);

        let test_id = Uuid::new_v4();
        bank.record_usage(&[a_id], test_id).await.unwrap();

        let items = bank.all_items().await;
        let a = items.iter().find(|i| i.id == a_id).unwrap();
        assert_eq!(a.usage.len(), 1);
        assert_eq!(a.usage[0].test_id, test_id);
        assert!(items.iter().filter(|i| i.id != a_id).all(|i| i.usage.is_empty()));
    }
}
