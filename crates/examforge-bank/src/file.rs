//! JSON-file-backed item bank.
//!
//! The bank file is a JSON array of items. The whole file is loaded at
//! construction and written back on every mutation; banks of a few
//! thousand items stay comfortably inside that model.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use examforge_core::model::{Item, UsageRecord};
use examforge_core::traits::{ItemQuery, ItemStore};

use crate::memory::sort_least_used;

/// A JSON-file-backed item bank.
pub struct FileBank {
    path: PathBuf,
    items: RwLock<Vec<Item>>,
}

impl FileBank {
    /// Open an existing bank file, or start an empty bank if the file does
    /// not exist yet.
    pub fn open(path: &Path) -> Result<Self> {
        let items = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read bank file {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse bank file {}", path.display()))?
        } else {
            Vec::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            items: RwLock::new(items),
        })
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    fn write_back(&self, items: &[Item]) -> Result<()> {
        let json = serde_json::to_string_pretty(items).context("failed to serialize bank")?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write bank file {}", self.path.display()))?;
        tracing::debug!(count = items.len(), "bank file written");
        Ok(())
    }
}

#[async_trait]
impl ItemStore for FileBank {
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
        let mut items = self.items.write().await;
        items.extend(new_items.clone());
        self.write_back(&items)?;
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
        self.write_back(&items)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use examforge_core::model::{CognitiveLevel, Difficulty, ItemBody, ItemType};

    fn item(text: &str) -> Item {
        Item {
            id: Uuid::new_v4(),
            text: text.to_string(),
            topic: "history".to_string(),
            level: CognitiveLevel::Remembering,
            difficulty: Difficulty::Easy,
            body: ItemBody::TrueFalse { answer: true },
            embedding: None,
            quality_score: 0.5,
            usage: vec![],
            approved: true,
        }
    }

    fn query() -> ItemQuery {
        ItemQuery {
            topic: "history".to_string(),
            level: CognitiveLevel::Remembering,
            difficulty: Difficulty::Easy,
            item_type: ItemType::TrueFalse,
            approved_only: true,
        }
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let bank = FileBank::open(&dir.path().join("bank.json")).unwrap();
        assert!(bank.is_empty().await);
    }

    #[tokio::test]
    async fn inserts_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank.json");

        let bank = FileBank::open(&path).unwrap();
        bank.insert_many(vec![item("The treaty was signed in spring")])
            .await
            .unwrap();

        let reopened = FileBank::open(&path).unwrap();
        assert_eq!(reopened.len().await, 1);
        let found = reopened.search(&query()).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn usage_records_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank.json");

        let bank = FileBank::open(&path).unwrap();
        let inserted = bank
            .insert_many(vec![item("The treaty was signed in spring")])
            .await
            .unwrap();
        let test_id = Uuid::new_v4();
        bank.record_usage(&[inserted[0].id], test_id).await.unwrap();

        let reopened = FileBank::open(&path).unwrap();
        let found = reopened.search(&query()).await.unwrap();
        assert_eq!(found[0].usage.len(), 1);
        assert_eq!(found[0].usage[0].test_id, test_id);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank.json");
        std::fs::write(&path, "not json at all").unwrap();
        assert!(FileBank::open(&path).is_err());
    }
}
