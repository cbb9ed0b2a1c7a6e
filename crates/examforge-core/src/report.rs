//! Assembly report types with JSON persistence.
//!
//! The report is the caller-visible summary of a run: every planned slot is
//! accounted for as filled (bank or generated) or itemized as a shortage.
//! Silent under-delivery is never acceptable.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{CognitiveLevel, Difficulty, ItemType};
use crate::planner::Slot;

/// An unfilled slot, as reported to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotShortage {
    pub slot_id: u32,
    pub topic: String,
    pub level: CognitiveLevel,
    pub difficulty: Difficulty,
    pub item_type: ItemType,
}

impl From<&Slot> for SlotShortage {
    fn from(slot: &Slot) -> Self {
        Self {
            slot_id: slot.id,
            topic: slot.topic.clone(),
            level: slot.level,
            difficulty: slot.difficulty,
            item_type: slot.item_type,
        }
    }
}

/// The caller-visible summary of one assembly run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyReport {
    /// Run identifier; doubles as the test id on usage records.
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub plan_id: String,
    pub planned_slots: usize,
    pub filled_slots: usize,
    /// Slots filled from the existing bank.
    pub bank_count: usize,
    /// Slots filled by the generative fallback.
    pub generated_count: usize,
    pub unfilled: Vec<SlotShortage>,
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}

impl AssemblyReport {
    /// Whether every planned slot was filled.
    pub fn is_complete(&self) -> bool {
        self.unfilled.is_empty()
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: AssemblyReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Format the shortage summary as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Summary:** {}/{} slots filled ({} from bank, {} generated)\n\n",
            self.filled_slots, self.planned_slots, self.bank_count, self.generated_count
        ));

        if !self.unfilled.is_empty() {
            md.push_str("### Unfilled slots\n\n");
            md.push_str("| Slot | Topic | Level | Difficulty | Type |\n");
            md.push_str("|------|-------|-------|------------|------|\n");
            for s in &self.unfilled {
                md.push_str(&format!(
                    "| {} | {} | {} | {} | {} |\n",
                    s.slot_id, s.topic, s.level, s.difficulty, s.item_type
                ));
            }
            md.push('\n');
        }

        if !self.warnings.is_empty() {
            md.push_str("### Warnings\n\n");
            for w in &self.warnings {
                md.push_str(&format!("- {w}\n"));
            }
        }

        md
    }
}
