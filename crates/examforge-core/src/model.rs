//! Core data model types for examforge.
//!
//! These are the fundamental types that the entire examforge system uses
//! to represent items, coverage plans, and the cognitive taxonomy.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordered taxonomy of mental operations, lowest to highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CognitiveLevel {
    Remembering,
    Understanding,
    Applying,
    Analyzing,
    Evaluating,
    Creating,
}

impl CognitiveLevel {
    /// All levels in taxonomy order.
    pub const ALL: [CognitiveLevel; 6] = [
        CognitiveLevel::Remembering,
        CognitiveLevel::Understanding,
        CognitiveLevel::Applying,
        CognitiveLevel::Analyzing,
        CognitiveLevel::Evaluating,
        CognitiveLevel::Creating,
    ];

    /// The knowledge dimension is a fixed lookup from the level, never
    /// independently settable.
    pub fn knowledge_dimension(self) -> KnowledgeDimension {
        match self {
            CognitiveLevel::Remembering => KnowledgeDimension::Factual,
            CognitiveLevel::Understanding => KnowledgeDimension::Conceptual,
            CognitiveLevel::Applying => KnowledgeDimension::Procedural,
            CognitiveLevel::Analyzing => KnowledgeDimension::Conceptual,
            CognitiveLevel::Evaluating => KnowledgeDimension::Metacognitive,
            CognitiveLevel::Creating => KnowledgeDimension::Metacognitive,
        }
    }

    /// Levels whose content must go beyond recall and restatement.
    pub fn is_higher_order(self) -> bool {
        self >= CognitiveLevel::Analyzing
    }

    /// Remembering and Understanding.
    pub fn is_lower_order(self) -> bool {
        self <= CognitiveLevel::Understanding
    }
}

impl fmt::Display for CognitiveLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CognitiveLevel::Remembering => "remembering",
            CognitiveLevel::Understanding => "understanding",
            CognitiveLevel::Applying => "applying",
            CognitiveLevel::Analyzing => "analyzing",
            CognitiveLevel::Evaluating => "evaluating",
            CognitiveLevel::Creating => "creating",
        };
        write!(f, "{s}")
    }
}

impl FromStr for CognitiveLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "remembering" | "recall" => Ok(CognitiveLevel::Remembering),
            "understanding" | "comprehension" => Ok(CognitiveLevel::Understanding),
            "applying" | "application" => Ok(CognitiveLevel::Applying),
            "analyzing" | "analysis" => Ok(CognitiveLevel::Analyzing),
            "evaluating" | "evaluation" => Ok(CognitiveLevel::Evaluating),
            "creating" | "creation" | "synthesis" => Ok(CognitiveLevel::Creating),
            other => Err(format!("unknown cognitive level: {other}")),
        }
    }
}

/// Classification of content type, derived from the cognitive level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeDimension {
    Factual,
    Conceptual,
    Procedural,
    Metacognitive,
}

impl fmt::Display for KnowledgeDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KnowledgeDimension::Factual => "factual",
            KnowledgeDimension::Conceptual => "conceptual",
            KnowledgeDimension::Procedural => "procedural",
            KnowledgeDimension::Metacognitive => "metacognitive",
        };
        write!(f, "{s}")
    }
}

/// Difficulty bands, easiest first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// All bands, easiest first.
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" | "moderate" => Ok(Difficulty::Medium),
            "hard" | "difficult" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// Supported item types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    Essay,
}

impl ItemType {
    /// Fixed point value per item type.
    pub fn points(self) -> u32 {
        match self {
            ItemType::MultipleChoice => 2,
            ItemType::TrueFalse => 1,
            ItemType::ShortAnswer => 4,
            ItemType::Essay => 10,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemType::MultipleChoice => "multiple_choice",
            ItemType::TrueFalse => "true_false",
            ItemType::ShortAnswer => "short_answer",
            ItemType::Essay => "essay",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "multiple_choice" | "mc" => Ok(ItemType::MultipleChoice),
            "true_false" | "tf" | "binary" => Ok(ItemType::TrueFalse),
            "short_answer" | "sa" => Ok(ItemType::ShortAnswer),
            "essay" | "long_form" => Ok(ItemType::Essay),
            other => Err(format!("unknown item type: {other}")),
        }
    }
}

/// The type-specific payload of an item.
///
/// Modeled as a tagged variant rather than one struct with optional fields
/// so that per-type structural validation is exhaustive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemBody {
    MultipleChoice {
        /// Label → option text, labels in display order.
        choices: BTreeMap<String, String>,
        /// Label of the correct option.
        correct: String,
    },
    TrueFalse {
        answer: bool,
    },
    ShortAnswer {
        model_answer: String,
    },
    Essay {
        rubric: String,
    },
}

impl ItemBody {
    pub fn item_type(&self) -> ItemType {
        match self {
            ItemBody::MultipleChoice { .. } => ItemType::MultipleChoice,
            ItemBody::TrueFalse { .. } => ItemType::TrueFalse,
            ItemBody::ShortAnswer { .. } => ItemType::ShortAnswer,
            ItemBody::Essay { .. } => ItemType::Essay,
        }
    }

    /// Structural validation: a complete option set with a valid correct
    /// label for multiple choice, a non-empty model answer or rubric for
    /// the constructed-response types.
    ///
    /// Duplicate option texts are rejected because the assembler remaps the
    /// correct label by option text after a choice shuffle.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ItemBody::MultipleChoice { choices, correct } => {
                if choices.len() < 2 {
                    return Err(format!("needs at least 2 choices, has {}", choices.len()));
                }
                if !choices.contains_key(correct) {
                    return Err(format!("correct label '{correct}' is not a choice"));
                }
                let mut seen = Vec::with_capacity(choices.len());
                for (label, text) in choices {
                    if label.trim().is_empty() {
                        return Err("empty choice label".to_string());
                    }
                    let norm = text.trim().to_lowercase();
                    if norm.is_empty() {
                        return Err(format!("choice '{label}' has empty text"));
                    }
                    if seen.contains(&norm) {
                        return Err(format!("duplicate option text for choice '{label}'"));
                    }
                    seen.push(norm);
                }
                Ok(())
            }
            ItemBody::TrueFalse { .. } => Ok(()),
            ItemBody::ShortAnswer { model_answer } => {
                if model_answer.trim().is_empty() {
                    Err("short answer item has no model answer".to_string())
                } else {
                    Ok(())
                }
            }
            ItemBody::Essay { rubric } => {
                if rubric.trim().is_empty() {
                    Err("essay item has no rubric".to_string())
                } else {
                    Ok(())
                }
            }
        }
    }

    /// The string recorded in an answer key for this body.
    pub fn answer_label(&self) -> String {
        match self {
            ItemBody::MultipleChoice { correct, .. } => correct.clone(),
            ItemBody::TrueFalse { answer } => {
                if *answer { "True".to_string() } else { "False".to_string() }
            }
            ItemBody::ShortAnswer { model_answer } => model_answer.clone(),
            ItemBody::Essay { .. } => "(see rubric)".to_string(),
        }
    }

    /// Answer-side text subject to cognitive-fidelity checks, if any.
    pub fn answer_text(&self) -> Option<&str> {
        match self {
            ItemBody::ShortAnswer { model_answer } => Some(model_answer),
            ItemBody::Essay { rubric } => Some(rubric),
            _ => None,
        }
    }
}

/// One usage of an item on an assembled test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub test_id: Uuid,
    pub used_at: DateTime<Utc>,
}

/// A bank item: the stem plus its type-specific body and bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    /// The question stem shown to the student.
    pub text: String,
    pub topic: String,
    pub level: CognitiveLevel,
    pub difficulty: Difficulty,
    pub body: ItemBody,
    /// Precomputed embedding vector, if an embedding service produced one.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    /// Author- or review-assigned quality in [0, 1].
    #[serde(default = "default_quality")]
    pub quality_score: f64,
    #[serde(default)]
    pub usage: Vec<UsageRecord>,
    /// Generated items start unapproved; human authors approve explicitly.
    #[serde(default)]
    pub approved: bool,
}

fn default_quality() -> f64 {
    0.5
}

impl Item {
    pub fn item_type(&self) -> ItemType {
        self.body.item_type()
    }

    pub fn usage_count(&self) -> usize {
        self.usage.len()
    }

    /// Most recent usage timestamp, if ever used.
    pub fn last_used_at(&self) -> Option<DateTime<Utc>> {
        self.usage.iter().map(|u| u.used_at).max()
    }
}

/// One topic's row in a coverage plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRequirement {
    pub topic: String,
    /// Instructional hours; drives this topic's share of the total items.
    pub hours: f64,
    /// Relative weight per cognitive level.
    #[serde(default)]
    pub per_level: BTreeMap<CognitiveLevel, u32>,
    /// Relative weight per difficulty band.
    #[serde(default)]
    pub per_difficulty: BTreeMap<Difficulty, u32>,
}

/// The topic × cognitive-level × difficulty target matrix driving assembly.
///
/// Immutable once slot expansion begins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoveragePlan {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub topics: Vec<TopicRequirement>,
}

impl CoveragePlan {
    /// Sum of instructional hours across topics.
    pub fn total_hours(&self) -> f64 {
        self.topics.iter().map(|t| t.hours).sum()
    }
}
