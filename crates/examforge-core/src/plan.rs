//! TOML coverage-plan parser.
//!
//! Loads coverage plans from TOML files and directories, and validates them.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{CognitiveLevel, CoveragePlan, Difficulty, TopicRequirement};

/// Intermediate TOML structure for parsing plan files.
#[derive(Debug, Deserialize)]
struct TomlPlanFile {
    plan: TomlPlanHeader,
    #[serde(default)]
    topics: Vec<TomlTopic>,
}

#[derive(Debug, Deserialize)]
struct TomlPlanHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TomlTopic {
    topic: String,
    hours: f64,
    /// Level name → relative weight, e.g. `remembering = 3`.
    #[serde(default)]
    per_level: BTreeMap<String, u32>,
    /// Difficulty name → relative weight, e.g. `easy = 2`.
    #[serde(default)]
    per_difficulty: BTreeMap<String, u32>,
}

/// Parse a coverage plan from a TOML file.
pub fn parse_plan(path: &Path) -> Result<CoveragePlan> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read plan file {}", path.display()))?;
    parse_plan_str(&content).with_context(|| format!("in plan file {}", path.display()))
}

/// Parse a coverage plan from TOML text.
pub fn parse_plan_str(content: &str) -> Result<CoveragePlan> {
    let file: TomlPlanFile = toml::from_str(content).context("failed to parse plan TOML")?;

    let mut topics = Vec::with_capacity(file.topics.len());
    for t in file.topics {
        let mut per_level = BTreeMap::new();
        for (name, weight) in t.per_level {
            let level = CognitiveLevel::from_str(&name)
                .map_err(|e| anyhow::anyhow!("topic '{}': {e}", t.topic))?;
            per_level.insert(level, weight);
        }
        let mut per_difficulty = BTreeMap::new();
        for (name, weight) in t.per_difficulty {
            let difficulty = Difficulty::from_str(&name)
                .map_err(|e| anyhow::anyhow!("topic '{}': {e}", t.topic))?;
            per_difficulty.insert(difficulty, weight);
        }
        topics.push(TopicRequirement {
            topic: t.topic,
            hours: t.hours,
            per_level,
            per_difficulty,
        });
    }

    Ok(CoveragePlan {
        id: file.plan.id,
        name: file.plan.name,
        description: file.plan.description,
        topics,
    })
}

/// Load all `.toml` plans from a directory.
pub fn load_plan_directory(dir: &Path) -> Result<Vec<CoveragePlan>> {
    let mut plans = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read plan directory {}", dir.display()))?;
    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();
    for path in paths {
        plans.push(parse_plan(&path)?);
    }
    Ok(plans)
}

/// A non-fatal issue found while validating a plan.
#[derive(Debug, Clone)]
pub struct PlanWarning {
    pub topic: Option<String>,
    pub message: String,
}

/// Validate a plan, returning warnings for suspicious content.
pub fn validate_plan(plan: &CoveragePlan) -> Vec<PlanWarning> {
    let mut warnings = Vec::new();

    if plan.topics.is_empty() {
        warnings.push(PlanWarning {
            topic: None,
            message: "plan has no topics; expansion will produce no slots".to_string(),
        });
    }
    if plan.total_hours() <= 0.0 && !plan.topics.is_empty() {
        warnings.push(PlanWarning {
            topic: None,
            message: "all topics have zero hours; expansion will produce no slots".to_string(),
        });
    }

    for t in &plan.topics {
        if t.hours < 0.0 {
            warnings.push(PlanWarning {
                topic: Some(t.topic.clone()),
                message: format!("negative hours ({}) are treated as zero", t.hours),
            });
        }
        if t.topic.trim().is_empty() {
            warnings.push(PlanWarning {
                topic: None,
                message: "a topic has an empty name".to_string(),
            });
        }
        if !t.per_level.is_empty() && t.per_level.values().all(|w| *w == 0) {
            warnings.push(PlanWarning {
                topic: Some(t.topic.clone()),
                message: "all level weights are zero; uniform distribution will be used"
                    .to_string(),
            });
        }
        if !t.per_difficulty.is_empty() && t.per_difficulty.values().all(|w| *w == 0) {
            warnings.push(PlanWarning {
                topic: Some(t.topic.clone()),
                message: "all difficulty weights are zero; uniform distribution will be used"
                    .to_string(),
            });
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[plan]
id = "net-midterm"
name = "Networks Midterm"
description = "Weeks 1-6"

[[topics]]
topic = "transport layer"
hours = 6.0

[topics.per_level]
remembering = 2
understanding = 2
analyzing = 1

[topics.per_difficulty]
easy = 1
medium = 2
hard = 1

[[topics]]
topic = "routing"
hours = 4.5
"#;

    #[test]
    fn parses_full_plan() {
        let plan = parse_plan_str(SAMPLE).unwrap();
        assert_eq!(plan.id, "net-midterm");
        assert_eq!(plan.topics.len(), 2);
        let transport = &plan.topics[0];
        assert_eq!(transport.hours, 6.0);
        assert_eq!(
            transport.per_level.get(&CognitiveLevel::Analyzing),
            Some(&1)
        );
        assert_eq!(
            transport.per_difficulty.get(&Difficulty::Medium),
            Some(&2)
        );
        // Unspecified maps default to empty (uniform at expansion time).
        assert!(plan.topics[1].per_level.is_empty());
    }

    #[test]
    fn unknown_level_name_is_an_error() {
        let bad = r#"
[plan]
id = "p"
name = "P"

[[topics]]
topic = "t"
hours = 1.0

[topics.per_level]
memorizing = 1
"#;
        let err = parse_plan_str(bad).unwrap_err();
        assert!(err.to_string().contains("topic 't'"));
    }

    #[test]
    fn level_aliases_parse() {
        let aliased = r#"
[plan]
id = "p"
name = "P"

[[topics]]
topic = "t"
hours = 1.0

[topics.per_level]
recall = 1
synthesis = 1
"#;
        let plan = parse_plan_str(aliased).unwrap();
        let levels = &plan.topics[0].per_level;
        assert!(levels.contains_key(&CognitiveLevel::Remembering));
        assert!(levels.contains_key(&CognitiveLevel::Creating));
    }

    #[test]
    fn validation_flags_empty_and_zero_plans() {
        let empty = CoveragePlan {
            id: "p".into(),
            name: "P".into(),
            description: String::new(),
            topics: vec![],
        };
        assert_eq!(validate_plan(&empty).len(), 1);

        let plan = parse_plan_str(SAMPLE).unwrap();
        assert!(validate_plan(&plan).is_empty());
    }

    #[test]
    fn load_directory_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.toml"),
            "[plan]\nid = \"b\"\nname = \"B\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.toml"),
            "[plan]\nid = \"a\"\nname = \"A\"\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let plans = load_plan_directory(dir.path()).unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].id, "a");
        assert_eq!(plans[1].id, "b");
    }
}
