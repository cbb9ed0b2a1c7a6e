//! The `examforge init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("examforge.toml").exists() {
        println!("examforge.toml already exists, skipping.");
    } else {
        std::fs::write("examforge.toml", SAMPLE_CONFIG)?;
        println!("Created examforge.toml");
    }

    std::fs::create_dir_all("plans")?;
    let plan_path = std::path::Path::new("plans/example.toml");
    if plan_path.exists() {
        println!("plans/example.toml already exists, skipping.");
    } else {
        std::fs::write(plan_path, EXAMPLE_PLAN)?;
        println!("Created plans/example.toml");
    }

    let bank_path = std::path::Path::new("bank.json");
    if bank_path.exists() {
        println!("bank.json already exists, skipping.");
    } else {
        std::fs::write(bank_path, EXAMPLE_BANK)?;
        println!("Created bank.json");
    }

    println!("\nNext steps:");
    println!("  1. Edit examforge.toml with your API keys");
    println!("  2. Run: examforge validate --plan plans/example.toml");
    println!(
        "  3. Run: examforge assemble --plan plans/example.toml --bank bank.json \
         --items 20 --versions 2 --config examforge.toml"
    );

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# examforge configuration

generator = "anthropic"

[providers.anthropic]
type = "anthropic"
api_key = "${ANTHROPIC_API_KEY}"

# Optional embedding provider for semantic dedup across runs:
# embedder = "embeddings"
#
# [providers.embeddings]
# type = "embeddings"
# api_key = "${OPENAI_API_KEY}"
"#;

const EXAMPLE_PLAN: &str = r#"# Example coverage plan

[plan]
id = "os-midterm"
name = "Operating Systems Midterm"
description = "Weeks 1-7: processes, memory, scheduling"

[[topics]]
topic = "processes and threads"
hours = 6.0

[topics.per_level]
remembering = 2
understanding = 2
applying = 1
analyzing = 1

[topics.per_difficulty]
easy = 1
medium = 2
hard = 1

[[topics]]
topic = "memory management"
hours = 8.0

[topics.per_level]
understanding = 2
applying = 2
analyzing = 1
evaluating = 1

[topics.per_difficulty]
easy = 1
medium = 1
hard = 1
"#;

const EXAMPLE_BANK: &str = r#"[
  {
    "id": "7b1e8a52-4a8f-4f2e-9d35-0f6f1c2d3e4a",
    "text": "Which scheduler state does a process enter while waiting for disk I/O?",
    "topic": "processes and threads",
    "level": "remembering",
    "difficulty": "easy",
    "body": {
      "kind": "multiple_choice",
      "choices": {
        "A": "running",
        "B": "ready",
        "C": "blocked",
        "D": "terminated"
      },
      "correct": "C"
    },
    "quality_score": 0.9,
    "usage": [],
    "approved": true
  }
]
"#;
