//! The `examforge validate` command.

use std::path::PathBuf;

use anyhow::Result;

pub fn execute(plan_path: PathBuf) -> Result<()> {
    let plans = if plan_path.is_dir() {
        examforge_core::plan::load_plan_directory(&plan_path)?
    } else {
        vec![examforge_core::plan::parse_plan(&plan_path)?]
    };

    let mut total_warnings = 0;

    for plan in &plans {
        println!(
            "Plan: {} ({} topics, {:.1} hours)",
            plan.name,
            plan.topics.len(),
            plan.total_hours()
        );

        let warnings = examforge_core::plan::validate_plan(plan);
        for w in &warnings {
            let prefix = w
                .topic
                .as_ref()
                .map(|t| format!("  [{t}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All plans valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
