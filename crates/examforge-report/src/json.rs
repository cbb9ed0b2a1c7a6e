//! JSON export of the full assembly output.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use examforge_core::assembler::TestForm;
use examforge_core::report::AssemblyReport;

/// The JSON document written for one assembly run.
#[derive(Debug, Serialize)]
pub struct JsonOutput<'a> {
    pub report: &'a AssemblyReport,
    pub forms: &'a [TestForm],
}

/// Write the report and all forms as one pretty-printed JSON file.
pub fn write_json_output(
    report: &AssemblyReport,
    forms: &[TestForm],
    path: &Path,
) -> Result<()> {
    let output = JsonOutput { report, forms };
    let json = serde_json::to_string_pretty(&output).context("failed to serialize output")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)
        .with_context(|| format!("failed to write output to {}", path.display()))?;
    Ok(())
}
