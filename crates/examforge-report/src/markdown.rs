//! Markdown exam-paper and answer-key renderers.

use std::path::Path;

use anyhow::{Context, Result};

use examforge_core::assembler::TestForm;
use examforge_core::model::ItemBody;

/// Render one form as a printable markdown exam paper (no answers).
pub fn render_form(form: &TestForm, title: &str) -> String {
    let mut md = String::new();

    md.push_str(&format!("# {title} — Form {}\n\n", form.version_label));
    md.push_str(&format!(
        "Total: {} points across {} questions.\n\n",
        form.total_points,
        form.items.len()
    ));
    md.push_str("---\n\n");

    for (i, fi) in form.items.iter().enumerate() {
        md.push_str(&format!(
            "**{}.** ({} pt) {}\n\n",
            i + 1,
            fi.points,
            fi.item.text
        ));
        match &fi.item.body {
            ItemBody::MultipleChoice { choices, .. } => {
                for (label, text) in choices {
                    md.push_str(&format!("   {label}) {text}\n"));
                }
                md.push('\n');
            }
            ItemBody::TrueFalse { .. } => {
                md.push_str("   True / False\n\n");
            }
            ItemBody::ShortAnswer { .. } => {
                md.push_str("   _Answer briefly in the space below._\n\n");
            }
            ItemBody::Essay { .. } => {
                md.push_str("   _Answer in essay form on the attached sheets._\n\n");
            }
        }
    }

    md
}

/// Render one form's answer-key sheet.
pub fn render_answer_key(form: &TestForm, title: &str) -> String {
    let mut md = String::new();

    md.push_str(&format!("# {title} — Answer Key, Form {}\n\n", form.version_label));
    md.push_str("| # | Answer | Points |\n");
    md.push_str("|---|--------|--------|\n");

    for (i, fi) in form.items.iter().enumerate() {
        let answer = form
            .answer_key
            .get(&i)
            .cloned()
            .unwrap_or_else(|| fi.item.body.answer_label());
        md.push_str(&format!("| {} | {} | {} |\n", i + 1, answer, fi.points));
    }

    md
}

/// Write every form and its answer key as markdown files under `dir`.
pub fn write_markdown_forms(forms: &[TestForm], title: &str, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    for form in forms {
        let form_path = dir.join(format!("form-{}.md", form.version_label));
        std::fs::write(&form_path, render_form(form, title))
            .with_context(|| format!("failed to write {}", form_path.display()))?;

        let key_path = dir.join(format!("form-{}-key.md", form.version_label));
        std::fs::write(&key_path, render_answer_key(form, title))
            .with_context(|| format!("failed to write {}", key_path.display()))?;
    }
    Ok(())
}
