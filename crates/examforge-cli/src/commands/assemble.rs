//! The `examforge assemble` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::Table;

use examforge_bank::FileBank;
use examforge_core::engine::{AssemblyEngine, EngineConfig, StageReporter};
use examforge_core::report::AssemblyReport;
use examforge_providers::{create_embedder, create_generator, load_config};
use examforge_report::{write_json_output, write_markdown_forms};

pub struct AssembleArgs {
    pub plan: PathBuf,
    pub bank: PathBuf,
    pub items: u32,
    pub versions: usize,
    pub shuffle_items: bool,
    pub shuffle_choices: bool,
    pub seed: Option<u64>,
    pub allow_unapproved: bool,
    pub offline: bool,
    pub title: String,
    pub output: PathBuf,
    pub config: Option<PathBuf>,
}

/// Console stage reporter.
struct ConsoleReporter;

impl StageReporter for ConsoleReporter {
    fn on_planned(&self, total_slots: usize) {
        eprintln!("  Planned {total_slots} slot(s)");
    }

    fn on_bank_filled(&self, filled: usize, pending: usize) {
        eprintln!("  Bank filled {filled} slot(s), {pending} pending");
    }

    fn on_generated(&self, filled: usize, pending: usize) {
        eprintln!("  Generated {filled} item(s), {pending} slot(s) unfilled");
    }

    fn on_assembled(&self, forms: usize) {
        eprintln!("  Assembled {forms} form(s)");
    }
}

pub async fn execute(args: AssembleArgs) -> Result<()> {
    let plan = examforge_core::plan::parse_plan(&args.plan)?;
    let bank = Arc::new(FileBank::open(&args.bank)?);

    let provider_config = match &args.config {
        Some(path) if !args.offline => Some(load_config(path)?),
        _ => None,
    };
    let generator = match &provider_config {
        Some(config) => {
            let name = config
                .generator
                .clone()
                .context("config has no generator provider set")?;
            Some(create_generator(config, &name)?)
        }
        None => {
            if !args.offline {
                eprintln!("No provider config given; running without generative fallback.");
            }
            None
        }
    };
    let embedder = match &provider_config {
        Some(config) => match config.embedder.clone() {
            Some(name) => Some(create_embedder(config, &name)?),
            None => None,
        },
        None => None,
    };

    let engine_config = EngineConfig {
        version_count: args.versions,
        shuffle_items: args.shuffle_items,
        shuffle_choices: args.shuffle_choices,
        shuffle_seed: args.seed,
        allow_unapproved: args.allow_unapproved,
        ..Default::default()
    };
    let mut engine = AssemblyEngine::new(bank, generator, engine_config);
    if let Some(embedder) = embedder {
        engine = engine.with_embedder(embedder);
    }

    eprintln!("Assembling \"{}\" from {}", args.title, args.plan.display());
    let output = engine.assemble(&plan, args.items, &ConsoleReporter).await?;

    write_markdown_forms(&output.forms, &args.title, &args.output)?;
    write_json_output(
        &output.report,
        &output.forms,
        &args.output.join("assembly.json"),
    )?;
    output
        .report
        .save_json(&args.output.join("report.json"))?;

    print_summary(&output.report);
    for warning in &output.report.warnings {
        eprintln!("WARNING: {warning}");
    }
    println!(
        "Wrote {} form(s) to {}",
        output.forms.len(),
        args.output.display()
    );

    Ok(())
}

fn print_summary(report: &AssemblyReport) {
    let mut table = Table::new();
    table.set_header(vec![
        "Planned", "Filled", "From bank", "Generated", "Unfilled", "Duration",
    ]);
    table.add_row(vec![
        report.planned_slots.to_string(),
        report.filled_slots.to_string(),
        report.bank_count.to_string(),
        report.generated_count.to_string(),
        report.unfilled.len().to_string(),
        format!("{}ms", report.duration_ms),
    ]);
    println!("{table}");
}
