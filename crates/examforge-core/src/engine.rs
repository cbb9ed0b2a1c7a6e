//! Central assembly engine orchestrator.
//!
//! Runs the sequential stages of one assembly request: Plan → Bank-fill →
//! Generate-fill → Assemble. Stage order matters: the registry accumulates
//! rotation state the generator depends on, and the selector's unfilled
//! count defines the generator's workload.

use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::assembler::{self, AssembleOptions, TestForm, MAX_VERSIONS};
use crate::error::AssemblyError;
use crate::generator::{self, GeneratorConfig};
use crate::model::CoveragePlan;
use crate::planner::{self, Slot, SlotSource};
use crate::registry::GenerationRegistry;
use crate::report::{AssemblyReport, SlotShortage};
use crate::selector;
use crate::traits::{Embedder, ItemGenerator, ItemStore};

/// Configuration for the assembly engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Parallel forms to produce (1..=5).
    pub version_count: usize,
    pub shuffle_items: bool,
    pub shuffle_choices: bool,
    /// Fixed shuffle seed for reproducible forms.
    pub shuffle_seed: Option<u64>,
    /// Allow unapproved bank items when filling slots.
    pub allow_unapproved: bool,
    /// Attempts per generation group.
    pub max_generation_attempts: u32,
    /// Pause between generative service calls.
    pub generation_batch_delay: Duration,
    /// Insert accepted generated items into the bank (unapproved).
    pub persist_generated: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version_count: 1,
            shuffle_items: true,
            shuffle_choices: true,
            shuffle_seed: None,
            allow_unapproved: false,
            max_generation_attempts: 3,
            generation_batch_delay: Duration::from_millis(500),
            persist_generated: true,
        }
    }
}

/// Stage progress reporting trait.
pub trait StageReporter: Send + Sync {
    fn on_planned(&self, total_slots: usize);
    fn on_bank_filled(&self, filled: usize, pending: usize);
    fn on_generated(&self, filled: usize, pending: usize);
    fn on_assembled(&self, forms: usize);
}

/// No-op stage reporter.
pub struct NoopReporter;

impl StageReporter for NoopReporter {
    fn on_planned(&self, _: usize) {}
    fn on_bank_filled(&self, _: usize, _: usize) {}
    fn on_generated(&self, _: usize, _: usize) {}
    fn on_assembled(&self, _: usize) {}
}

/// The full result of one assembly run.
#[derive(Debug)]
pub struct AssemblyOutput {
    pub forms: Vec<TestForm>,
    pub report: AssemblyReport,
    /// The final slot set, filled and unfilled alike.
    pub slots: Vec<Slot>,
}

/// The central assembly engine.
pub struct AssemblyEngine {
    store: Arc<dyn ItemStore>,
    generator: Option<Arc<dyn ItemGenerator>>,
    embedder: Option<Arc<dyn Embedder>>,
    config: EngineConfig,
}

impl AssemblyEngine {
    pub fn new(
        store: Arc<dyn ItemStore>,
        generator: Option<Arc<dyn ItemGenerator>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            generator,
            embedder: None,
            config,
        }
    }

    /// Attach an embedding service; generated items get vectors stamped
    /// before they are persisted, so later runs can dedup on embeddings.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Assemble an examination from a coverage plan.
    ///
    /// The caller always receives a usable result — possibly with fewer
    /// items than requested — plus an itemized shortage report. The only
    /// fatal class is a bad configuration, rejected before any stage runs.
    pub async fn assemble(
        &self,
        plan: &CoveragePlan,
        total_items: u32,
        progress: &dyn StageReporter,
    ) -> Result<AssemblyOutput, AssemblyError> {
        if total_items == 0 {
            return Err(AssemblyError::InvalidConfig(
                "total items must be positive".to_string(),
            ));
        }
        if self.config.version_count == 0 || self.config.version_count > MAX_VERSIONS {
            return Err(AssemblyError::InvalidConfig(format!(
                "version count must be between 1 and {MAX_VERSIONS}, got {}",
                self.config.version_count
            )));
        }

        let start = Instant::now();
        let run_id = Uuid::new_v4();
        let mut warnings = Vec::new();

        // One registry per run; discarded with the run.
        let mut registry = GenerationRegistry::new();

        let mut slots = planner::expand(plan, total_items);
        let planned = slots.len();
        progress.on_planned(planned);
        if planned < total_items as usize {
            warnings.push(format!(
                "plan supports only {planned} of {total_items} requested items"
            ));
        }

        let selection = selector::fill(
            &mut slots,
            &mut registry,
            self.store.as_ref(),
            self.config.allow_unapproved,
        )
        .await;
        let bank_count = selection.filled;
        warnings.extend(selection.warnings);
        progress.on_bank_filled(bank_count, planned - bank_count);

        let mut generated_count = 0;
        let pending_after_bank = slots.iter().filter(|s| !s.is_filled()).count();
        if pending_after_bank > 0 {
            match &self.generator {
                Some(service) => {
                    let gen_config = GeneratorConfig {
                        max_attempts: self.config.max_generation_attempts,
                        batch_delay: self.config.generation_batch_delay,
                        ..Default::default()
                    };
                    let outcome = generator::fill(
                        &mut slots,
                        &mut registry,
                        service.as_ref(),
                        &gen_config,
                    )
                    .await;
                    generated_count = outcome.filled;
                    warnings.extend(outcome.warnings);
                    if generated_count > 0 {
                        warnings.push(format!(
                            "{generated_count} item(s) were generated to cover bank shortage; \
                             generated items await review"
                        ));
                    }

                    if self.config.persist_generated && !outcome.generated.is_empty() {
                        let mut to_persist = outcome.generated;
                        // Vectors are stamped onto the persisted copies so
                        // later runs can dedup on embeddings; best-effort.
                        if let Some(embedder) = &self.embedder {
                            for item in &mut to_persist {
                                match embedder.embed(&item.text).await {
                                    Ok(vector) => item.embedding = Some(vector),
                                    Err(e) => {
                                        tracing::debug!(
                                            "embedding failed for generated item: {e:#}"
                                        );
                                    }
                                }
                            }
                        }
                        if let Err(e) = self.store.insert_many(to_persist).await {
                            tracing::warn!("failed to persist generated items: {e:#}");
                            warnings.push(format!("generated items were not persisted: {e}"));
                        }
                    }
                }
                None => {
                    warnings.push(format!(
                        "no generative service configured; {pending_after_bank} slot(s) left unfilled"
                    ));
                }
            }
        }
        progress.on_generated(
            generated_count,
            slots.iter().filter(|s| !s.is_filled()).count(),
        );

        // Usage history is appended for bank items only; generated items
        // are brand new and start with this run in their history at review
        // time, not before.
        let used_ids: Vec<Uuid> = slots
            .iter()
            .filter(|s| s.source == Some(SlotSource::Bank))
            .filter_map(|s| s.item.as_ref().map(|i| i.id))
            .collect();
        if !used_ids.is_empty() {
            if let Err(e) = self.store.record_usage(&used_ids, run_id).await {
                tracing::warn!("failed to record item usage: {e:#}");
                warnings.push(format!("item usage was not recorded: {e}"));
            }
        }

        let forms = assembler::assemble(
            &slots,
            &AssembleOptions {
                version_count: self.config.version_count,
                shuffle_items: self.config.shuffle_items,
                shuffle_choices: self.config.shuffle_choices,
                seed: self.config.shuffle_seed,
            },
        )?;
        progress.on_assembled(forms.len());

        let unfilled: Vec<SlotShortage> = slots
            .iter()
            .filter(|s| !s.is_filled())
            .map(SlotShortage::from)
            .collect();
        if !unfilled.is_empty() {
            warnings.push(format!(
                "{} slot(s) could not be filled; the test is short",
                unfilled.len()
            ));
        }

        let report = AssemblyReport {
            id: run_id,
            created_at: chrono::Utc::now(),
            plan_id: plan.id.clone(),
            planned_slots: planned,
            filled_slots: planned - unfilled.len(),
            bank_count,
            generated_count,
            unfilled,
            warnings,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        Ok(AssemblyOutput {
            forms,
            report,
            slots,
        })
    }
}
