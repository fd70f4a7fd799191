//! Quality loop orchestrator - bounded generate -> audit -> refine cycles
//!
//! One instance drives a single product item. Attempt 1 generates first-draft
//! content; later attempts refine the best content so far using the most
//! recent audit feedback. The best-scoring attempt is tracked throughout and
//! the loop exits the instant the acceptance threshold is met. All failure is
//! reported as events and a typed outcome; nothing escapes this boundary.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::agents::{AuditResult, DomainAgents, GeneratedContent, ProductInfo, ProductType};
use crate::config::PipelineConfig;
use crate::html;
use crate::learning::{StrategyLedger, SuccessMemory};
use crate::pipeline::event::BatchEvent;

/// Pause before each emitted event so the stream renders progressively
const EVENT_PACING: Duration = Duration::from_millis(50);

/// Number of ranked strategies injected into prompts
const STRATEGY_TOP_N: usize = 3;

/// Terminal payload of a successful run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoneData {
    pub final_score: i64,
    pub final_content: String,
    pub seo_title: String,
    pub meta_description: String,
    pub raw_json_content: Value,
}

/// Outcome of a quality loop run.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    /// Best content exists (whether or not it hit the threshold)
    Completed(DoneData),
    /// No usable content was ever produced, or a required input was missing
    Failed(String),
}

/// Drives the bounded refine loop for one product item
pub struct QualityLoop {
    config: PipelineConfig,
    ledger: Option<Arc<Mutex<StrategyLedger>>>,
    memory: Option<Arc<Mutex<SuccessMemory>>>,
}

impl QualityLoop {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            ledger: None,
            memory: None,
        }
    }

    /// Attach the learning stores; their context is injected into prompts
    /// and improvements are recorded back after successful runs
    pub fn with_learning(
        mut self,
        ledger: Arc<Mutex<StrategyLedger>>,
        memory: Arc<Mutex<SuccessMemory>>,
    ) -> Self {
        self.ledger = Some(ledger);
        self.memory = Some(memory);
        self
    }

    /// Run the loop for one product.
    ///
    /// Streams `log` events while running and emits a terminal `error` event
    /// on failure. The caller emits the `done` event from the returned
    /// payload so it can attach row identity.
    pub async fn run(
        &self,
        agents: &dyn DomainAgents,
        product_type: ProductType,
        product_name: &str,
        info: ProductInfo,
        events: &mpsc::Sender<BatchEvent>,
    ) -> LoopOutcome {
        let mut info = match agents.prepare(product_name, info).await {
            Ok(info) => info,
            Err(reason) => {
                log::error!("Pipeline preparation failed for '{}': {}", product_name, reason);
                self.emit(events, BatchEvent::error(format!("Critical pipeline error: {}", reason)))
                    .await;
                return LoopOutcome::Failed(reason);
            }
        };

        self.inject_learning_context(product_type, &mut info);

        let mut best_content: Option<GeneratedContent> = None;
        let mut best_audit: Option<AuditResult> = None;
        let mut highest_score: i64 = -1;
        let mut first_audit: Option<AuditResult> = None;
        let mut last_audit: Option<AuditResult> = None;
        let mut audits_run: u32 = 0;

        for attempt in 1..=self.config.max_attempts {
            self.emit(
                events,
                BatchEvent::info(format!(
                    "--- Quality cycle {}/{} ---",
                    attempt, self.config.max_attempts
                )),
            )
            .await;

            // Refine only once there is something to refine; a run whose
            // first attempts produced nothing falls back to generating again
            let current = match (&best_content, &last_audit) {
                (Some(previous), Some(feedback)) if attempt > 1 => {
                    Some(agents.refine(product_name, &info, previous, feedback).await)
                }
                _ => agents.generate(product_name, &info).await,
            };

            let current = match current {
                Some(current) => current,
                None => {
                    self.emit(
                        events,
                        BatchEvent::warning(format!(
                            "Content generation or decoding failed on attempt {}. The model response may be malformed.",
                            attempt
                        )),
                    )
                    .await;
                    continue;
                }
            };

            let audit = agents.audit(&current).await;
            audits_run += 1;
            let score = audit.total_score;
            self.emit(
                events,
                BatchEvent::info(format!("Attempt {} score: {}/100", attempt, score)),
            )
            .await;

            if first_audit.is_none() {
                first_audit = Some(audit.clone());
            }

            if score > highest_score {
                highest_score = score;
                best_content = Some(current);
                best_audit = Some(audit.clone());
            }

            last_audit = Some(audit);

            if score >= self.config.min_score_target {
                break;
            }
        }

        let best = match best_content {
            Some(best) => best,
            None => {
                let reason = format!(
                    "Could not generate valid content after {} attempts.",
                    self.config.max_attempts
                );
                self.emit(
                    events,
                    BatchEvent::error(format!("Processing failed for '{}'. {}", product_name, reason)),
                )
                .await;
                return LoopOutcome::Failed(reason);
            }
        };

        self.record_strategy(product_type, audits_run, first_audit.as_ref(), best_audit.as_ref());

        let cleaned = html::clean_model_html(&best.html_content_or_default());
        let final_content = html::finalize_for_display(&cleaned, product_name);

        LoopOutcome::Completed(DoneData {
            final_score: highest_score,
            final_content,
            seo_title: best.seo_title_or(product_name),
            meta_description: best.meta_description_or_default(),
            raw_json_content: best.to_value(),
        })
    }

    /// Enrich the product context with ranked strategy hints and recent
    /// approved examples, once per run
    fn inject_learning_context(&self, product_type: ProductType, info: &mut ProductInfo) {
        if let Some(ledger) = &self.ledger {
            let (successful, failed) = ledger
                .lock()
                .expect("strategy ledger lock poisoned")
                .top_strategies(product_type, STRATEGY_TOP_N);
            info.set("successful_strategies", successful);
            info.set("failed_strategies", failed);
        }
        if let Some(memory) = &self.memory {
            let recent = memory
                .lock()
                .expect("success memory lock poisoned")
                .format_for_prompt();
            info.set("recent_memory", recent);
        }
    }

    /// Record the refinement outcome when the run had at least two audits.
    /// The ledger itself drops zero-delta records.
    fn record_strategy(
        &self,
        product_type: ProductType,
        audits_run: u32,
        first_audit: Option<&AuditResult>,
        best_audit: Option<&AuditResult>,
    ) {
        if audits_run < 2 {
            return;
        }
        if let (Some(ledger), Some(first), Some(best)) = (&self.ledger, first_audit, best_audit) {
            let result = ledger
                .lock()
                .expect("strategy ledger lock poisoned")
                .log_strategy(first, best, product_type);
            if let Err(e) = result {
                log::warn!("Failed to record strategy: {}", e);
            }
        }
    }

    async fn emit(&self, events: &mpsc::Sender<BatchEvent>, event: BatchEvent) {
        tokio::time::sleep(EVENT_PACING).await;
        if events.send(event).await.is_err() {
            log::debug!("Event receiver dropped; pipeline continues");
        }
    }
}
