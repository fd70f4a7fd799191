//! Batch coordinator - bounded fan-out with per-row failure isolation
//!
//! Workers are spawned into a JoinSet, one per catalog row, each owning its
//! row end-to-end behind a permit from the row pool. Events stream through a
//! single mpsc channel in dispatch order per row; the summary counters and
//! results list are only touched by the coordinator's join loop, never from
//! worker bodies. A fatal input error (unreadable items or catalog file)
//! aborts the whole stream with one fatal log event and no `finished` event;
//! every per-row failure is a non-fatal skip.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::agents::{DomainAgents, ProductInfo, ProductType};
use crate::batch::fetch::DocumentSource;
use crate::batch::pools::ResourcePools;
use crate::batch::row::{apply_updates, BatchItemOutcome, BatchSummary, Catalog, CatalogRow};
use crate::html;
use crate::pipeline::event::{BatchEvent, LogLevel};
use crate::pipeline::{LoopOutcome, QualityLoop};

/// Capacity of the event channel between workers and the consumer
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Input files for one batch run. The catalog's presence selects the
/// medicine pipeline; without it rows are processed as beauty items.
#[derive(Debug, Clone)]
pub struct BatchSource {
    pub items_file: PathBuf,
    pub catalog_file: Option<PathBuf>,
    pub context_text: Option<String>,
}

/// Fans the quality loop out over catalog rows with bounded concurrency
pub struct BatchCoordinator {
    quality: Arc<QualityLoop>,
    agents: Arc<dyn DomainAgents>,
    documents: Arc<dyn DocumentSource>,
    pools: ResourcePools,
}

impl BatchCoordinator {
    pub fn new(
        quality: Arc<QualityLoop>,
        agents: Arc<dyn DomainAgents>,
        documents: Arc<dyn DocumentSource>,
        pools: ResourcePools,
    ) -> Self {
        Self {
            quality,
            agents,
            documents,
            pools,
        }
    }

    /// Start a batch from input files and return the live event stream.
    ///
    /// The stream ends after the `finished` event, or after a fatal log
    /// event if the inputs could not be read.
    pub fn stream(self: Arc<Self>, source: BatchSource) -> mpsc::Receiver<BatchEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            self.drive(source, tx).await;
        });
        rx
    }

    async fn drive(&self, source: BatchSource, tx: mpsc::Sender<BatchEvent>) {
        let rows = match CatalogRow::load_rows(&source.items_file) {
            Ok(rows) => rows,
            Err(e) => {
                log::error!("Fatal error during batch processing: {}", e);
                let _ = tx
                    .send(BatchEvent::log(
                        format!("Fatal error during batch processing: {}", e),
                        LogLevel::Error,
                    ))
                    .await;
                return;
            }
        };

        let catalog = match &source.catalog_file {
            Some(path) => match Catalog::load(path) {
                Ok(catalog) => Some(Arc::new(catalog)),
                Err(e) => {
                    log::error!("Fatal error during batch processing: {}", e);
                    let _ = tx
                        .send(BatchEvent::log(
                            format!("Fatal error during batch processing: {}", e),
                            LogLevel::Error,
                        ))
                        .await;
                    return;
                }
            },
            None => None,
        };

        self.run_rows(rows, catalog, source.context_text, tx).await;
    }

    /// Run a batch over already-loaded rows. Exposed for callers that do
    /// their own input handling.
    pub async fn run_rows(
        &self,
        rows: Vec<CatalogRow>,
        catalog: Option<Arc<Catalog>>,
        context_text: Option<String>,
        tx: mpsc::Sender<BatchEvent>,
    ) {
        let product_type = if catalog.is_some() {
            ProductType::Medicine
        } else {
            ProductType::Beauty
        };

        let mode_message = match product_type {
            ProductType::Medicine => "Catalog detected. Processing batch in MEDICINE mode.",
            ProductType::Beauty => "No catalog provided. Processing batch in BEAUTY mode.",
        };
        let _ = tx.send(BatchEvent::info(mode_message)).await;

        let total = rows.len() as u64;
        let _ = tx
            .send(BatchEvent::info(format!(
                "Input read. {} items to process...",
                total
            )))
            .await;

        let counter = Arc::new(AtomicU64::new(0));
        let context_text = context_text.map(Arc::new);

        let mut workers: JoinSet<BatchItemOutcome> = JoinSet::new();
        for row in rows.clone() {
            let quality = self.quality.clone();
            let agents = self.agents.clone();
            let documents = self.documents.clone();
            let permits = self.pools.rows.clone();
            let catalog = catalog.clone();
            let context_text = context_text.clone();
            let counter = counter.clone();
            let tx = tx.clone();

            workers.spawn(async move {
                process_row(
                    quality,
                    agents,
                    documents,
                    permits,
                    catalog,
                    context_text,
                    product_type,
                    row,
                    counter,
                    total,
                    tx,
                )
                .await
            });
        }

        // Single consumption path: counters and the results list are only
        // updated here, as each worker resolves
        let mut summary = BatchSummary::default();
        let mut outcomes: Vec<BatchItemOutcome> = Vec::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcome) => {
                    if outcome.is_success() {
                        summary.success += 1;
                    } else {
                        summary.skipped += 1;
                    }
                    outcomes.push(outcome);
                }
                Err(e) => {
                    summary.skipped += 1;
                    log::warn!("Batch worker failed: {}", e);
                    let _ = tx
                        .send(BatchEvent::warning(format!("A batch worker failed: {}", e)))
                        .await;
                }
            }
        }

        let _ = tx
            .send(BatchEvent::info(format!(
                "Batch processing finished. Summary: {} succeeded, {} skipped.",
                summary.success, summary.skipped
            )))
            .await;

        if summary.success == 0 {
            let _ = tx
                .send(BatchEvent::warning(
                    "WARNING: no product was processed successfully.",
                ))
                .await;
            return;
        }

        let _ = tx
            .send(BatchEvent::info("Assembling the draft for curation..."))
            .await;

        let updated_rows = apply_updates(&rows, &outcomes);
        let _ = tx
            .send(BatchEvent::finished(json!({
                "summary": summary,
                "rows": updated_rows,
            })))
            .await;
    }
}

/// One worker: owns a single row end-to-end. Any failure resolves to a
/// Skipped outcome; nothing propagates to sibling workers.
#[allow(clippy::too_many_arguments)]
async fn process_row(
    quality: Arc<QualityLoop>,
    agents: Arc<dyn DomainAgents>,
    documents: Arc<dyn DocumentSource>,
    permits: Arc<tokio::sync::Semaphore>,
    catalog: Option<Arc<Catalog>>,
    context_text: Option<Arc<String>>,
    product_type: ProductType,
    row: CatalogRow,
    counter: Arc<AtomicU64>,
    total: u64,
    tx: mpsc::Sender<BatchEvent>,
) -> BatchItemOutcome {
    let _permit = permits.acquire_owned().await.expect("row pool closed");

    let sku = row.sku.clone();

    // The counter marks the row as started, so `current` reflects dispatch
    // order rather than completion order
    let current = counter.fetch_add(1, Ordering::SeqCst) + 1;
    let _ = tx.send(BatchEvent::progress(current, total, &sku)).await;

    let info = match build_product_info(&row, product_type, catalog.as_deref(), context_text.as_deref(), documents.as_ref()).await {
        Ok(info) => info,
        Err(reason) => {
            log::warn!("[SKU: {}] Item skipped. Reason: {}", sku, reason);
            let _ = tx
                .send(BatchEvent::warning(format!(
                    "[SKU: {}] Skipped. Reason: {}",
                    sku, reason
                )))
                .await;
            return BatchItemOutcome::Skipped { sku, reason };
        }
    };

    match quality
        .run(agents.as_ref(), product_type, &row.product_name, info, &tx)
        .await
    {
        LoopOutcome::Completed(done) => {
            let mut payload = serde_json::to_value(&done).unwrap_or_default();
            payload["sku"] = json!(sku.clone());
            payload["product_name"] = json!(row.product_name.clone());
            let _ = tx.send(BatchEvent::done(payload)).await;
            BatchItemOutcome::Success {
                sku,
                product_name: row.product_name.clone(),
                done,
            }
        }
        LoopOutcome::Failed(reason) => {
            log::warn!("[SKU: {}] Item skipped. Reason: {}", sku, reason);
            let _ = tx
                .send(BatchEvent::warning(format!(
                    "[SKU: {}] Skipped. Reason: {}",
                    sku, reason
                )))
                .await;
            BatchItemOutcome::Skipped { sku, reason }
        }
    }
}

/// Check row preconditions and assemble the product context.
///
/// Medicine rows must match a validated catalog entry with a working leaflet
/// link; beauty rows reuse their existing description plus the shared
/// free-text context.
async fn build_product_info(
    row: &CatalogRow,
    product_type: ProductType,
    catalog: Option<&Catalog>,
    context_text: Option<&String>,
    documents: &dyn DocumentSource,
) -> Result<ProductInfo, String> {
    let mut info = ProductInfo::new();
    info.set("brand", row.brand.clone());

    match product_type {
        ProductType::Medicine => {
            let catalog = catalog.ok_or_else(|| "Catalog is required for medicine batches.".to_string())?;
            let entry = catalog
                .lookup(&row.sku)
                .ok_or_else(|| "SKU not found in catalog.".to_string())?;

            if !entry.validated {
                return Err("Item not validated in catalog.".to_string());
            }

            let link = entry
                .leaflet_link
                .as_deref()
                .filter(|l| !l.trim().is_empty())
                .ok_or_else(|| "Leaflet link missing from catalog.".to_string())?;

            let leaflet_text = documents.fetch_text(&row.sku, link).await;
            if leaflet_text.trim().is_empty() {
                return Err("Failed to read the leaflet document.".to_string());
            }
            info.set("leaflet_text", leaflet_text);
        }
        ProductType::Beauty => {
            let description_text = html::strip_tags(&row.description_html);
            let enriched_context = format!(
                "- Product name: {}\n- Brand: {}\n- Additional information: {}\n- General client context: {}",
                row.product_name,
                row.brand,
                description_text,
                context_text
                    .map(|s| s.as_str())
                    .unwrap_or("No additional context provided."),
            );
            info.set("context_text", enriched_context);
        }
    }

    Ok(info)
}
