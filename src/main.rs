use clap::{Parser, Subcommand};
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pharmaboost::agents::{
    beauty, medicine, BeautyAgents, DomainAgents, MedicineAgents, ProductInfo, ProductType,
};
use pharmaboost::batch::{
    BatchCoordinator, BatchSource, DocumentSource, HttpDocumentSource, PlainTextExtractor,
    ResourcePools,
};
use pharmaboost::config::{Config, Credentials};
use pharmaboost::learning::{StrategyLedger, SuccessMemory};
use pharmaboost::llm::{GeminiClient, GeminiConfig, GenerativeClient, RetryPolicy};
use pharmaboost::pipeline::{BatchEvent, LoopOutcome, QualityLoop};
use pharmaboost::prompt::PromptStore;
use pharmaboost::search::{GoogleSearchClient, SearchClient, SeoResearcher};

#[derive(Parser)]
#[command(
    name = "pharmaboost",
    about = "Catalog content generation with an iterative quality loop"
)]
struct Cli {
    /// Path to a config file (defaults to the standard lookup chain)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a batch of catalog rows, streaming progress events to stdout
    Batch {
        /// JSON array of catalog rows to process
        #[arg(long)]
        items: PathBuf,

        /// JSON reference catalog; its presence selects the medicine pipeline
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Free-text context file injected into beauty prompts
        #[arg(long)]
        context: Option<PathBuf>,

        /// Where to write the draft rows artifact from the finished event
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Process one product as medicine from a pre-extracted document text file
    Single {
        #[arg(long)]
        product_name: String,

        #[arg(long)]
        sku: String,

        /// File containing the extracted leaflet text
        #[arg(long)]
        document: PathBuf,
    },
    /// Record an approved before/after pair into the success memory
    Approve {
        #[arg(long)]
        product: String,

        /// File with the original HTML
        #[arg(long)]
        original: PathBuf,

        /// File with the approved HTML
        #[arg(long)]
        approved: PathBuf,
    },
    /// Show ranked refinement strategies from the ledger
    Strategies {
        #[arg(long, default_value = "medicine")]
        product_type: String,
    },
}

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pharmaboost")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("pharmaboost.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Everything the content pipeline needs, wired once at startup
struct PipelineDeps {
    client: Arc<dyn GenerativeClient>,
    prompts: Arc<PromptStore>,
    pools: ResourcePools,
    retry: RetryPolicy,
    quality: Arc<QualityLoop>,
    credentials: Credentials,
}

fn build_deps(config: &Config) -> Result<PipelineDeps> {
    let credentials = Credentials::from_env().context("Missing required credentials")?;

    let client: Arc<dyn GenerativeClient> = Arc::new(GeminiClient::with_api_key(
        credentials.gemini_api_key.clone(),
        GeminiConfig {
            model: config.llm.model.clone(),
            timeout: Duration::from_secs(config.llm.timeout_secs),
        },
    )?);

    let prompts = Arc::new(PromptStore::new(&config.prompts_dir));
    let pools = ResourcePools::new(&config.concurrency);
    let retry = RetryPolicy::with_max_retries(config.llm.max_retries);

    let ledger = Arc::new(Mutex::new(StrategyLedger::new(&config.learning.ledger_file)));
    let memory = Arc::new(Mutex::new(SuccessMemory::new(
        &config.learning.memory_file,
        config.learning.memory_cap,
    )));
    let quality = Arc::new(QualityLoop::new(config.pipeline.clone()).with_learning(ledger, memory));

    Ok(PipelineDeps {
        client,
        prompts,
        pools,
        retry,
        quality,
        credentials,
    })
}

fn build_medicine_agents(deps: &PipelineDeps) -> Result<Arc<dyn DomainAgents>> {
    deps.prompts
        .preload(medicine::REQUIRED_TEMPLATES)
        .context("Medicine prompt templates missing")?;
    Ok(Arc::new(MedicineAgents::new(
        deps.client.clone(),
        deps.prompts.clone(),
        deps.retry.clone(),
    )))
}

fn build_beauty_agents(deps: &PipelineDeps, config: &Config) -> Result<Arc<dyn DomainAgents>> {
    deps.prompts
        .preload(beauty::REQUIRED_TEMPLATES)
        .context("Beauty prompt templates missing")?;

    let search: Arc<dyn SearchClient> = Arc::new(GoogleSearchClient::new(
        deps.credentials.google_api_key.clone(),
        deps.credentials.google_cse_id.clone(),
        config.search.country.clone(),
        config.search.language.clone(),
    ));
    let researcher = Arc::new(SeoResearcher::new(search, deps.pools.searches.clone()));

    Ok(Arc::new(BeautyAgents::new(
        deps.client.clone(),
        deps.prompts.clone(),
        researcher,
        deps.retry.clone(),
    )))
}

async fn run_batch(
    config: &Config,
    items: PathBuf,
    catalog: Option<PathBuf>,
    context: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let deps = build_deps(config)?;

    let agents = if catalog.is_some() {
        build_medicine_agents(&deps)?
    } else {
        build_beauty_agents(&deps, config)?
    };

    let documents: Arc<dyn DocumentSource> = Arc::new(HttpDocumentSource::new(
        Arc::new(PlainTextExtractor),
        deps.pools.downloads.clone(),
    ));

    let coordinator = Arc::new(BatchCoordinator::new(
        deps.quality.clone(),
        agents,
        documents,
        deps.pools.clone(),
    ));

    let context_text = match context {
        Some(path) => Some(
            fs::read_to_string(&path)
                .context(format!("Failed to read context file {}", path.display()))?,
        ),
        None => None,
    };

    info!("Starting batch from {}", items.display());
    let mut events = coordinator.stream(BatchSource {
        items_file: items,
        catalog_file: catalog,
        context_text,
    });

    while let Some(event) = events.recv().await {
        print!("{}", event.to_sse());

        if let BatchEvent::Finished(payload) = &event {
            if let Some(output) = &output {
                let rows = serde_json::to_string_pretty(&payload["rows"])?;
                fs::write(output, rows)
                    .context(format!("Failed to write draft to {}", output.display()))?;
                println!("{} {}", "Draft written to:".green(), output.display());
            }
        }
    }

    Ok(())
}

async fn run_single(
    config: &Config,
    product_name: String,
    sku: String,
    document: PathBuf,
) -> Result<()> {
    let deps = build_deps(config)?;
    let agents = build_medicine_agents(&deps)?;

    let leaflet_text = fs::read_to_string(&document)
        .context(format!("Failed to read document {}", document.display()))?;
    if leaflet_text.trim().is_empty() {
        eyre::bail!("Could not extract text from the document.");
    }
    println!("{}", "Leaflet document read successfully.".green());

    let mut info = ProductInfo::new();
    info.set("leaflet_text", leaflet_text);

    let (tx, mut rx) = tokio::sync::mpsc::channel::<BatchEvent>(64);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print!("{}", event.to_sse());
        }
    });

    let outcome = deps
        .quality
        .run(agents.as_ref(), ProductType::Medicine, &product_name, info, &tx)
        .await;
    drop(tx);
    printer.await?;

    match outcome {
        LoopOutcome::Completed(done) => {
            let mut payload = serde_json::to_value(&done)?;
            payload["sku"] = serde_json::json!(sku);
            payload["product_name"] = serde_json::json!(product_name);
            print!("{}", BatchEvent::done(payload).to_sse());
            println!(
                "{} final score {}",
                "Processing complete:".green(),
                done.final_score
            );
        }
        LoopOutcome::Failed(reason) => {
            println!("{} {}", "Processing failed:".red(), reason);
        }
    }

    Ok(())
}

fn run_approve(config: &Config, product: String, original: PathBuf, approved: PathBuf) -> Result<()> {
    let original_html = fs::read_to_string(&original)
        .context(format!("Failed to read {}", original.display()))?;
    let approved_html = fs::read_to_string(&approved)
        .context(format!("Failed to read {}", approved.display()))?;

    let memory = SuccessMemory::new(&config.learning.memory_file, config.learning.memory_cap);
    memory.record_success(&product, &original_html, &approved_html)?;

    println!("{} {}", "Recorded approval for:".green(), product);
    Ok(())
}

fn run_strategies(config: &Config, product_type: &str) -> Result<()> {
    let product_type = match product_type {
        "medicine" => ProductType::Medicine,
        "beauty" => ProductType::Beauty,
        other => eyre::bail!("Unknown product type '{}'. Use 'medicine' or 'beauty'.", other),
    };

    let ledger = StrategyLedger::new(&config.learning.ledger_file);
    let (successful, failed) = ledger.top_strategies(product_type, 3);

    println!("{}", "Best strategies:".green());
    println!("{}", successful);
    println!();
    println!("{}", "Worst strategies:".red());
    println!("{}", failed);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    if cli.verbose {
        println!("{}", "Verbose mode enabled".yellow());
    }

    info!("Starting with config from: {:?}", cli.config);

    match cli.command {
        Commands::Batch {
            items,
            catalog,
            context,
            output,
        } => run_batch(&config, items, catalog, context, output)
            .await
            .context("Batch processing failed")?,
        Commands::Single {
            product_name,
            sku,
            document,
        } => run_single(&config, product_name, sku, document)
            .await
            .context("Single-item processing failed")?,
        Commands::Approve {
            product,
            original,
            approved,
        } => run_approve(&config, product, original, approved).context("Approval failed")?,
        Commands::Strategies { product_type } => {
            run_strategies(&config, &product_type).context("Strategy listing failed")?
        }
    }

    Ok(())
}
