use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub concurrency: ConcurrencyConfig,
    pub pipeline: PipelineConfig,
    pub prompts_dir: PathBuf,
    pub learning: LearningConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            max_retries: 5,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub country: String,
    pub language: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            country: "br".to_string(),
            language: "lang_pt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub max_rows: usize,
    pub max_downloads: usize,
    pub max_searches: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_rows: 50,
            max_downloads: 10,
            max_searches: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_attempts: u32,
    pub min_score_target: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            min_score_target: 95,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub ledger_file: PathBuf,
    pub memory_file: PathBuf,
    pub memory_cap: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pharmaboost");
        Self {
            ledger_file: data_dir.join("seo_strategies.json"),
            memory_file: data_dir.join("merchant_success_memory.json"),
            memory_cap: 3,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            llm: LlmConfig::default(),
            search: SearchConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            pipeline: PipelineConfig::default(),
            prompts_dir: PathBuf::from("prompts"),
            learning: LearningConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Credentials read from the environment at startup.
///
/// A missing generation key is configuration-fatal; missing search keys only
/// degrade the search backend to empty results.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub gemini_api_key: String,
    pub google_api_key: Option<String>,
    pub google_cse_id: Option<String>,
}

impl Credentials {
    /// Read credentials from the environment.
    pub fn from_env() -> crate::Result<Self> {
        let gemini_api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            crate::PharmaBoostError::Configuration("GEMINI_API_KEY not set".to_string())
        })?;

        let google_api_key = std::env::var("GOOGLE_API_KEY").ok();
        let google_cse_id = std::env::var("GOOGLE_CSE_ID").ok();
        if google_api_key.is_none() || google_cse_id.is_none() {
            log::warn!("Google search credentials not set; search research will return empty results");
        }

        Ok(Self {
            gemini_api_key,
            google_api_key,
            google_cse_id,
        })
    }
}
