//! Document fetching - bounded downloads of source documents
//!
//! Leaflet documents live behind HTTP links (often Google Drive share
//! links). Downloads hold a permit from the download pool, and every failure
//! degrades to an empty string; the caller's precondition check turns that
//! into a per-row skip.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::Semaphore;

/// Narrow interface to document text extraction (PDF parsing is an external
/// collaborator). Returns an empty string on failure, never an error.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> String;
}

/// Extractor for documents that are already plain text
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// Source of document text for catalog rows
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch and extract the text of a linked document.
    ///
    /// Never fails: download or extraction problems yield an empty string.
    async fn fetch_text(&self, sku: &str, link: &str) -> String;
}

fn drive_file_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/d/([a-zA-Z0-9_-]+)").unwrap())
}

/// Convert a Google Drive share link into a direct-download link
pub fn convert_drive_url(url: &str) -> Option<String> {
    let file_id = drive_file_id_re().captures(url)?.get(1)?.as_str().to_string();
    Some(format!(
        "https://drive.google.com/uc?export=download&id={}",
        file_id
    ))
}

/// HTTP-backed document source with a bounded download pool
pub struct HttpDocumentSource {
    client: reqwest::Client,
    extractor: Arc<dyn TextExtractor>,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl HttpDocumentSource {
    pub fn new(extractor: Arc<dyn TextExtractor>, permits: Arc<Semaphore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            extractor,
            permits,
            timeout: Duration::from_secs(30),
        }
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    async fn fetch_text(&self, sku: &str, link: &str) -> String {
        let download_url = if link.contains("drive.google.com") {
            log::info!("Converting Google Drive link for SKU {}", sku);
            match convert_drive_url(link) {
                Some(url) => url,
                None => {
                    log::error!("Could not extract the file id from the link for SKU {}", sku);
                    return String::new();
                }
            }
        } else {
            link.to_string()
        };

        let _permit = self.permits.acquire().await.expect("download pool closed");
        log::info!("Downloading document for SKU {}", sku);

        let response = match self
            .client
            .get(&download_url)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                log::error!("Download failed for SKU {}: {}", sku, r.status());
                return String::new();
            }
            Err(e) => {
                log::error!("Download error for SKU {}: {}", sku, e);
                return String::new();
            }
        };

        match response.bytes().await {
            Ok(bytes) => self.extractor.extract_text(&bytes),
            Err(e) => {
                log::error!("Failed to read document body for SKU {}: {}", sku, e);
                String::new()
            }
        }
    }
}
