//! SEO research - query simplification and bounded search fan-out
//!
//! The search backend is rate-limited independently of the generation
//! backend, so every outgoing search holds a permit from a dedicated pool
//! (default cap 5) owned by the caller, not by a process-wide global.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;
use tokio::sync::Semaphore;

use crate::search::client::SearchClient;

/// Patterns stripped from product names before they are used as search
/// queries: dosages, pack sizes, pharmaceutical forms, leftover SKU noise.
fn name_noise_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)\s+\d+(\.\d+)?(mg|g|mcg|ui|ml|l)(/\w+)?",
            r"(?i)\s+-\s+Caixa.*",
            r"(?i)\s+com\s+\d+\s+.*",
            r"(?i)\s+\d+\s+(Cápsulas|Comprimidos|Drágeas|Seringas|Envelopes)\b.*",
            r"(?i)\s+(Gotas|Xarope|Solução Oral|Suspensão nasal|Pomada|Creme|Gel)\b.*",
            r"(?i)\s+\(Refil\)",
            r"(?i)\s+FPS\s*\d+",
            r"(?i)LH-01",
            r"(?i)500ML",
            r"(?i)\s+\d+MG\b",
            r"(?i)\s+-\s+\d+\s+.*",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

/// Reduce a full catalog product name to its searchable base form.
///
/// Strips dosage/pack/form suffixes and appends the brand when it is not
/// already part of the name. Falls back to the full name if stripping leaves
/// nothing usable.
pub fn base_product_name(product_name_full: &str, brand: Option<&str>) -> String {
    let mut base_name = product_name_full.to_string();

    for pattern in name_noise_patterns() {
        base_name = pattern.replace_all(&base_name, "").to_string();
    }

    base_name = base_name.trim().trim_end_matches('-').trim().to_string();

    if let Some(brand) = brand {
        if !brand.is_empty() && !base_name.to_lowercase().contains(&brand.to_lowercase()) {
            base_name = format!("{} {}", base_name, brand);
        }
    }

    if base_name.len() > 3 {
        log::info!("Base name for search: '{}'", base_name);
        base_name
    } else {
        product_name_full.to_string()
    }
}

const NO_QUESTIONS_FOUND: &str = "No relevant frequently asked questions found in search.";
const NO_TOPICS_FOUND: &str = "No related keywords found in search.";

/// Runs FAQ and related-topic research against the search backend, bounded
/// by a shared permit pool.
pub struct SeoResearcher {
    search: Arc<dyn SearchClient>,
    permits: Arc<Semaphore>,
}

impl SeoResearcher {
    /// Create a researcher over a search backend and a shared permit pool
    pub fn new(search: Arc<dyn SearchClient>, permits: Arc<Semaphore>) -> Self {
        Self { search, permits }
    }

    /// Search for "people also ask"-style questions about a product.
    ///
    /// Issues three query variations and merges their related questions,
    /// deduplicated in first-seen order.
    pub async fn people_also_ask(&self, product_name: &str, brand: Option<&str>) -> String {
        let base = base_product_name(product_name, brand);
        log::info!("Running FAQ research for '{}'", base);

        let queries = vec![
            format!("frequently asked questions about {}", base),
            format!("how to use {}", base),
            format!("what is {} for", base),
        ];

        let results = {
            let _permit = self.permits.acquire().await.expect("search pool closed");
            log::info!("Search permit acquired for FAQ research: {}", base);
            self.search.search(&queries).await
        };

        let mut seen = std::collections::HashSet::new();
        let mut questions = Vec::new();
        for result in &results {
            for question in &result.related_questions {
                if !question.is_empty() && seen.insert(question.clone()) {
                    questions.push(question.clone());
                }
            }
        }

        if questions.is_empty() {
            log::warn!("No FAQ questions found for '{}'", base);
            return NO_QUESTIONS_FOUND.to_string();
        }

        questions
            .iter()
            .map(|q| format!("- {}", q))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Search for related keyword topics about a product.
    pub async fn related_topics(&self, product_name: &str, brand: Option<&str>) -> String {
        let base = base_product_name(product_name, brand);
        log::info!("Running related-topics research for '{}'", base);

        let queries = vec![format!("topics about {}", base)];

        let results = {
            let _permit = self.permits.acquire().await.expect("search pool closed");
            log::info!("Search permit acquired for related topics: {}", base);
            self.search.search(&queries).await
        };

        let topics: Vec<String> = results
            .first()
            .map(|r| {
                r.related_searches
                    .iter()
                    .filter(|s| !s.is_empty())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if topics.is_empty() {
            log::warn!("No related topics found for '{}'", base);
            return NO_TOPICS_FOUND.to_string();
        }

        topics.join(", ")
    }

    /// Run both research passes with a short pause between them, the way
    /// the search quota expects.
    pub async fn research(&self, product_name: &str, brand: Option<&str>) -> (String, String) {
        let faq = self.people_also_ask(product_name, brand).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        let topics = self.related_topics(product_name, brand).await;
        (faq, topics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::client::{SearchClient, SearchResults};
    use async_trait::async_trait;

    #[test]
    fn test_base_name_strips_dosage() {
        assert_eq!(base_product_name("Dipirona 500mg", None), "Dipirona");
    }

    #[test]
    fn test_base_name_strips_pack_size() {
        let name = base_product_name("Amoxicilina 500mg - Caixa com 21 Cápsulas", None);
        assert_eq!(name, "Amoxicilina");
    }

    #[test]
    fn test_base_name_strips_pharmaceutical_form() {
        let name = base_product_name("Paracetamol Gotas 200mg/ml", None);
        assert_eq!(name, "Paracetamol");
    }

    #[test]
    fn test_base_name_appends_missing_brand() {
        let name = base_product_name("Protetor Solar FPS 60", Some("SunCare"));
        assert_eq!(name, "Protetor Solar SunCare");
    }

    #[test]
    fn test_base_name_keeps_existing_brand() {
        let name = base_product_name("SunCare Protetor Solar FPS 60", Some("suncare"));
        assert_eq!(name, "SunCare Protetor Solar");
    }

    #[test]
    fn test_base_name_falls_back_when_overstripped() {
        // Everything stripped away leaves too little; fall back to the input
        let name = base_product_name("Gel", None);
        assert_eq!(name, "Gel");
    }

    #[test]
    fn test_base_name_empty_brand_not_appended() {
        let name = base_product_name("Vitamina C 1g", Some(""));
        assert_eq!(name, "Vitamina C");
    }

    struct ScriptedSearch {
        related: Vec<String>,
    }

    #[async_trait]
    impl SearchClient for ScriptedSearch {
        async fn search(&self, queries: &[String]) -> Vec<SearchResults> {
            queries
                .iter()
                .map(|q| SearchResults {
                    query: q.clone(),
                    items: vec![],
                    related_questions: self.related.clone(),
                    related_searches: self.related.clone(),
                })
                .collect()
        }
    }

    fn researcher(related: Vec<String>) -> SeoResearcher {
        SeoResearcher::new(
            Arc::new(ScriptedSearch { related }),
            Arc::new(Semaphore::new(5)),
        )
    }

    #[tokio::test]
    async fn test_people_also_ask_formats_and_dedupes() {
        let seo = researcher(vec![
            "how often to apply".to_string(),
            "how often to apply".to_string(),
            "is it safe".to_string(),
        ]);

        let faq = seo.people_also_ask("Retinol Serum", None).await;
        assert_eq!(faq, "- how often to apply\n- is it safe");
    }

    #[tokio::test]
    async fn test_people_also_ask_empty_fallback() {
        let seo = researcher(vec![]);
        let faq = seo.people_also_ask("Retinol Serum", None).await;
        assert_eq!(faq, NO_QUESTIONS_FOUND);
    }

    #[tokio::test]
    async fn test_related_topics_joined() {
        let seo = researcher(vec!["retinol".to_string(), "anti aging".to_string()]);
        let topics = seo.related_topics("Retinol Serum", None).await;
        assert_eq!(topics, "retinol, anti aging");
    }

    #[tokio::test]
    async fn test_related_topics_empty_fallback() {
        let seo = researcher(vec![]);
        let topics = seo.related_topics("Retinol Serum", None).await;
        assert_eq!(topics, NO_TOPICS_FOUND);
    }

    /// Search double that records the maximum number of concurrent holders
    struct CountingSearch {
        current: Arc<std::sync::atomic::AtomicUsize>,
        peak: Arc<std::sync::atomic::AtomicUsize>,
    }

    #[async_trait]
    impl SearchClient for CountingSearch {
        async fn search(&self, queries: &[String]) -> Vec<SearchResults> {
            use std::sync::atomic::Ordering;
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            queries.iter().map(|q| SearchResults::empty(q.as_str())).collect()
        }
    }

    #[tokio::test]
    async fn test_search_permit_bounds_concurrency() {
        let current = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let peak = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let search = Arc::new(CountingSearch {
            current: current.clone(),
            peak: peak.clone(),
        });
        let permits = Arc::new(Semaphore::new(2));

        let mut handles = Vec::new();
        for i in 0..6 {
            let seo = SeoResearcher::new(search.clone(), permits.clone());
            handles.push(tokio::spawn(async move {
                seo.related_topics(&format!("Product {}", i), None).await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(std::sync::atomic::Ordering::SeqCst) <= 2);
    }
}
