//! Specialized agents - generator, auditor, refiner per product domain
//!
//! Each agent is a pure transformation from product context to structured
//! content, built on the same chain: render a named template, execute it
//! with retries, extract JSON from the response. The domain (medicine vs
//! beauty) is selected once at pipeline start behind the `DomainAgents`
//! trait; adding a domain means adding one more implementation, not more
//! branches at the call sites.

pub mod beauty;
pub mod medicine;
pub mod sensitive_terms;
pub mod types;

use async_trait::async_trait;

pub use beauty::BeautyAgents;
pub use medicine::MedicineAgents;
pub use sensitive_terms::identify_sensitive_terms;
pub use types::{AuditResult, GeneratedContent, ProductInfo};

/// Product domain handled by a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Medicine,
    Beauty,
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductType::Medicine => write!(f, "medicine"),
            ProductType::Beauty => write!(f, "beauty"),
        }
    }
}

/// The three-agent capability set of one product domain.
///
/// Contracts (enforced by every implementation):
/// - `prepare` runs once before the loop; an Err is a terminal error for
///   the item, while internal degradation (e.g. an empty blacklist) is not.
/// - `generate` may fail: None means the attempt produced nothing usable.
/// - `audit` never fails: it falls back to a zero-score result.
/// - `refine` never fails and is never worse than the status quo by
///   construction: it falls back to returning the previous content.
#[async_trait]
pub trait DomainAgents: Send + Sync {
    /// Domain-specific preprocessing: validate required inputs and enrich
    /// the product context once, before any attempt runs
    async fn prepare(&self, product_name: &str, info: ProductInfo) -> Result<ProductInfo, String>;

    /// Produce first-draft content for a product
    async fn generate(&self, product_name: &str, info: &ProductInfo) -> Option<GeneratedContent>;

    /// Score a full content object against the domain rubric
    async fn audit(&self, content: &GeneratedContent) -> AuditResult;

    /// Improve previous content using the prior audit feedback
    async fn refine(
        &self,
        product_name: &str,
        info: &ProductInfo,
        previous: &GeneratedContent,
        feedback: &AuditResult,
    ) -> GeneratedContent;
}
