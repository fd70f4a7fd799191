//! Medicine domain agents
//!
//! Pharmaceutical content is generated from extracted leaflet text and a
//! dynamically identified blacklist of regulatory terms (see
//! `sensitive_terms`). Prompts lean on the full leaflet, so the per-call
//! timeouts are generous.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::agents::sensitive_terms::identify_sensitive_terms;
use crate::agents::types::{AuditResult, GeneratedContent, ProductInfo};
use crate::agents::DomainAgents;
use crate::llm::{execute_with_backoff, extract_json, GenerativeClient, RetryPolicy};
use crate::prompt::PromptStore;

const GENERATOR_TEMPLATE: &str = "medicine_generator";
const AUDITOR_TEMPLATE: &str = "seo_auditor";
const REFINER_TEMPLATE: &str = "quality_refiner";

const GENERATOR_TIMEOUT: Duration = Duration::from_secs(180);
const AUDITOR_TIMEOUT: Duration = Duration::from_secs(180);
const REFINER_TIMEOUT: Duration = Duration::from_secs(180);

/// Templates the medicine pipeline requires at startup
pub const REQUIRED_TEMPLATES: &[&str] = &[
    GENERATOR_TEMPLATE,
    AUDITOR_TEMPLATE,
    REFINER_TEMPLATE,
    super::sensitive_terms::TEMPLATE,
];

/// Agent set for pharmaceutical products
pub struct MedicineAgents {
    client: Arc<dyn GenerativeClient>,
    prompts: Arc<PromptStore>,
    retry: RetryPolicy,
}

impl MedicineAgents {
    pub fn new(client: Arc<dyn GenerativeClient>, prompts: Arc<PromptStore>, retry: RetryPolicy) -> Self {
        Self {
            client,
            prompts,
            retry,
        }
    }

    async fn call(&self, template: &str, context: &serde_json::Value, timeout: Duration) -> Option<serde_json::Value> {
        let prompt = match self.prompts.render(template, context) {
            Ok(prompt) => prompt,
            Err(e) => {
                log::error!("Failed to render template '{}': {}", template, e);
                return None;
            }
        };
        let response = execute_with_backoff(self.client.as_ref(), &prompt, &self.retry, timeout).await?;
        extract_json(&response)
    }
}

#[async_trait]
impl DomainAgents for MedicineAgents {
    async fn prepare(&self, product_name: &str, mut info: ProductInfo) -> Result<ProductInfo, String> {
        let leaflet_text = info
            .leaflet_text()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| "Leaflet text not found for the medicine pipeline.".to_string())?
            .to_string();

        info.set(
            "base_name",
            crate::search::base_product_name(product_name, info.brand()),
        );

        log::info!("Analyzing leaflet for sensitive terms: {}", product_name);
        let blacklist =
            identify_sensitive_terms(self.client.as_ref(), &self.prompts, &self.retry, &leaflet_text).await;
        info.set("dynamic_blacklist", json!(blacklist));

        Ok(info)
    }

    async fn generate(&self, product_name: &str, info: &ProductInfo) -> Option<GeneratedContent> {
        let context = info.render_context(&[("product_name", json!(product_name))]);
        let value = self.call(GENERATOR_TEMPLATE, &context, GENERATOR_TIMEOUT).await?;
        GeneratedContent::from_value(value)
    }

    async fn audit(&self, content: &GeneratedContent) -> AuditResult {
        let context = json!({
            "full_page_json": content.to_value().to_string(),
        });

        match self.call(AUDITOR_TEMPLATE, &context, AUDITOR_TIMEOUT).await {
            Some(value) => AuditResult::from_value(value)
                .unwrap_or_else(|| AuditResult::failed("Audit response was not an object.")),
            None => AuditResult::failed("Audit failed."),
        }
    }

    async fn refine(
        &self,
        product_name: &str,
        info: &ProductInfo,
        previous: &GeneratedContent,
        feedback: &AuditResult,
    ) -> GeneratedContent {
        let context = info.render_context(&[
            ("product_name", json!(product_name)),
            ("previous_json", json!(previous.to_value().to_string())),
            ("previous_audit", json!(feedback.to_value().to_string())),
        ]);

        match self.call(REFINER_TEMPLATE, &context, REFINER_TIMEOUT).await {
            Some(value) => GeneratedContent::from_value(value).unwrap_or_else(|| previous.clone()),
            None => previous.clone(),
        }
    }
}
