//! Gemini API client implementation
//!
//! This module implements the GenerativeClient trait for the Google Gemini
//! REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::llm::client::{GenerativeClient, LlmError};

/// Gemini API base URL
const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Default model to use
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Configuration for the Gemini client
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub model: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl GeminiConfig {
    /// Create a new config with a specific model
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }
}

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a new Gemini client
    ///
    /// Reads GEMINI_API_KEY from environment
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| LlmError::MissingApiKey {
            env_var: "GEMINI_API_KEY".to_string(),
        })?;

        Self::with_api_key(api_key, config)
    }

    /// Create a client with an explicit API key
    pub fn with_api_key(api_key: String, config: GeminiConfig) -> Result<Self, LlmError> {
        // Default deadline; generate() overrides it per request
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    /// Build the request body for the Gemini API
    ///
    /// Safety categories are set to BLOCK_NONE so drug-leaflet vocabulary
    /// does not trip the default filters.
    fn build_request(&self, prompt: &str) -> Value {
        let safety_settings: Vec<Value> = [
            "HARM_CATEGORY_HARASSMENT",
            "HARM_CATEGORY_HATE_SPEECH",
            "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            "HARM_CATEGORY_DANGEROUS_CONTENT",
        ]
        .iter()
        .map(|category| {
            json!({
                "category": category,
                "threshold": "BLOCK_NONE"
            })
        })
        .collect();

        json!({
            "contents": [
                {
                    "parts": [
                        { "text": prompt }
                    ]
                }
            ],
            "safetySettings": safety_settings
        })
    }

    /// Parse the API response into plain text
    ///
    /// Concatenates the text parts of the first candidate. An answer with no
    /// text parts maps to EmptyResponse so the retry layer treats it as
    /// transient.
    fn parse_response(&self, body: Value) -> Result<String, LlmError> {
        let mut text = String::new();

        if let Some(parts) = body["candidates"][0]["content"]["parts"].as_array() {
            for part in parts {
                if let Some(chunk) = part["text"].as_str() {
                    text.push_str(chunk);
                }
            }
        }

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        Ok(text)
    }

    /// Send a request to the Gemini API
    async fn send_request(&self, body: Value, timeout: Duration) -> Result<Value, LlmError> {
        let url = format!(
            "{}/{}:generateContent",
            GEMINI_API_URL, self.config.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::DeadlineExceeded(timeout)
                } else {
                    LlmError::Network(e)
                }
            })?;

        let status = response.status();

        // Handle rate limiting
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(LlmError::RateLimited {
                retry_after: Duration::from_secs(retry_after),
            });
        }

        // Upstream overload / maintenance
        if status.is_server_error() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Unavailable(format!("{}: {}", status, error_body)));
        }

        // Handle other errors
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message: error_body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    /// Get the configured model name
    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, LlmError> {
        let body = self.build_request(prompt);
        let response = self.send_request(body, timeout).await?;
        self.parse_response(response)
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.config.model)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = GeminiConfig::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_config_with_model() {
        let config = GeminiConfig::with_model("gemini-2.5-pro");
        assert_eq!(config.model, "gemini-2.5-pro");
    }

    #[test]
    fn test_client_with_api_key() {
        let client = GeminiClient::with_api_key("test-key".to_string(), GeminiConfig::default());
        assert!(client.is_ok());
        assert_eq!(client.unwrap().model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_build_request_includes_prompt() {
        let client =
            GeminiClient::with_api_key("test-key".to_string(), GeminiConfig::default()).unwrap();

        let body = client.build_request("Write a title");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Write a title");
    }

    #[test]
    fn test_build_request_relaxes_safety() {
        let client =
            GeminiClient::with_api_key("test-key".to_string(), GeminiConfig::default()).unwrap();

        let body = client.build_request("prompt");
        let settings = body["safetySettings"].as_array().unwrap();
        assert_eq!(settings.len(), 4);
        for setting in settings {
            assert_eq!(setting["threshold"], "BLOCK_NONE");
        }
    }

    #[test]
    fn test_parse_response_text() {
        let client =
            GeminiClient::with_api_key("test-key".to_string(), GeminiConfig::default()).unwrap();

        let api_response = json!({
            "candidates": [
                {
                    "content": {
                        "parts": [
                            { "text": "Hello " },
                            { "text": "world" }
                        ]
                    }
                }
            ]
        });

        let text = client.parse_response(api_response).unwrap();
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn test_parse_response_empty_is_transient() {
        let client =
            GeminiClient::with_api_key("test-key".to_string(), GeminiConfig::default()).unwrap();

        let api_response = json!({ "candidates": [] });
        let result = client.parse_response(api_response);
        assert!(matches!(result, Err(LlmError::EmptyResponse)));
    }

    #[test]
    fn test_parse_response_blank_text_is_transient() {
        let client =
            GeminiClient::with_api_key("test-key".to_string(), GeminiConfig::default()).unwrap();

        let api_response = json!({
            "candidates": [
                { "content": { "parts": [ { "text": "   " } ] } }
            ]
        });
        let result = client.parse_response(api_response);
        assert!(matches!(result, Err(LlmError::EmptyResponse)));
    }

    #[test]
    fn test_debug_impl_hides_api_key() {
        let client =
            GeminiClient::with_api_key("secret-key".to_string(), GeminiConfig::default()).unwrap();
        let debug_str = format!("{:?}", client);
        assert!(debug_str.contains("GeminiClient"));
        assert!(!debug_str.contains("secret-key"));
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GeminiClient>();
    }
}
