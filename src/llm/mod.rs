//! Generation backend layer - Gemini API integration with retry and extraction
//!
//! This module provides:
//! - GenerativeClient trait for API abstraction
//! - GeminiClient implementation
//! - Bounded exponential-backoff retry execution
//! - Structured JSON extraction from free-form model text

pub mod client;
pub mod extract;
pub mod gemini;
pub mod retry;

pub use client::{GenerativeClient, LlmError, MockGenerativeClient};
pub use extract::extract_json;
pub use gemini::{GeminiClient, GeminiConfig};
pub use retry::{execute_with_backoff, RetryPolicy};
