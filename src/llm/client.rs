//! Core generation client trait and error taxonomy

use std::time::Duration;

use async_trait::async_trait;

/// Stateless generation client - each call is independent (fresh context)
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Single generation request (blocking until complete)
    ///
    /// Returns the model's text output. Safety filters are relaxed by the
    /// implementation so that drug-leaflet vocabulary is not blocked.
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, LlmError>;
}

/// Errors that can occur during generation calls
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Empty response from the API")]
    EmptyResponse,

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing API key: environment variable {env_var} not set")]
    MissingApiKey { env_var: String },
}

impl LlmError {
    /// Transient failures are retried with backoff; everything else aborts.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::Unavailable(_) => true,
            LlmError::DeadlineExceeded(_) => true,
            LlmError::EmptyResponse => true,
            LlmError::ApiError { status, .. } => *status >= 500,
            LlmError::Network(e) => e.is_timeout() || e.is_connect(),
            LlmError::InvalidResponse(_) => false,
            LlmError::MissingApiKey { .. } => false,
        }
    }
}

/// Mock client for tests - replays scripted outcomes in order.
///
/// Once the script is exhausted the last outcome repeats.
pub struct MockGenerativeClient {
    responses: std::sync::Mutex<Vec<Result<String, LlmError>>>,
    calls: std::sync::atomic::AtomicUsize,
}

impl MockGenerativeClient {
    /// Create a mock that replays the given outcomes in order
    pub fn new(responses: Vec<Result<String, LlmError>>) -> Self {
        let mut responses = responses;
        responses.reverse();
        Self {
            responses: std::sync::Mutex::new(responses),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Create a mock that always returns the same text
    pub fn always(text: impl Into<String>) -> Self {
        Self::new(vec![Ok(text.into())])
    }

    /// Number of generate calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeClient for MockGenerativeClient {
    async fn generate(&self, _prompt: &str, _timeout: Duration) -> Result<String, LlmError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        if responses.len() > 1 {
            responses.pop().unwrap()
        } else {
            match responses.last() {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(_)) => Err(LlmError::Unavailable("scripted failure".to_string())),
                None => Err(LlmError::EmptyResponse),
            }
        }
    }
}
