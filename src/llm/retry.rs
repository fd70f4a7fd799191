//! Bounded exponential-backoff execution of generation calls
//!
//! Failure is signaled by None, never by an error: agents built on top of
//! this layer fall back to their own defaults instead of propagating.

use std::time::Duration;

use crate::llm::client::GenerativeClient;

/// Retry policy for generation calls.
///
/// Backoff starts at `initial_backoff`, doubles per transient failure, and
/// is capped at `max_backoff`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with a custom retry budget
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }
}

/// Execute a prompt with bounded exponential backoff.
///
/// One generation call per attempt. Transient failures (rate limit, deadline,
/// unavailability, empty text) sleep and retry; fatal failures abort
/// immediately. Exhausting the budget returns None.
pub async fn execute_with_backoff(
    client: &dyn GenerativeClient,
    prompt: &str,
    policy: &RetryPolicy,
    timeout: Duration,
) -> Option<String> {
    let mut wait = policy.initial_backoff;

    for attempt in 1..=policy.max_retries {
        log::info!("Sending prompt (attempt {}/{})", attempt, policy.max_retries);

        match client.generate(prompt, timeout).await {
            Ok(text) => return Some(text),
            Err(e) if e.is_retryable() => {
                log::warn!(
                    "Attempt {} failed ({}). Waiting {}s before retry",
                    attempt,
                    e,
                    wait.as_secs()
                );
                tokio::time::sleep(wait).await;
                wait = (wait * 2).min(policy.max_backoff);
            }
            Err(e) => {
                log::error!("Unexpected error calling the generation API: {}", e);
                return None;
            }
        }
    }

    log::error!("Retry budget exhausted after {} attempts", policy.max_retries);
    None
}
