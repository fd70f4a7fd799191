//! PharmaBoost - catalog content generation with an iterative quality loop
//!
//! PharmaBoost generates product-listing content (titles, meta descriptions,
//! HTML bodies) for pharmacy and beauty catalog items. Each item runs through
//! a bounded generate -> audit -> refine loop that tracks the best-scoring
//! attempt, and a batch coordinator fans the loop out over many items with
//! bounded concurrency and per-item failure isolation.

pub mod agents;
pub mod batch;
pub mod config;
pub mod error;
pub mod html;
pub mod learning;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod search;

pub use error::{PharmaBoostError, Result};
