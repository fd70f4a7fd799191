//! Learning stores - strategy ledger and success memory
//!
//! Both are small file-backed JSON stores read whole and written whole,
//! under a single-writer assumption (callers serialize access).

pub mod memory;
pub mod strategy;

pub use memory::{MemoryEntry, SuccessMemory};
pub use strategy::{StrategyLedger, StrategyRecord};
