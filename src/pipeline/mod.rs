//! Quality pipeline - event stream types and the bounded refine loop

pub mod event;
pub mod quality_loop;

pub use event::{BatchEvent, LogLevel};
pub use quality_loop::{DoneData, LoopOutcome, QualityLoop};
