//! Batch processing - bounded fan-out of the quality loop over catalog rows

pub mod coordinator;
pub mod fetch;
pub mod pools;
pub mod row;

pub use coordinator::{BatchCoordinator, BatchSource};
pub use fetch::{DocumentSource, HttpDocumentSource, PlainTextExtractor, TextExtractor};
pub use pools::ResourcePools;
pub use row::{BatchItemOutcome, BatchSummary, Catalog, CatalogEntry, CatalogRow};
