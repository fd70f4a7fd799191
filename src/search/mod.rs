//! Search backend layer - keyword and FAQ research for the beauty pipeline

pub mod client;
pub mod seo;

pub use client::{GoogleSearchClient, SearchClient, SearchResults};
pub use seo::{base_product_name, SeoResearcher};
