//! articlevec Vector Search Engine
//!
//! Embedding generation for pending articles, nearest-neighbour search and
//! embedding coverage reporting

mod batcher;
pub mod normalize;
mod search;
mod status;
mod types;

pub use batcher::EmbeddingBatcher;
pub use normalize::normalize;
pub use search::SimilaritySearcher;
pub use status::StatusReporter;
pub use types::{EmbedStats, StatusReport};
