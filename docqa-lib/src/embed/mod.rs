//! Text embedding using local models
//!
//! Uses sentence-transformers/all-MiniLM-L6-v2 via the fastembed crate (ONNX
//! runtime).
//!
//! # Model Details
//!
//! - Dimensions: 384
//! - Max tokens: 256
//! - Same transformation for documents and queries (no query prefix)
//!
//! # Usage
//!
//! ```ignore
//! use docqa_lib::embed::{Embedder, FastEmbedder};
//!
//! // Construct once at startup; the model loads on first use.
//! let embedder = FastEmbedder::new();
//!
//! let doc_embeddings = embedder.embed_documents(&["First chunk...", "Second chunk..."])?;
//! let query_embedding = embedder.embed_query("What is the recommended dose?")?;
//! ```

use crate::Result;

/// A vector embedding - fixed size array of floats
pub type Embedding = Vec<f32>;

/// Trait for text embedding models
///
/// Implementations must apply the identical transformation in
/// [`embed_documents`](Embedder::embed_documents) and
/// [`embed_query`](Embedder::embed_query), otherwise query-to-chunk distances
/// are meaningless.
pub trait Embedder: Send + Sync {
    /// Embed multiple documents for indexing
    ///
    /// Returns exactly one vector per input, in input order. An empty input
    /// yields an empty output without touching the model.
    fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Embed a single query for searching
    fn embed_query(&self, text: &str) -> Result<Embedding>;

    /// Returns the embedding dimension
    fn dimension(&self) -> usize;

    /// Returns the model name/identifier
    fn model_name(&self) -> &str;
}

mod fast;
pub use fast::*;

#[cfg(test)]
pub(crate) mod testing;
