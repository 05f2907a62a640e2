//! Document chunking
//!
//! A document is split into overlapping windows of whitespace-delimited
//! words. Each window becomes a [`Chunk`], tagged with its ordinal position so
//! that search results can be mapped back to text.
//!
//! # Usage
//!
//! ```ignore
//! use docqa_lib::chunk::{Chunker, ChunkMetadata, WordWindowChunker};
//!
//! let chunker = WordWindowChunker::new(500, 50)?;
//! let chunks = chunker.chunk(&document, ChunkMetadata::default());
//! ```

use serde::{Deserialize, Serialize};

/// A chunk of text with its metadata
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Chunk {
    /// Content hash of this chunk
    pub id: String,
    /// The window's words joined by single spaces
    pub content: String,
    /// Metadata about the source and position
    pub metadata: ChunkMetadata,
}

/// Metadata associated with a chunk
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct ChunkMetadata {
    /// Source document identifier
    pub source_id: Option<String>,
    /// Ordinal of this chunk within the source document (0-indexed)
    pub position: usize,
    /// Index of the chunk's first word in the document's word sequence
    pub word_offset: usize,
    /// Number of words in this chunk
    pub word_count: usize,
    /// Total number of chunks from this source
    pub total_chunks: Option<usize>,
}

/// Trait for document chunking strategies
pub trait Chunker: Send + Sync {
    /// Split content into chunks
    ///
    /// # Arguments
    /// * `content` - The text content to chunk
    /// * `metadata` - Base metadata to attach to each chunk
    ///
    /// # Returns
    /// Chunks in document order; `chunks[i].metadata.position == i`
    fn chunk(&self, content: &str, metadata: ChunkMetadata) -> Vec<Chunk>;

    /// Returns the name of this chunking strategy
    fn name(&self) -> &str;
}

mod window;

pub use window::*;
