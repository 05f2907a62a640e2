use tracing::{info, warn};

use crate::chunk::{Chunk, ChunkMetadata, Chunker};
use crate::embed::Embedder;
use crate::index::{FlatIndex, VectorIndex};
use crate::retrieve::Retrieved;
use crate::{Error, Result};

/// A processed document: its chunks and the index over their embeddings.
///
/// Both halves are produced together by [`KnowledgeBase::build`] and cannot be
/// replaced separately, so index position `i` is always chunk `i`. The
/// embedding model is recorded so queries are embedded by the same model.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    chunks: Vec<Chunk>,
    index: FlatIndex,
    model: String,
}

impl KnowledgeBase {
    /// Chunk, embed and index `text`.
    ///
    /// A document with no words produces an empty knowledge base; retrieving
    /// from it fails with [`Error::EmptyCorpus`].
    pub fn build<C, E>(text: &str, chunker: &C, embedder: &E) -> Result<Self>
    where
        C: Chunker + ?Sized,
        E: Embedder + ?Sized,
    {
        Self::build_with_metadata(text, chunker, embedder, ChunkMetadata::default())
    }

    /// Like [`build`](Self::build), attaching `metadata` to every chunk.
    pub fn build_with_metadata<C, E>(
        text: &str,
        chunker: &C,
        embedder: &E,
        metadata: ChunkMetadata,
    ) -> Result<Self>
    where
        C: Chunker + ?Sized,
        E: Embedder + ?Sized,
    {
        let chunks = chunker.chunk(text, metadata);
        Self::from_chunks(chunks, embedder)
    }

    /// Embed and index already-chunked text.
    pub fn from_chunks<E>(chunks: Vec<Chunk>, embedder: &E) -> Result<Self>
    where
        E: Embedder + ?Sized,
    {
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = embedder.embed_documents(&texts)?;
        if embeddings.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let index = FlatIndex::build(&embeddings)?;
        if !index.is_empty() && index.dimension() != embedder.dimension() {
            return Err(Error::DimensionMismatch {
                expected: embedder.dimension(),
                actual: index.dimension(),
            });
        }

        info!(
            chunks = chunks.len(),
            model = embedder.model_name(),
            "indexed document"
        );
        Ok(Self {
            chunks,
            index,
            model: embedder.model_name().to_string(),
        })
    }

    /// Return the `k` chunks nearest to `query`, nearest first.
    ///
    /// `k` larger than the number of chunks returns every chunk.
    pub fn retrieve<E>(&self, query: &str, embedder: &E, k: usize) -> Result<Vec<Retrieved>>
    where
        E: Embedder + ?Sized,
    {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".to_string()));
        }
        self.check_model(embedder)?;
        if self.chunks.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        if k > self.chunks.len() {
            warn!(
                requested = k,
                available = self.chunks.len(),
                "fewer chunks than requested, returning all"
            );
        }

        let query_embedding = embedder.embed_query(query)?;
        let neighbors = self.index.search(&query_embedding, k)?;

        neighbors
            .into_iter()
            .map(|n| {
                let chunk = self.chunks.get(n.position).ok_or(Error::IndexCorpusMismatch {
                    index: self.index.len(),
                    chunks: self.chunks.len(),
                })?;
                Ok(Retrieved {
                    content: chunk.content.clone(),
                    position: n.position,
                    distance: n.distance,
                })
            })
            .collect()
    }

    /// Fail unless `embedder` is the model the chunks were embedded with.
    pub fn check_model<E>(&self, embedder: &E) -> Result<()>
    where
        E: Embedder + ?Sized,
    {
        if embedder.model_name() != self.model {
            return Err(Error::InvalidArgument(format!(
                "knowledge base was embedded with {}, not {}",
                self.model,
                embedder.model_name()
            )));
        }
        Ok(())
    }

    /// Name of the model the chunks were embedded with.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The document's chunks in order.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The index over the chunk embeddings.
    #[must_use]
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    /// Returns the number of chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if the document produced no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
