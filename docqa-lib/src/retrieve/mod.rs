//! High-level retrieval interface
//!
//! Combines chunker, embedder and index into a unified retrieval API.
//!
//! # Usage
//!
//! ```ignore
//! use docqa_lib::retrieve::Retriever;
//!
//! let mut retriever = Retriever::new(embedder, chunker);
//! retriever.process(&document_text)?;
//! let passages = retriever.retrieve("What are the side effects?", 3)?;
//! ```

use tracing::{debug, info};

use crate::chunk::{Chunk, Chunker, WordWindowChunker};
use crate::embed::Embedder;
use crate::index::VectorIndex;
use crate::{Error, Result};

/// A retrieved chunk with its rank information
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieved {
    /// The chunk text
    pub content: String,
    /// Ordinal position of the chunk in its document
    pub position: usize,
    /// Squared Euclidean distance to the query (lower is closer)
    pub distance: f32,
}

/// Default number of chunks handed to the answer composer.
pub const DEFAULT_TOP_K: usize = 3;

/// Return the texts of the `k` chunks nearest to `query`, nearest first.
///
/// For callers holding an index and its chunk list separately. The two must
/// have been built together; a length disagreement fails with
/// [`Error::IndexCorpusMismatch`] instead of returning the wrong text.
pub fn retrieve<E, I>(
    query: &str,
    embedder: &E,
    index: &I,
    chunks: &[Chunk],
    k: usize,
) -> Result<Vec<String>>
where
    E: Embedder + ?Sized,
    I: VectorIndex + ?Sized,
{
    if k == 0 {
        return Err(Error::InvalidArgument("k must be at least 1".to_string()));
    }
    if index.len() != chunks.len() {
        return Err(Error::IndexCorpusMismatch {
            index: index.len(),
            chunks: chunks.len(),
        });
    }
    if index.is_empty() {
        return Err(Error::EmptyIndex);
    }

    let query_embedding = embedder.embed_query(query)?;
    let neighbors = index.search(&query_embedding, k)?;
    debug!(k, results = neighbors.len(), "retrieved chunks");

    Ok(neighbors
        .into_iter()
        .map(|n| chunks[n.position].content.clone())
        .collect())
}

mod knowledge;

pub use knowledge::*;

/// Owns the embedder and the currently loaded document.
///
/// Processing a new document builds a complete [`KnowledgeBase`] before
/// replacing the current one, so a failed or in-progress build never leaves
/// a partially indexed document visible to queries.
pub struct Retriever<E: Embedder, C: Chunker = WordWindowChunker> {
    embedder: E,
    chunker: C,
    current: Option<KnowledgeBase>,
}

impl<E: Embedder> Retriever<E, WordWindowChunker> {
    /// Create a retriever with the default 500/50 word windows.
    #[must_use]
    pub fn with_default_chunker(embedder: E) -> Self {
        Self::new(embedder, WordWindowChunker::default())
    }
}

impl<E: Embedder, C: Chunker> Retriever<E, C> {
    /// Create a retriever with no document loaded.
    #[must_use]
    pub fn new(embedder: E, chunker: C) -> Self {
        Self {
            embedder,
            chunker,
            current: None,
        }
    }

    /// Chunk, embed and index `text`, replacing any loaded document.
    ///
    /// On error the previously loaded document is kept. Returns the number of
    /// chunks created.
    pub fn process(&mut self, text: &str) -> Result<usize> {
        let kb = KnowledgeBase::build(text, &self.chunker, &self.embedder)?;
        let count = kb.len();
        self.current = Some(kb);
        info!(chunks = count, chunker = self.chunker.name(), "document loaded");
        Ok(count)
    }

    /// Install an already built knowledge base.
    ///
    /// The knowledge base must have been embedded with this retriever's model.
    pub fn load(&mut self, kb: KnowledgeBase) -> Result<()> {
        kb.check_model(&self.embedder)?;
        self.current = Some(kb);
        Ok(())
    }

    /// Drop the loaded document and its index.
    pub fn clear(&mut self) {
        if self.current.take().is_some() {
            info!("document cleared");
        }
    }

    /// Return the `k` chunks of the loaded document nearest to `query`.
    ///
    /// Fails with [`Error::EmptyCorpus`] if no document is loaded or the
    /// document had no words.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Retrieved>> {
        let kb = self.current.as_ref().ok_or(Error::EmptyCorpus)?;
        kb.retrieve(query, &self.embedder, k)
    }

    /// The loaded document, if any.
    #[must_use]
    pub fn knowledge_base(&self) -> Option<&KnowledgeBase> {
        self.current.as_ref()
    }

    /// Returns `true` if a document is loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    /// Returns the number of chunks in the loaded document.
    #[must_use]
    pub fn len(&self) -> usize {
        self.current.as_ref().map_or(0, KnowledgeBase::len)
    }

    /// Returns `true` if no chunks are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a reference to the embedder.
    #[must_use]
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Returns a reference to the chunker.
    #[must_use]
    pub fn chunker(&self) -> &C {
        &self.chunker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::chunk::{ChunkMetadata, chunk_text};
    use crate::embed::testing::HashEmbedder;
    use crate::index::FlatIndex;

    const DOC: &str = "the heart pumps blood through arteries and veins \
                       the lungs exchange oxygen and carbon dioxide gases \
                       the kidneys filter waste from the blood plasma \
                       the liver stores glycogen and detoxifies chemicals \
                       the brain coordinates movement memory and speech";

    fn pieces(embedder: &HashEmbedder) -> (FlatIndex, Vec<Chunk>) {
        let chunks = chunk_text(DOC, 8, 0).unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let index = FlatIndex::build(&embedder.embed_documents(&texts).unwrap()).unwrap();
        (index, chunks)
    }

    #[test]
    fn test_retrieve_nearest_first() {
        let embedder = HashEmbedder::new(128);
        let (index, chunks) = pieces(&embedder);
        assert_eq!(chunks.len(), 5);

        let query = "lungs oxygen carbon dioxide";
        let texts = retrieve(query, &embedder, &index, &chunks, 3).unwrap();

        let nearest = index
            .search(&embedder.embed_query(query).unwrap(), 1)
            .unwrap()[0]
            .position;
        assert_eq!(texts.len(), 3);
        assert_eq!(texts[0], chunks[nearest].content);
        assert!(texts[0].contains("lungs"));
    }

    #[test]
    fn test_retrieve_returns_all_when_k_large() {
        let embedder = HashEmbedder::new(128);
        let (index, chunks) = pieces(&embedder);

        let texts = retrieve("brain", &embedder, &index, &chunks, 10).unwrap();
        assert_eq!(texts.len(), 5);
    }

    #[test]
    fn test_retrieve_mismatch_detected() {
        let embedder = HashEmbedder::new(128);
        let (index, mut chunks) = pieces(&embedder);
        chunks.pop();

        let err = retrieve("heart", &embedder, &index, &chunks, 3).unwrap_err();
        assert!(matches!(
            err,
            Error::IndexCorpusMismatch {
                index: 5,
                chunks: 4
            }
        ));
        // nothing was embedded for a query that cannot be answered
        assert_eq!(embedder.calls(), 1);
    }

    #[test]
    fn test_retrieve_empty_index() {
        let embedder = HashEmbedder::new(16);
        let index = FlatIndex::build(&[]).unwrap();

        let err = retrieve("heart", &embedder, &index, &[], 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyIndex);
    }

    #[test]
    fn test_retrieve_zero_k() {
        let embedder = HashEmbedder::new(16);
        let (index, chunks) = pieces(&embedder);

        let err = retrieve("heart", &embedder, &index, &chunks, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_retriever_process_and_retrieve() {
        let mut retriever =
            Retriever::new(HashEmbedder::new(128), WordWindowChunker::new(8, 0).unwrap());
        assert!(!retriever.is_loaded());

        let count = retriever.process(DOC).unwrap();
        assert_eq!(count, 5);
        assert_eq!(retriever.len(), 5);

        let results = retriever.retrieve("kidneys filter waste", 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].position, 2);
        assert!(results[0].distance <= results[1].distance);
    }

    #[test]
    fn test_retriever_nothing_loaded() {
        let retriever = Retriever::with_default_chunker(HashEmbedder::new(16));
        let err = retriever.retrieve("anything", 3).unwrap_err();
        assert!(matches!(err, Error::EmptyCorpus));
    }

    #[test]
    fn test_retriever_reprocess_replaces_document() {
        let mut retriever =
            Retriever::new(HashEmbedder::new(128), WordWindowChunker::new(8, 0).unwrap());
        retriever.process(DOC).unwrap();
        retriever.process("a tiny replacement document").unwrap();

        assert_eq!(retriever.len(), 1);
        let results = retriever.retrieve("heart", 3).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "a tiny replacement document");
    }

    #[test]
    fn test_retriever_clear() {
        let mut retriever = Retriever::with_default_chunker(HashEmbedder::new(16));
        retriever.process(DOC).unwrap();
        retriever.clear();

        assert!(!retriever.is_loaded());
        assert!(retriever.is_empty());
        assert!(retriever.retrieve("heart", 1).is_err());
    }

    #[test]
    fn test_failed_process_keeps_previous_document() {
        let embedder = HashEmbedder::new(32);
        let kb = KnowledgeBase::build(DOC, &WordWindowChunker::default(), &embedder).unwrap();

        let mut retriever = Retriever::with_default_chunker(HashEmbedder::unavailable());
        retriever.load(kb).unwrap();
        assert!(retriever.process("new text").is_err());

        assert_eq!(retriever.len(), 1);
        let kb = retriever.knowledge_base().unwrap();
        assert!(kb.chunks()[0].content.starts_with("the heart"));
    }

    #[test]
    fn test_load_rejects_other_model() {
        let embedder = HashEmbedder::named(32, "test/other-model");
        let kb = KnowledgeBase::build(DOC, &WordWindowChunker::default(), &embedder).unwrap();

        let mut retriever = Retriever::with_default_chunker(HashEmbedder::new(32));
        let err = retriever.load(kb).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(!retriever.is_loaded());
    }

    #[test]
    fn test_chunk_metadata_roundtrip_position() {
        let embedder = HashEmbedder::new(64);
        let kb = KnowledgeBase::build_with_metadata(
            DOC,
            &WordWindowChunker::new(8, 0).unwrap(),
            &embedder,
            ChunkMetadata::default(),
        )
        .unwrap();

        for result in kb.retrieve("liver glycogen", &embedder, 5).unwrap() {
            assert_eq!(kb.chunks()[result.position].content, result.content);
            assert_eq!(kb.chunks()[result.position].metadata.position, result.position);
        }
    }
}
