use std::hash::{DefaultHasher, Hash, Hasher};

use tracing::debug;

use crate::chunk::{Chunk, ChunkMetadata, Chunker};
use crate::{Error, Result};

/// Default window size in words.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Default number of words shared by consecutive windows.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Word-window chunker - splits on whitespace into overlapping windows
///
/// Windows start every `size - overlap` words, until the start offset passes
/// the last word, and hold up to `size` words. Trailing windows may be shorter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordWindowChunker {
    size: usize,
    overlap: usize,
}

impl WordWindowChunker {
    /// Create a chunker, rejecting parameters that cannot make progress.
    ///
    /// Requires `size > 0` and `overlap < size`.
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidConfiguration(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if overlap >= size {
            return Err(Error::InvalidConfiguration(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({size})"
            )));
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance in words between consecutive window starts.
    pub fn stride(&self) -> usize {
        self.size - self.overlap
    }

    /// Word offsets at which windows start for a document of `word_count` words.
    fn offsets(&self, word_count: usize) -> impl Iterator<Item = usize> {
        (0..word_count).step_by(self.stride())
    }
}

impl Default for WordWindowChunker {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl Chunker for WordWindowChunker {
    fn name(&self) -> &str {
        "word-window"
    }

    fn chunk(&self, content: &str, mut metadata: ChunkMetadata) -> Vec<Chunk> {
        let words: Vec<&str> = content.split_whitespace().collect();

        let total = self.offsets(words.len()).count();
        metadata.total_chunks = Some(total);

        let mut chunks = Vec::with_capacity(total);
        for offset in self.offsets(words.len()) {
            let end = (offset + self.size).min(words.len());
            let window = &words[offset..end];
            let text = window.join(" ");

            let mut m = metadata.clone();
            m.position = chunks.len();
            m.word_offset = offset;
            m.word_count = window.len();

            chunks.push(Chunk {
                id: generate_id(&text),
                content: text,
                metadata: m,
            });
        }

        debug!(
            words = words.len(),
            chunks = chunks.len(),
            size = self.size,
            overlap = self.overlap,
            "chunked document"
        );
        chunks
    }
}

/// Chunk `text` into windows of `size` words sharing `overlap` words.
///
/// Empty or whitespace-only text yields no chunks.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    let chunker = WordWindowChunker::new(size, overlap)?;
    Ok(chunker.chunk(text, ChunkMetadata::default()))
}

fn generate_id(string: &str) -> String {
    let mut hasher = DefaultHasher::new();
    string.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
