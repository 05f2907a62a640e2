//! Deterministic embedder for tests that must not download a model.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::embed::{Embedder, Embedding};
use crate::{Error, Result};

/// Hashed bag-of-words embedder. Texts sharing words land close together.
pub(crate) struct HashEmbedder {
    name: &'static str,
    dimension: usize,
    unavailable: bool,
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub(crate) fn new(dimension: usize) -> Self {
        Self::named(dimension, "test/hash-bag-of-words")
    }

    /// Same vectors, reported under another model name.
    pub(crate) fn named(dimension: usize, name: &'static str) -> Self {
        Self {
            name,
            dimension,
            unavailable: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// An embedder whose model can never be loaded.
    pub(crate) fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new(16)
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(&self, text: &str) -> Embedding {
        let mut v = vec![0.0f32; self.dimension];
        for word in text.split_whitespace() {
            let word: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect();
            if word.is_empty() {
                continue;
            }
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            v[(hasher.finish() % self.dimension as u64) as usize] += 1.0;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if self.unavailable {
            return Err(Error::Embedding("model unavailable".to_string()));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn embed_query(&self, text: &str) -> Result<Embedding> {
        if self.unavailable {
            return Err(Error::Embedding("model unavailable".to_string()));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        self.name
    }
}
