use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{debug, info};

use crate::embed::{Embedder, Embedding};
use crate::{Error, Result};

/// Identifier of the sentence-embedding model used for chunks and queries.
pub const MODEL_NAME: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Output width of [`MODEL_NAME`].
pub const MODEL_DIMENSION: usize = 384;

/// Texts handed to the ONNX session per inference batch.
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// all-MiniLM-L6-v2 embedder backed by fastembed.
///
/// This is the process's model handle: construct it once at startup and pass
/// it (or clones of it) to everything that embeds. Clones share the same
/// model. The ONNX model is loaded on first use and never reloaded; if several
/// threads race on that first use, one loads it and the rest wait for it.
#[derive(Clone)]
pub struct FastEmbedder {
    inner: Arc<Inner>,
}

struct Inner {
    model: OnceLock<Mutex<TextEmbedding>>,
    init: Mutex<()>,
    batch_size: usize,
    cache_dir: Option<PathBuf>,
    show_download_progress: bool,
}

impl FastEmbedder {
    /// Create a handle without loading the model.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(DEFAULT_BATCH_SIZE, None, true)
    }

    /// Create a handle with a custom batch size and model cache directory.
    #[must_use]
    pub fn with_options(
        batch_size: usize,
        cache_dir: Option<PathBuf>,
        show_download_progress: bool,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                model: OnceLock::new(),
                init: Mutex::new(()),
                batch_size: batch_size.max(1),
                cache_dir,
                show_download_progress,
            }),
        }
    }

    /// Load the model now instead of on the first embedding call.
    ///
    /// Downloads the model on first run (~90MB).
    pub fn load(&self) -> Result<()> {
        self.model().map(|_| ())
    }

    /// Whether the model has been loaded by this handle or one of its clones.
    pub fn is_loaded(&self) -> bool {
        self.inner.model.get().is_some()
    }

    fn model(&self) -> Result<&Mutex<TextEmbedding>> {
        get_or_load(&self.inner.model, &self.inner.init, || {
            info!(model = MODEL_NAME, "loading embedding model");
            let mut opts = InitOptions::new(EmbeddingModel::AllMiniLML6V2)
                .with_show_download_progress(self.inner.show_download_progress);
            if let Some(dir) = &self.inner.cache_dir {
                opts = opts.with_cache_dir(dir.clone());
            }

            let model = TextEmbedding::try_new(opts)
                .map_err(|e| Error::Embedding(format!("failed to load {MODEL_NAME}: {e}")))?;
            info!(model = MODEL_NAME, "embedding model ready");
            Ok(Mutex::new(model))
        })
    }

    fn run(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut model = self
            .model()?
            .lock()
            .map_err(|_| Error::Embedding("embedding model lock poisoned".to_string()))?;

        let embeddings = model
            .embed(texts, Some(self.inner.batch_size))
            .map_err(|e| Error::Embedding(e.to_string()))?;

        check_output(texts.len(), &embeddings)?;
        Ok(embeddings)
    }
}

impl Default for FastEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FastEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedder")
            .field("model", &MODEL_NAME)
            .field("loaded", &self.is_loaded())
            .field("batch_size", &self.inner.batch_size)
            .finish()
    }
}

impl Embedder for FastEmbedder {
    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimension(&self) -> usize {
        MODEL_DIMENSION
    }

    fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = texts.len(), "embedding documents");
        self.run(texts)
    }

    fn embed_query(&self, text: &str) -> Result<Embedding> {
        self.run(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("model returned no embeddings".to_string()))
    }
}

/// Return the value in `cell`, running `load` to fill it if it is empty.
///
/// Loaders are serialized by `init`: the first caller runs `load` and later
/// callers reuse its value. A failed load leaves the cell empty and the next
/// caller tries again.
fn get_or_load<'a, T>(
    cell: &'a OnceLock<T>,
    init: &Mutex<()>,
    load: impl FnOnce() -> Result<T>,
) -> Result<&'a T> {
    if let Some(value) = cell.get() {
        return Ok(value);
    }

    let _guard = init
        .lock()
        .map_err(|_| Error::Embedding("model initialization lock poisoned".to_string()))?;
    if let Some(value) = cell.get() {
        return Ok(value);
    }

    let value = load()?;
    Ok(cell.get_or_init(|| value))
}

/// Verify the model produced one correctly sized vector per input.
fn check_output(expected: usize, embeddings: &[Embedding]) -> Result<()> {
    if embeddings.len() != expected {
        return Err(Error::Embedding(format!(
            "model returned {} embeddings for {expected} inputs",
            embeddings.len()
        )));
    }
    if let Some(bad) = embeddings.iter().find(|e| e.len() != MODEL_DIMENSION) {
        return Err(Error::Embedding(format!(
            "model returned a {}-dimensional vector, expected {MODEL_DIMENSION}",
            bad.len()
        )));
    }
    Ok(())
}
