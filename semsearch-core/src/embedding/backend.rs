//! Model runtime seam
//!
//! A session talks to its model only through [`EmbeddingBackend`], and gets
//! one from a [`BackendLoader`]. The default loader runs fastembed ONNX models.

use std::sync::Arc;

use fastembed::{InitOptions, TextEmbedding};
use parking_lot::Mutex;

use super::registry::AvailableModel;
use super::session::SessionConfig;
use crate::error::{Result, SemsearchError};
use crate::item::EmbeddingVector;

/// A loaded model that turns text batches into vectors.
///
/// Implementations must return exactly one vector per input, in input order,
/// all of length [`dimension`](EmbeddingBackend::dimension). Blocking is fine;
/// sessions call this from a blocking worker thread.
pub trait EmbeddingBackend: Send + Sync {
    /// Human-readable model name
    fn name(&self) -> &str;

    /// Width of every vector this backend produces
    fn dimension(&self) -> usize;

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<EmbeddingVector>>;
}

/// Resolves a registry entry to a ready backend (fetching weights if needed)
pub trait BackendLoader: Send + Sync {
    fn load(
        &self,
        model: AvailableModel,
        config: &SessionConfig,
    ) -> Result<Arc<dyn EmbeddingBackend>>;
}

/// fastembed `TextEmbedding` wrapper.
/// Uses a Mutex because the ONNX session must not run two batches at once.
pub struct FastEmbedBackend {
    model: Mutex<TextEmbedding>,
    name: String,
    dimension: usize,
    batch_size: Option<usize>,
}

impl FastEmbedBackend {
    /// Load (downloading on first use) a registry model into the cache directory
    pub fn new(model: AvailableModel, config: &SessionConfig) -> Result<Self> {
        let cache_dir = config.resolved_cache_dir();
        std::fs::create_dir_all(&cache_dir).map_err(|e| {
            SemsearchError::model_load(format!(
                "Failed to create model cache {}: {}",
                cache_dir.display(),
                e
            ))
        })?;

        log::info!("Loading {} from cache {}", model, cache_dir.display());

        let options = InitOptions::new(model.to_fastembed())
            .with_cache_dir(cache_dir)
            .with_max_length(config.max_length)
            .with_show_download_progress(config.show_download_progress);

        let mut embedding = TextEmbedding::try_new(options)
            .map_err(|e| SemsearchError::model_load(format!("Failed to load {}: {}", model, e)))?;

        let dimension = Self::probe_dimension(&mut embedding)?;

        Ok(Self {
            model: Mutex::new(embedding),
            name: model.name().to_string(),
            dimension,
            batch_size: config.batch_size,
        })
    }

    /// Probe the model to determine embedding dimensions
    fn probe_dimension(model: &mut TextEmbedding) -> Result<usize> {
        let probe = model
            .embed(vec!["test"], None)
            .map_err(|e| SemsearchError::model_load(format!("Failed to probe dimensions: {}", e)))?;

        probe
            .first()
            .map(|v| v.len())
            .ok_or_else(|| SemsearchError::model_load("Model returned no embedding"))
    }
}

impl EmbeddingBackend for FastEmbedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        self.model
            .lock()
            .embed(texts.to_vec(), self.batch_size)
            .map_err(|e| SemsearchError::inference(e.to_string()))
    }
}

/// Default loader: fastembed models from the Hugging Face hub
#[derive(Debug, Default, Clone, Copy)]
pub struct FastEmbedLoader;

impl BackendLoader for FastEmbedLoader {
    fn load(
        &self,
        model: AvailableModel,
        config: &SessionConfig,
    ) -> Result<Arc<dyn EmbeddingBackend>> {
        Ok(Arc::new(FastEmbedBackend::new(model, config)?))
    }
}
