//! Semsearch core
//!
//! Minimal semantic search: embed a corpus with a loaded model, index the
//! vectors, embed a query the same way and retrieve the nearest entries.
//!
//! ## Components
//!
//! - **Embedding sessions** - Load a registry model once, then embed batches of text
//! - **Vector index** - Immutable k-NN index with exact cosine ranking (HNSW for large corpora)
//!
//! ## Example
//!
//! ```ignore
//! use semsearch_core::{AvailableModel, IndexedItem, LogObserver, SessionConfig, SessionManager, VectorIndex};
//!
//! let phrases = ["That is a very happy Person", "That is a Happy Dog", "Today is a sunny day"];
//!
//! let manager = SessionManager::new(SessionConfig::from_env());
//! let session = manager.load_model(AvailableModel::BgeSmallEnV15, &mut LogObserver).await?;
//!
//! let embeddings = session.infer(&phrases).await?;
//! let index = VectorIndex::build(IndexedItem::from_phrases(&phrases, embeddings)?)?;
//!
//! let query = session.infer(&["Is it summer yet?"]).await?;
//! let result = index.search(&query[0], 1)?;
//! assert_eq!(result.neighbors[0].id, "2");
//! ```

pub mod embedding;
pub mod error;
pub mod index;
pub mod item;

// Re-exports for convenience
pub use embedding::{
    AvailableModel, BackendLoader, EmbeddingBackend, FastEmbedLoader, LoadCallbacks, LoadObserver,
    LogObserver, Session, SessionConfig, SessionManager,
};
pub use error::{Recover, Recovery, Result, SemsearchError};
pub use index::{IndexConfig, SearchStrategy, VectorIndex};
pub use item::{split_flat, EmbeddingVector, IndexedItem, SearchNeighbor, SearchResult};
pub use tokio_util::sync::CancellationToken;
