//! Embedding module
//!
//! Loads registry models through fastembed and serves batch inference.

mod backend;
mod discovery;
mod progress;
mod registry;
mod session;

pub use backend::{BackendLoader, EmbeddingBackend, FastEmbedBackend, FastEmbedLoader};
pub use discovery::{find_cache_dir, CACHE_DIR_ENV, FASTEMBED_CACHE_ENV};
pub use progress::{LoadCallbacks, LoadObserver, LogObserver};
pub use registry::AvailableModel;
pub use session::{Session, SessionConfig, SessionManager, SHOW_PROGRESS_ENV};
