//! Model cache directory discovery
//!
//! Decides where downloaded ONNX model files live.

use std::path::{Path, PathBuf};

/// Environment variable overriding the model cache directory
pub const CACHE_DIR_ENV: &str = "SEMSEARCH_CACHE_DIR";

/// fastembed's own cache override, honored as a fallback
pub const FASTEMBED_CACHE_ENV: &str = "FASTEMBED_CACHE_PATH";

/// Find the model cache directory with priority:
/// 1. Explicit path passed by the caller
/// 2. SEMSEARCH_CACHE_DIR environment variable
/// 3. FASTEMBED_CACHE_PATH environment variable
/// 4. User home directory (~/.semsearch/models)
/// 5. `.fastembed_cache` in the working directory
///
/// The directory is not created here; the loader does that on first use.
pub fn find_cache_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        log::debug!("Using explicit model cache: {}", path.display());
        return path.to_path_buf();
    }

    for var in [CACHE_DIR_ENV, FASTEMBED_CACHE_ENV] {
        if let Some(value) = std::env::var_os(var).filter(|v| !v.is_empty()) {
            let path = PathBuf::from(value);
            log::debug!("Using {}: {}", var, path.display());
            return path;
        }
    }

    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        return PathBuf::from(home).join(".semsearch").join("models");
    }

    log::warn!("No home directory found, caching models in .fastembed_cache");
    PathBuf::from(".fastembed_cache")
}
