//! Embedding sessions
//!
//! A [`SessionManager`] loads a registry model once; the resulting
//! [`Session`] is a cheap cloneable handle passed to whoever needs to embed.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::backend::{BackendLoader, EmbeddingBackend, FastEmbedLoader};
use super::discovery::{find_cache_dir, CACHE_DIR_ENV};
use super::progress::{LoadObserver, ProgressReporter};
use super::registry::AvailableModel;
use crate::error::{Result, SemsearchError};
use crate::item::EmbeddingVector;

/// Set to `1`/`true` to print fastembed download progress bars
pub const SHOW_PROGRESS_ENV: &str = "SEMSEARCH_SHOW_PROGRESS";

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Model cache directory (discovered when unset)
    pub cache_dir: Option<PathBuf>,
    /// Print download progress bars while fetching weights (default: false)
    pub show_download_progress: bool,
    /// Maximum tokens per input (default: 512)
    pub max_length: usize,
    /// Backend batch size; `None` lets the backend decide
    pub batch_size: Option<usize>,
    /// Memoize embeddings per text (default: true).
    ///
    /// The memo is unbounded and lives as long as the session; call
    /// [`Session::clear_cache`] to release it in long-running processes.
    pub cache_embeddings: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            show_download_progress: false,
            max_length: 512,
            batch_size: None,
            cache_embeddings: true,
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by SEMSEARCH_CACHE_DIR and SEMSEARCH_SHOW_PROGRESS
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
            config.cache_dir = Some(PathBuf::from(dir));
        }
        if let Ok(flag) = std::env::var(SHOW_PROGRESS_ENV) {
            config.show_download_progress =
                matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        config
    }

    pub fn resolved_cache_dir(&self) -> PathBuf {
        find_cache_dir(self.cache_dir.as_deref())
    }
}

/// Loads models into sessions
pub struct SessionManager {
    config: SessionConfig,
    loader: Arc<dyn BackendLoader>,
}

impl SessionManager {
    /// Manager backed by fastembed
    pub fn new(config: SessionConfig) -> Self {
        Self::with_loader(config, Arc::new(FastEmbedLoader))
    }

    /// Manager with a custom model loader
    pub fn with_loader(config: SessionConfig, loader: Arc<dyn BackendLoader>) -> Self {
        Self { config, loader }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Load a model, reporting progress to `observer`
    pub async fn load_model<O>(&self, model: AvailableModel, observer: &mut O) -> Result<Session>
    where
        O: LoadObserver + ?Sized,
    {
        self.load_model_with_cancel(model, observer, &CancellationToken::new())
            .await
    }

    /// Load a model; resolves to [`SemsearchError::Cancelled`] once `cancel` fires.
    ///
    /// A load that is already fetching weights keeps running on its worker
    /// thread after cancellation, but its result is discarded.
    pub async fn load_model_with_cancel<O>(
        &self,
        model: AvailableModel,
        observer: &mut O,
        cancel: &CancellationToken,
    ) -> Result<Session>
    where
        O: LoadObserver + ?Sized,
    {
        let mut progress = ProgressReporter::new(observer);
        progress.start(model);
        progress.advance(0.0);

        if cancel.is_cancelled() {
            return Err(SemsearchError::Cancelled);
        }
        progress.advance(0.1);

        let loader = Arc::clone(&self.loader);
        let config = self.config.clone();
        let task = tokio::task::spawn_blocking(move || loader.load(model, &config));

        let backend = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::warn!("Load of {} cancelled", model);
                return Err(SemsearchError::Cancelled);
            }
            joined = task => joined
                .map_err(|e| SemsearchError::model_load(format!("Loader task failed: {}", e)))??,
        };
        progress.advance(0.9);

        if backend.dimension() != model.dimension() {
            return Err(SemsearchError::model_load(format!(
                "{} produced {}d vectors, registry expects {}d",
                model,
                backend.dimension(),
                model.dimension()
            )));
        }

        let session = Session::with_backend(backend, &self.config);
        progress.finish();

        log::info!("Session ready ({}, {}d)", model, session.dimension());
        Ok(session)
    }
}

struct SessionInner {
    backend: Arc<dyn EmbeddingBackend>,
    /// Serializes batches; the owned guard travels into the worker thread
    gate: Arc<Mutex<()>>,
    cache: Option<DashMap<String, EmbeddingVector>>,
    dimension: usize,
}

/// Handle over a loaded model. Clones share the model, gate and cache.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Wrap an already-loaded backend
    pub fn with_backend(backend: Arc<dyn EmbeddingBackend>, config: &SessionConfig) -> Self {
        let dimension = backend.dimension();
        Self {
            inner: Arc::new(SessionInner {
                backend,
                gate: Arc::new(Mutex::new(())),
                cache: config.cache_embeddings.then(DashMap::new),
                dimension,
            }),
        }
    }

    pub fn model_name(&self) -> &str {
        self.inner.backend.name()
    }

    /// Width of every vector this session returns
    pub fn dimension(&self) -> usize {
        self.inner.dimension
    }

    /// Embed a non-empty batch; `result[i]` is the embedding of `texts[i]`
    pub async fn infer<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<EmbeddingVector>> {
        self.infer_with_cancel(texts, &CancellationToken::new())
            .await
    }

    /// Embed a batch, giving up with [`SemsearchError::Cancelled`] once `cancel` fires.
    ///
    /// Either every text is embedded or the whole call fails.
    pub async fn infer_with_cancel<S: AsRef<str>>(
        &self,
        texts: &[S],
        cancel: &CancellationToken,
    ) -> Result<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Err(SemsearchError::invalid_input("cannot embed an empty batch"));
        }
        if cancel.is_cancelled() {
            return Err(SemsearchError::Cancelled);
        }

        let mut results: Vec<Option<EmbeddingVector>> =
            texts.iter().map(|t| self.cached(t.as_ref())).collect();

        let uncached: Vec<(usize, String)> = results
            .iter()
            .enumerate()
            .filter(|(_, cached)| cached.is_none())
            .map(|(i, _)| (i, texts[i].as_ref().to_string()))
            .collect();

        log::debug!(
            "Embedding {} texts ({} cached)",
            texts.len(),
            texts.len() - uncached.len()
        );

        if !uncached.is_empty() {
            let batch: Vec<String> = uncached.iter().map(|(_, t)| t.clone()).collect();
            let embeddings = self.run_batch(batch, cancel).await?;

            for ((idx, text), embedding) in uncached.into_iter().zip(embeddings) {
                if let Some(cache) = &self.inner.cache {
                    cache.insert(text, embedding.clone());
                }
                results[idx] = Some(embedding);
            }
        }

        Ok(results.into_iter().flatten().collect())
    }

    /// Number of memoized embeddings
    pub fn cache_size(&self) -> usize {
        self.inner.cache.as_ref().map_or(0, DashMap::len)
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.inner.cache {
            cache.clear();
        }
    }

    fn cached(&self, text: &str) -> Option<EmbeddingVector> {
        self.inner
            .cache
            .as_ref()
            .and_then(|cache| cache.get(text).map(|v| v.clone()))
    }

    async fn run_batch(
        &self,
        batch: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<Vec<EmbeddingVector>> {
        let guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SemsearchError::Cancelled),
            guard = Arc::clone(&self.inner.gate).lock_owned() => guard,
        };

        let expected = batch.len();
        let backend = Arc::clone(&self.inner.backend);
        let task = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let refs: Vec<&str> = batch.iter().map(String::as_str).collect();
            backend.embed_batch(&refs)
        });

        let embeddings = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::debug!("Inference of {} texts cancelled", expected);
                return Err(SemsearchError::Cancelled);
            }
            joined = task => joined
                .map_err(|e| SemsearchError::inference(format!("Inference task failed: {}", e)))??,
        };

        if embeddings.len() != expected {
            return Err(SemsearchError::inference(format!(
                "backend returned {} embeddings for {} texts",
                embeddings.len(),
                expected
            )));
        }
        if let Some(bad) = embeddings.iter().find(|v| v.len() != self.inner.dimension) {
            return Err(SemsearchError::inference(format!(
                "backend returned a {}d vector from a {}d model",
                bad.len(),
                self.inner.dimension
            )));
        }

        Ok(embeddings)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("model", &self.model_name())
            .field("dimension", &self.dimension())
            .field("cached", &self.cache_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Encodes text length and vowel count; sleeps to simulate model latency
    struct StubBackend {
        dimension: usize,
        delay: Duration,
        calls: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl StubBackend {
        fn new(dimension: usize) -> Self {
            Self::with_delay(dimension, Duration::ZERO)
        }

        fn with_delay(dimension: usize, delay: Duration) -> Self {
            Self {
                dimension,
                delay,
                calls: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
            }
        }
    }

    impl EmbeddingBackend for StubBackend {
        fn name(&self) -> &str {
            "stub"
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<EmbeddingVector>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.active.fetch_sub(1, Ordering::SeqCst);

            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0; self.dimension];
                    v[0] = t.len() as f32;
                    v[1 % self.dimension] += t.chars().filter(|c| "aeiou".contains(*c)).count() as f32;
                    v
                })
                .collect())
        }
    }

    /// Returns a broken batch shape
    struct ShortBackend {
        drop_one: bool,
    }

    impl EmbeddingBackend for ShortBackend {
        fn name(&self) -> &str {
            "short"
        }

        fn dimension(&self) -> usize {
            4
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<EmbeddingVector>> {
            if self.drop_one {
                Ok(vec![vec![0.0; 4]; texts.len() - 1])
            } else {
                Ok(vec![vec![0.0; 3]; texts.len()])
            }
        }
    }

    struct FailingBackend;

    impl EmbeddingBackend for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }

        fn dimension(&self) -> usize {
            4
        }

        fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<EmbeddingVector>> {
            Err(SemsearchError::inference("out of memory"))
        }
    }

    struct StubLoader {
        dimension: usize,
        fail: bool,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl BackendLoader for StubLoader {
        fn load(
            &self,
            _model: AvailableModel,
            _config: &SessionConfig,
        ) -> Result<Arc<dyn EmbeddingBackend>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            if self.fail {
                return Err(SemsearchError::model_load("unsupported format"));
            }
            Ok(Arc::new(StubBackend::new(self.dimension)))
        }
    }

    fn stub_loader(dimension: usize, fail: bool, delay: Duration) -> Arc<StubLoader> {
        Arc::new(StubLoader {
            dimension,
            fail,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    fn manager(dimension: usize, fail: bool, delay: Duration) -> SessionManager {
        SessionManager::with_loader(
            SessionConfig::default(),
            stub_loader(dimension, fail, delay),
        )
    }

    fn session(backend: impl EmbeddingBackend + 'static) -> Session {
        Session::with_backend(Arc::new(backend), &SessionConfig::default())
    }

    #[derive(Default)]
    struct Recorder {
        starts: usize,
        progress: Vec<f32>,
    }

    impl LoadObserver for Recorder {
        fn on_start(&mut self, _model: AvailableModel) {
            self.starts += 1;
        }

        fn on_progress(&mut self, fraction: f32) {
            self.progress.push(fraction);
        }
    }

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.max_length, 512);
        assert!(config.cache_embeddings);
        assert!(!config.show_download_progress);
        assert!(config.cache_dir.is_none());
    }

    #[tokio::test]
    async fn test_load_reports_progress() {
        let mut recorder = Recorder::default();
        let session = manager(384, false, Duration::ZERO)
            .load_model(AvailableModel::BgeSmallEnV15, &mut recorder)
            .await
            .unwrap();

        assert_eq!(session.dimension(), 384);
        assert_eq!(recorder.starts, 1);
        assert_eq!(recorder.progress.first(), Some(&0.0));
        assert_eq!(recorder.progress.last(), Some(&1.0));
        assert!(recorder.progress.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_load_failure_returns_no_session() {
        let mut recorder = Recorder::default();
        let result = manager(384, true, Duration::ZERO)
            .load_model(AvailableModel::BgeSmallEnV15, &mut recorder)
            .await;

        assert!(matches!(result, Err(SemsearchError::ModelLoad(_))));
        assert_eq!(recorder.starts, 1);
        assert_ne!(recorder.progress.last(), Some(&1.0));
    }

    #[tokio::test]
    async fn test_load_rejects_registry_dimension_mismatch() {
        let result = manager(128, false, Duration::ZERO)
            .load_model(AvailableModel::BgeBaseEnV15, &mut ())
            .await;
        assert!(matches!(result, Err(SemsearchError::ModelLoad(_))));
    }

    #[tokio::test]
    async fn test_load_cancelled() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = manager(384, false, Duration::from_millis(500))
            .load_model_with_cancel(AvailableModel::BgeSmallEnV15, &mut (), &cancel)
            .await;
        assert!(matches!(result, Err(SemsearchError::Cancelled)));
    }

    #[tokio::test]
    async fn test_load_already_cancelled_skips_loader() {
        let loader = stub_loader(384, false, Duration::ZERO);
        let manager = SessionManager::with_loader(SessionConfig::default(), loader.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut recorder = Recorder::default();
        let result = manager
            .load_model_with_cancel(AvailableModel::BgeSmallEnV15, &mut recorder, &cancel)
            .await;

        assert!(matches!(result, Err(SemsearchError::Cancelled)));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
        assert_ne!(recorder.progress.last(), Some(&1.0));
    }

    #[tokio::test]
    async fn test_infer_preserves_order_and_length() {
        let session = session(StubBackend::new(4));
        let texts = ["a", "hello there", "xyz", "aeiou"];
        let vectors = session.infer(&texts).await.unwrap();

        assert_eq!(vectors.len(), texts.len());
        assert!(vectors.iter().all(|v| v.len() == 4));
        for (text, vector) in texts.iter().zip(&vectors) {
            assert_eq!(vector[0], text.len() as f32);
        }
    }

    #[tokio::test]
    async fn test_infer_empty_batch_is_invalid() {
        let session = session(StubBackend::new(4));
        let texts: [&str; 0] = [];
        let result = session.infer(&texts).await;
        assert!(matches!(result, Err(SemsearchError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_infer_uses_cache() {
        let backend = Arc::new(StubBackend::new(4));
        let session = Session::with_backend(backend.clone(), &SessionConfig::default());

        session.infer(&["one", "two"]).await.unwrap();
        assert_eq!(session.cache_size(), 2);

        let again = session.infer(&["two", "one"]).await.unwrap();
        assert_eq!(again[0][0], 3.0);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        session.clear_cache();
        assert_eq!(session.cache_size(), 0);
    }

    #[tokio::test]
    async fn test_infer_rejects_short_batch() {
        let session = session(ShortBackend { drop_one: true });
        let result = session.infer(&["a", "b"]).await;
        assert!(matches!(result, Err(SemsearchError::Inference(_))));
        assert_eq!(session.cache_size(), 0);
    }

    #[tokio::test]
    async fn test_infer_rejects_wrong_width() {
        let session = session(ShortBackend { drop_one: false });
        let result = session.infer(&["a"]).await;
        assert!(matches!(result, Err(SemsearchError::Inference(_))));
    }

    #[tokio::test]
    async fn test_infer_failure_is_whole_batch() {
        let session = session(FailingBackend);
        let result = session.infer(&["a", "b", "c"]).await;
        assert!(matches!(result, Err(SemsearchError::Inference(_))));
        assert_eq!(session.cache_size(), 0);
    }

    #[tokio::test]
    async fn test_infer_cancelled_before_start() {
        let session = session(StubBackend::new(4));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = session.infer_with_cancel(&["a"], &cancel).await;
        assert!(result.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_infer_cancelled_while_running() {
        let session = session(StubBackend::with_delay(4, Duration::from_millis(500)));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = session.infer_with_cancel(&["slow"], &cancel).await;
        assert!(matches!(result, Err(SemsearchError::Cancelled)));
        assert_eq!(session.cache_size(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_batches_are_serialized() {
        let backend = Arc::new(StubBackend::with_delay(4, Duration::from_millis(30)));
        let config = SessionConfig {
            cache_embeddings: false,
            ..SessionConfig::default()
        };
        let session = Session::with_backend(backend.clone(), &config);
        let other = session.clone();

        let (a, b) = tokio::join!(session.infer(&["left"]), other.infer(&["right", "side"]));

        assert_eq!(a.unwrap().len(), 1);
        assert_eq!(b.unwrap().len(), 2);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
        assert_eq!(backend.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_infer_cancelled_while_waiting_for_gate() {
        let backend = Arc::new(StubBackend::with_delay(4, Duration::from_millis(500)));
        let config = SessionConfig {
            cache_embeddings: false,
            ..SessionConfig::default()
        };
        let session = Session::with_backend(backend.clone(), &config);

        let running = {
            let session = session.clone();
            tokio::spawn(async move { session.infer(&["first"]).await })
        };
        // Let the first batch take the gate
        tokio::time::sleep(Duration::from_millis(50)).await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let waited = std::time::Instant::now();
        let queued = session.infer_with_cancel(&["second"], &cancel).await;
        assert!(matches!(queued, Err(SemsearchError::Cancelled)));
        assert!(waited.elapsed() < Duration::from_millis(300));

        let first = running.await.unwrap().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.max_active.load(Ordering::SeqCst), 1);
    }
}
