//! Request dispatch
//!
//! [`Highlighter`] is the public face of the crate: it owns the shared rule
//! registry and settings, hands out request ids, and runs the engine either
//! inline or on tokio's blocking pool. Every request carries a
//! [`RequestId`]; async results are matched back by id, never by
//! completion order.

use crate::cache::{CacheStats, RequestKey, ResultCache};
use crate::config::{AnnotateOptions, HighlightSettings};
use crate::engine::Annotator;
use crate::error::{HighlightError, Result};
use crate::registry::{Registry, SharedRegistry};
use crate::rules::{LanguagePack, Rule};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error};

pub mod worker;

pub use worker::WorkerHandle;

/// Correlation id of one annotation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A packaged annotation request
#[derive(Debug, Clone)]
pub struct Request {
    pub id: RequestId,
    pub code: String,
    /// Canonical language name (aliases already resolved)
    pub language: String,
    pub options: AnnotateOptions,
}

/// The reply to a [`Request`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub id: RequestId,
    pub language: String,
    pub result: String,
}

/// Run one request against a registry snapshot on the blocking pool,
/// then hold the reply for the requested presentation delay.
pub(crate) async fn run_request(registry: Arc<Registry>, request: Request) -> Result<Response> {
    let Request {
        id,
        code,
        language,
        options,
    } = request;
    let delay = options.delay;

    let (language, result) = tokio::task::spawn_blocking(move || {
        let result = Annotator::new(&registry, &options).annotate(&code, &language);
        (language, result)
    })
    .await?;

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    Ok(Response {
        id,
        language,
        result,
    })
}

/// Syntax highlighter
///
/// Registry mutations are expected between annotation bursts; requests
/// already running keep the snapshot they started with.
pub struct Highlighter {
    settings: HighlightSettings,
    registry: Arc<SharedRegistry>,
    next_id: AtomicU64,
    cache: Option<ResultCache>,
}

impl Highlighter {
    pub fn new() -> Self {
        Self::with_settings(HighlightSettings::default())
    }

    pub fn with_settings(settings: HighlightSettings) -> Self {
        let cache = ResultCache::new(settings.cache_capacity);
        Self {
            settings,
            registry: Arc::new(SharedRegistry::default()),
            next_id: AtomicU64::new(0),
            cache,
        }
    }

    pub fn settings(&self) -> &HighlightSettings {
        &self.settings
    }

    /// Shared handle to the rule registry
    pub fn registry(&self) -> Arc<SharedRegistry> {
        Arc::clone(&self.registry)
    }

    /// Add rules to a language ahead of its existing ones
    pub fn extend(&self, language: &str, rules: Vec<Rule>, parent: Option<&str>) {
        self.registry.update(|r| r.extend(language, rules, parent));
        self.invalidate();
    }

    pub fn remove(&self, language: &str) {
        self.registry.update(|r| r.remove(language));
        self.invalidate();
    }

    pub fn add_alias(&self, alias: &str, canonical: &str) {
        self.registry.update(|r| r.alias(alias, canonical));
        self.invalidate();
    }

    pub fn load_pack(&self, pack: &LanguagePack) -> Result<()> {
        let loaded = self.registry.update(|r| r.load_pack(pack));
        self.invalidate();
        loaded
    }

    fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Annotate synchronously on the calling thread
    pub fn annotate(&self, code: &str, language: &str, options: &AnnotateOptions) -> String {
        let generation = self.registry.generation();
        let registry = self.registry.snapshot();
        let language = registry.canonical(language);

        let key = RequestKey::new(generation, language, options.global_class.as_deref(), code);
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            return hit;
        }

        let result = Annotator::new(&registry, options).annotate(code, language);
        if let Some(cache) = &self.cache {
            cache.insert(key, result.clone());
        }
        result
    }

    /// Annotate synchronously with the configured default options
    pub fn color_sync(&self, code: &str, language: &str) -> String {
        self.annotate(code, language, &self.settings.annotate_options())
    }

    /// Package a request: assign the next id, resolve the alias, and fall
    /// back to the configured options.
    pub fn request(
        &self,
        code: impl Into<String>,
        language: &str,
        options: Option<AnnotateOptions>,
    ) -> Request {
        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let language = self.registry.snapshot().canonical(language).to_string();

        Request {
            id,
            code: code.into(),
            language,
            options: options.unwrap_or_else(|| self.settings.annotate_options()),
        }
    }

    /// Annotate off the async executor with the configured default options
    pub async fn color(&self, code: impl Into<String>, language: &str) -> Result<Response> {
        let request = self.request(code, language, None);
        self.color_request(request).await
    }

    /// Run an already packaged request
    pub async fn color_request(&self, request: Request) -> Result<Response> {
        debug!("Dispatching request {} ({})", request.id, request.language);
        run_request(self.registry.snapshot(), request).await
    }

    /// Annotate in the background and hand the result to `callback`
    /// together with the language it was annotated as.
    ///
    /// Fails immediately when called outside a tokio runtime.
    pub fn color_with<F>(
        &self,
        code: impl Into<String>,
        language: &str,
        options: Option<AnnotateOptions>,
        callback: F,
    ) -> Result<JoinHandle<()>>
    where
        F: FnOnce(Result<String>, &str) + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| HighlightError::Dispatch(format!("no async runtime: {}", e)))?;

        let request = self.request(code, language, options);
        let registry = self.registry.snapshot();

        Ok(runtime.spawn(async move {
            let id = request.id;
            let language = request.language.clone();
            match run_request(registry, request).await {
                Ok(response) => callback(Ok(response.result), &response.language),
                Err(err) => {
                    error!("Request {} failed: {}", id, err);
                    callback(Err(err), &language);
                }
            }
        }))
    }

    /// Annotate many `(code, language)` pairs concurrently.
    ///
    /// Results come back in submission order whatever order they finish in.
    pub async fn color_batch(&self, items: Vec<(String, String)>) -> Vec<Result<Response>> {
        let requests: Vec<Request> = items
            .into_iter()
            .map(|(code, language)| self.request(code, &language, None))
            .collect();
        let order: Vec<RequestId> = requests.iter().map(|r| r.id).collect();
        let registry = self.registry.snapshot();

        let mut tasks = JoinSet::new();
        for request in requests {
            let registry = Arc::clone(&registry);
            let id = request.id;
            tasks.spawn(async move { (id, run_request(registry, request).await) });
        }

        let mut finished: HashMap<RequestId, Result<Response>> = HashMap::with_capacity(order.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, outcome)) => {
                    finished.insert(id, outcome);
                }
                Err(err) => error!("Batch task failed: {}", err),
            }
        }

        order
            .into_iter()
            .map(|id| {
                finished.remove(&id).unwrap_or_else(|| {
                    Err(HighlightError::Dispatch(format!("request {} produced no result", id)))
                })
            })
            .collect()
    }

    /// Start a message-passing worker sharing this highlighter's registry
    pub fn spawn_worker(&self) -> WorkerHandle {
        WorkerHandle::spawn(self.registry(), self.settings.worker_queue)
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(ResultCache::stats)
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}
