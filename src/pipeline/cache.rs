//! Request-level memoisation with in-flight de-duplication.
//!
//! Reports are keyed by the law name and a SHA-256 digest of the uploaded
//! bytes. The first caller for a key starts the computation; concurrent
//! callers with the same key await the same shared future. In-flight runs stay
//! pinned until they resolve. Completed reports live in an LRU of bounded
//! capacity, and failed computations are dropped so a retry recomputes.

use std::{
    collections::HashMap,
    future::Future,
    num::NonZeroUsize,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::{error::PipelineError, report::AnalysisReport};

pub type SharedResult = Result<Arc<AnalysisReport>, Arc<PipelineError>>;

type SharedRun = Shared<BoxFuture<'static, SharedResult>>;

/// Completed reports kept when no capacity is configured.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub law_name: String,
    pub digest: [u8; 32],
}

impl RequestKey {
    pub fn new(law_name: impl Into<String>, content: &[u8]) -> Self {
        Self {
            law_name: law_name.into(),
            digest: Sha256::digest(content).into(),
        }
    }

    /// Short hex prefix of the content digest, for logs.
    pub fn short_digest(&self) -> String {
        hex::encode(&self.digest[..6])
    }
}

struct Entries {
    in_flight: HashMap<RequestKey, SharedRun>,
    completed: LruCache<RequestKey, Arc<AnalysisReport>>,
}

pub struct AnalysisCache {
    entries: Mutex<Entries>,
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` completed reports (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(Entries {
                in_flight: HashMap::new(),
                completed: LruCache::new(capacity),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached or in-flight result for `key`, starting `run` only if neither
    /// exists.
    pub async fn get_or_run<F, Fut>(&self, key: RequestKey, run: F) -> SharedResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AnalysisReport, PipelineError>> + Send + 'static,
    {
        let shared = {
            let mut entries = self.lock();
            if let Some(report) = entries.completed.get(&key) {
                debug!(law = %key.law_name, digest = %key.short_digest(), "cache hit");
                return Ok(Arc::clone(report));
            }
            match entries.in_flight.get(&key) {
                Some(existing) => {
                    debug!(law = %key.law_name, digest = %key.short_digest(), "joining in-flight analysis");
                    existing.clone()
                }
                None => {
                    let fut = run()
                        .map(|result| result.map(Arc::new).map_err(Arc::new))
                        .boxed()
                        .shared();
                    entries.in_flight.insert(key.clone(), fut.clone());
                    fut
                }
            }
        };

        let result = shared.clone().await;

        let mut entries = self.lock();
        let owns_entry = entries
            .in_flight
            .get(&key)
            .is_some_and(|current| current.ptr_eq(&shared));
        if owns_entry {
            entries.in_flight.remove(&key);
            if let Ok(report) = &result {
                let pushed = entries.completed.push(key.clone(), Arc::clone(report));
                if let Some((evicted, _)) = pushed.filter(|(old, _)| *old != key) {
                    debug!(law = %evicted.law_name, digest = %evicted.short_digest(), "evicted cached report");
                }
            }
        }
        result
    }

    /// Completed plus in-flight entries.
    pub fn len(&self) -> usize {
        let entries = self.lock();
        entries.completed.len() + entries.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().completed.cap().get()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::report::Aggregation;

    fn report(law: &str) -> AnalysisReport {
        AnalysisReport {
            law_name: law.to_string(),
            headers: vec!["Comment".into()],
            records: Vec::new(),
            aggregation: Aggregation::default(),
            insights: Default::default(),
        }
    }

    async fn run_counted(cache: &AnalysisCache, law: &str, bytes: &[u8], runs: &Arc<AtomicUsize>) {
        let runs = Arc::clone(runs);
        let law_owned = law.to_string();
        cache
            .get_or_run(RequestKey::new(law, bytes), move || async move {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(report(&law_owned))
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn least_recently_used_report_is_evicted_at_capacity() {
        let cache = AnalysisCache::with_capacity(2);
        let runs = Arc::new(AtomicUsize::new(0));

        run_counted(&cache, "Act", b"a", &runs).await;
        run_counted(&cache, "Act", b"b", &runs).await;
        // touch "a" so "b" becomes the eviction candidate
        run_counted(&cache, "Act", b"a", &runs).await;
        run_counted(&cache, "Act", b"c", &runs).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(cache.len(), 2);

        run_counted(&cache, "Act", b"a", &runs).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        run_counted(&cache, "Act", b"b", &runs).await;
        assert_eq!(runs.load(Ordering::SeqCst), 4);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn keys_hash_content_not_store_it() {
        let big = vec![b'x'; 64 * 1024];
        let key = RequestKey::new("Act", &big);
        assert_eq!(key, RequestKey::new("Act", &big));
        assert_ne!(key, RequestKey::new("Act", b"y"));
        assert_ne!(key, RequestKey::new("Other Act", &big));
        assert_eq!(std::mem::size_of_val(&key.digest), 32);
    }

    #[test]
    fn zero_capacity_keeps_one_report() {
        assert_eq!(AnalysisCache::with_capacity(0).capacity(), 1);
    }
}
