//! Memoization of type descriptions.
//!
//! [`DescriptionCache`] keeps a process-local map in front of an optional
//! [`SharedCache`] backend. Entries are populated once per type identifier and
//! never invalidated.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use dashmap::DashMap;
use log::{debug, warn};

use crate::{description::TypeDescription, utils::error::HyResult};

pub mod disk;
pub mod memory;
pub mod noop;

pub use disk::DiskSharedCache;
pub use memory::MemorySharedCache;
pub use noop::NoSharedCache;

/// External key/value store able to persist descriptions beyond a single
/// describer (or a single process).
///
/// Every fallible call may return [`crate::HyError::CacheUnavailable`]; the
/// describer treats any error as a cache miss or a skipped store.
pub trait SharedCache: Send + Sync {
    /// Whether the backend is usable in the current environment.
    fn exists(&self) -> bool;

    fn has(&self, key: &str) -> HyResult<bool>;

    /// Returns [`None`] if there is no entry for `key`.
    fn get(&self, key: &str) -> HyResult<Option<TypeDescription>>;

    /// Store or overwrite the entry for `key`.
    fn put(&self, key: &str, value: &TypeDescription) -> HyResult<()>;
}

/// Snapshot of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub local_hits: usize,
    pub shared_hits: usize,
    pub misses: usize,
    pub shared_failures: usize,
}

#[derive(Default)]
struct Counters {
    local_hits: AtomicUsize,
    shared_hits: AtomicUsize,
    misses: AtomicUsize,
    shared_failures: AtomicUsize,
}

/// Two-level description cache: a local map, then the shared backend.
///
/// The availability of the shared backend is probed once, at construction.
/// When it is unavailable, descriptions are only kept in the local map, and
/// not at all if the local fallback is disabled.
pub struct DescriptionCache {
    local: DashMap<String, Arc<TypeDescription>>,
    shared: Arc<dyn SharedCache>,
    shared_available: bool,
    local_fallback: bool,
    counters: Counters,
}

impl DescriptionCache {
    pub fn new(shared: Arc<dyn SharedCache>, local_fallback: bool) -> Self {
        let shared_available = shared.exists();
        if !shared_available {
            debug!("Shared description cache unavailable, descriptions are not persisted");
        }

        Self {
            local: DashMap::new(),
            shared,
            shared_available,
            local_fallback,
            counters: Counters::default(),
        }
    }

    /// Cache without shared backend, keeping descriptions in the local map.
    pub fn local() -> Self {
        Self::new(Arc::new(NoSharedCache), true)
    }

    pub fn is_shared_available(&self) -> bool {
        self.shared_available
    }

    fn keeps_local(&self) -> bool {
        self.shared_available || self.local_fallback
    }

    /// Look `key` up, first locally then in the shared backend.
    ///
    /// Not side-effect free: every call bumps the [`CacheStats`] counters, and a
    /// shared hit is copied into the local map (unless local storage is off) so
    /// later lookups skip the backend. The promoted value equals what the
    /// backend returned, so callers observe the same description either way.
    /// Backend failures count as a miss.
    pub fn lookup(&self, key: &str) -> Option<Arc<TypeDescription>> {
        if let Some(entry) = self.local.get(key) {
            self.counters.local_hits.fetch_add(1, Ordering::Relaxed);
            return Some(Arc::clone(entry.value()));
        }

        if self.shared_available {
            match self.fetch_shared(key) {
                Ok(Some(description)) => {
                    self.counters.shared_hits.fetch_add(1, Ordering::Relaxed);
                    debug!("Shared cache hit for '{}'", key);
                    let description = Arc::new(description);
                    if self.keeps_local() {
                        self.local.insert(key.to_string(), Arc::clone(&description));
                    }
                    return Some(description);
                }
                Ok(None) => {}
                Err(err) => {
                    self.counters.shared_failures.fetch_add(1, Ordering::Relaxed);
                    warn!("Shared cache lookup for '{}' failed: {}", key, err);
                }
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn fetch_shared(&self, key: &str) -> HyResult<Option<TypeDescription>> {
        if !self.shared.has(key)? {
            return Ok(None);
        }
        self.shared.get(key)
    }

    /// Store a freshly computed description and return the shared handle.
    ///
    /// If another caller stored `key` concurrently, its (value-equal) entry is
    /// kept and returned instead.
    pub fn store(&self, key: &str, description: TypeDescription) -> Arc<TypeDescription> {
        if self.shared_available {
            if let Err(err) = self.shared.put(key, &description) {
                self.counters.shared_failures.fetch_add(1, Ordering::Relaxed);
                warn!("Shared cache store for '{}' failed: {}", key, err);
            }
        }

        let description = Arc::new(description);
        if !self.keeps_local() {
            return description;
        }
        Arc::clone(
            self.local
                .entry(key.to_string())
                .or_insert(description)
                .value(),
        )
    }

    pub fn contains(&self, key: &str) -> bool {
        self.local.contains_key(key)
    }

    /// Number of locally cached descriptions.
    pub fn len(&self) -> usize {
        self.local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            local_hits: self.counters.local_hits.load(Ordering::Relaxed),
            shared_hits: self.counters.shared_hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            shared_failures: self.counters.shared_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::{annotations::AnnotationsBag, utils::error::HyError};

    fn sample(name: &str) -> TypeDescription {
        let mut fields = IndexMap::new();
        fields.insert("x".to_string(), AnnotationsBag::for_field("x", None));
        TypeDescription::new(name.to_string(), fields, IndexMap::new())
    }

    /// Backend that claims to exist but fails every call.
    struct Broken;

    impl SharedCache for Broken {
        fn exists(&self) -> bool {
            true
        }

        fn has(&self, _key: &str) -> HyResult<bool> {
            Err(HyError::CacheUnavailable("broken".to_string()))
        }

        fn get(&self, _key: &str) -> HyResult<Option<TypeDescription>> {
            Err(HyError::CacheUnavailable("broken".to_string()))
        }

        fn put(&self, _key: &str, _value: &TypeDescription) -> HyResult<()> {
            Err(HyError::CacheUnavailable("broken".to_string()))
        }
    }

    #[test]
    fn local_cache_round_trip() {
        let cache = DescriptionCache::local();
        assert!(cache.lookup("a::T").is_none());

        let stored = cache.store("a::T", sample("a::T"));
        let hit = cache.lookup("a::T").unwrap();
        assert!(Arc::ptr_eq(&stored, &hit));
        assert_eq!(
            cache.stats(),
            CacheStats {
                local_hits: 1,
                misses: 1,
                ..Default::default()
            }
        );
    }

    #[test]
    fn first_store_wins_locally() {
        let cache = DescriptionCache::local();
        let first = cache.store("a::T", sample("a::T"));
        let second = cache.store("a::T", sample("a::T"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn disabled_fallback_keeps_nothing() {
        let cache = DescriptionCache::new(Arc::new(NoSharedCache), false);
        cache.store("a::T", sample("a::T"));
        assert!(cache.is_empty());
        assert!(cache.lookup("a::T").is_none());
    }

    #[test]
    fn shared_hits_are_promoted() {
        let shared = Arc::new(MemorySharedCache::new());
        shared.put("a::T", &sample("a::T")).unwrap();

        let cache = DescriptionCache::new(shared, false);
        assert!(cache.is_shared_available());
        assert_eq!(cache.lookup("a::T").as_deref(), Some(&sample("a::T")));
        assert!(cache.contains("a::T"));
        assert!(cache.lookup("a::T").is_some());
        assert_eq!(cache.stats().shared_hits, 1);
        assert_eq!(cache.stats().local_hits, 1);
    }

    #[test]
    fn store_writes_through_to_shared() {
        let shared = Arc::new(MemorySharedCache::new());
        let cache = DescriptionCache::new(shared.clone(), true);
        cache.store("a::T", sample("a::T"));
        assert_eq!(shared.get("a::T").unwrap(), Some(sample("a::T")));
    }

    #[test]
    fn broken_backend_degrades_to_miss() {
        let cache = DescriptionCache::new(Arc::new(Broken), true);
        assert!(cache.lookup("a::T").is_none());

        let stored = cache.store("a::T", sample("a::T"));
        assert_eq!(*stored, sample("a::T"));
        assert!(cache.lookup("a::T").is_some());
        assert_eq!(cache.stats().shared_failures, 2);
    }
}
