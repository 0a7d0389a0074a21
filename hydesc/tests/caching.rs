use std::sync::{
    Arc, Barrier,
    atomic::{AtomicUsize, Ordering},
};

use hydesc::{
    DescriberFactory, Describe, HyError, HyResult, TypeDescription,
    cache::{DiskSharedCache, MemorySharedCache, SharedCache},
    config::{DescriberConfig, SharedCacheConfig},
    introspect::{Introspect, Introspector},
    registry::ResolvedType,
};

#[derive(Describe)]
pub struct Imp {
    /// @var string
    /// @required
    pub id: String,
    /// @var number
    pub bidfloor: f64,
}

#[derive(Describe)]
pub struct Site {
    pub domain: String,
}

/// Delegates to the default introspector and counts invocations.
#[derive(Clone, Default)]
struct Counting {
    calls: Arc<AtomicUsize>,
}

impl Counting {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Introspect for Counting {
    fn introspect(&self, ty: ResolvedType) -> TypeDescription {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Introspector.introspect(ty)
    }
}

/// Backend that claims to exist but fails every call.
struct Unreachable;

impl SharedCache for Unreachable {
    fn exists(&self) -> bool {
        true
    }

    fn has(&self, key: &str) -> HyResult<bool> {
        Err(HyError::CacheUnavailable(format!("cannot reach backend for '{}'", key)))
    }

    fn get(&self, key: &str) -> HyResult<Option<TypeDescription>> {
        Err(HyError::CacheUnavailable(format!("cannot reach backend for '{}'", key)))
    }

    fn put(&self, key: &str, _value: &TypeDescription) -> HyResult<()> {
        Err(HyError::CacheUnavailable(format!("cannot reach backend for '{}'", key)))
    }
}

#[test]
fn second_describe_hits_the_cache() {
    let counting = Counting::default();
    let factory = DescriberFactory::builder()
        .shared_cache(Arc::new(MemorySharedCache::new()))
        .introspector(counting.clone())
        .build();

    let first = factory.describe_type::<Imp>().unwrap();
    let second = factory.describe_type::<Imp>().unwrap();

    assert_eq!(first, second);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(counting.calls(), 1);

    factory.describe_type::<Site>().unwrap();
    assert_eq!(counting.calls(), 2);
    assert_eq!(factory.cache().len(), 2);
}

#[test]
fn shared_backend_is_reused_across_describers() {
    let shared = Arc::new(MemorySharedCache::new());

    let first_counter = Counting::default();
    let first = DescriberFactory::builder()
        .shared_cache(shared.clone())
        .introspector(first_counter.clone())
        .build();
    let original = first.describe_type::<Imp>().unwrap();
    assert_eq!(shared.len(), 1);

    let second_counter = Counting::default();
    let second = DescriberFactory::builder()
        .shared_cache(shared.clone())
        .introspector(second_counter.clone())
        .build();
    assert_eq!(second.describe_type::<Imp>().unwrap(), original);

    assert_eq!(first_counter.calls(), 1);
    assert_eq!(second_counter.calls(), 0);
    assert_eq!(second.cache().stats().shared_hits, 1);
}

#[test]
fn disk_backend_survives_the_describer() {
    let dir = tempfile::tempdir().unwrap();
    let config = DescriberConfig {
        local_fallback: true,
        shared_cache: SharedCacheConfig::Disk {
            path: dir.path().join("descriptions"),
            compression_level: 1,
        },
    };

    let original = {
        let factory = DescriberFactory::from_config(&config);
        assert!(factory.cache().is_shared_available());
        factory.describe_type::<Imp>().unwrap()
    };

    let counting = Counting::default();
    let factory = DescriberFactory::builder()
        .shared_cache(config.shared_cache.build())
        .introspector(counting.clone())
        .build();
    assert_eq!(factory.describe_type::<Imp>().unwrap(), original);
    assert_eq!(counting.calls(), 0);

    let disk = DiskSharedCache::new(dir.path().join("descriptions"));
    assert!(disk.record_path(original.name()).is_file());
}

#[test]
fn without_shared_cache_the_local_fallback_memoizes() {
    let counting = Counting::default();
    let factory = DescriberFactory::builder()
        .introspector(counting.clone())
        .build();

    assert!(!factory.cache().is_shared_available());
    factory.describe_type::<Imp>().unwrap();
    factory.describe_type::<Imp>().unwrap();
    assert_eq!(counting.calls(), 1);
}

#[test]
fn without_any_cache_every_call_introspects() {
    let counting = Counting::default();
    let factory = DescriberFactory::builder()
        .local_fallback(false)
        .introspector(counting.clone())
        .build();

    let first = factory.describe_type::<Imp>().unwrap();
    let second = factory.describe_type::<Imp>().unwrap();
    assert_eq!(first, second);
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(counting.calls(), 2);
    assert!(factory.cache().is_empty());
}

#[test]
fn unreachable_backend_never_fails_describe() {
    let counting = Counting::default();
    let factory = DescriberFactory::builder()
        .shared_cache(Arc::new(Unreachable))
        .introspector(counting.clone())
        .build();

    let description = factory.describe(hydesc::TypeRef::Name(
        <Imp as hydesc::Describable>::TYPE_NAME,
    ));
    assert!(description.is_ok());
    assert!(factory.describe_type::<Imp>().unwrap().field("id").is_some());
    assert_eq!(counting.calls(), 1);
    assert!(factory.cache().stats().shared_failures >= 2);
}

#[test]
fn concurrent_first_describes_agree() {
    const THREADS: usize = 16;

    let counting = Counting::default();
    let factory = DescriberFactory::builder()
        .shared_cache(Arc::new(MemorySharedCache::new()))
        .introspector(counting.clone())
        .build();
    let barrier = Barrier::new(THREADS);

    let results = crossbeam::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|_| {
                    barrier.wait();
                    factory
                        .describe(<Imp as hydesc::Describable>::TYPE_NAME)
                        .unwrap()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>()
    })
    .unwrap();

    assert_eq!(results.len(), THREADS);
    assert!(results.iter().all(|description| **description == *results[0]));
    assert!(counting.calls() >= 1 && counting.calls() <= THREADS);

    // Once settled, no more introspection.
    let settled = counting.calls();
    factory.describe_type::<Imp>().unwrap();
    assert_eq!(counting.calls(), settled);
    assert_eq!(factory.cache().len(), 1);
}
