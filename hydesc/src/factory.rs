//! Entry point: resolve, look up, introspect on miss, store.

use std::sync::Arc;

use log::debug;

use crate::{
    cache::{DescriptionCache, NoSharedCache, SharedCache},
    config::DescriberConfig,
    description::TypeDescription,
    introspect::{Introspect, Introspector},
    registry::{ResolvedType, TypeRegistry},
    schema::{Describable, TypeRef},
    utils::error::HyResult,
};

/// Produces cached [`TypeDescription`]s.
///
/// Construct one per process (or per scope that should share descriptions)
/// and hand out references; every method takes `&self` and is safe to call
/// from several threads at once.
///
/// ```
/// use hydesc::{DescriberFactory, Describe};
///
/// #[derive(Describe)]
/// struct Format {
///     /// @var integer
///     w: u32,
///     h: u32,
/// }
///
/// let factory = DescriberFactory::new();
/// let description = factory.describe_type::<Format>().unwrap();
/// assert_eq!(description.field("w").unwrap().get("var"), Some("integer"));
/// assert_eq!(description.field("h").unwrap().len(), 1);
/// ```
pub struct DescriberFactory {
    registry: Arc<TypeRegistry>,
    cache: DescriptionCache,
    introspector: Box<dyn Introspect>,
}

impl Default for DescriberFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriberFactory {
    /// Describer over every inventory-registered type, with a local cache only.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> DescriberFactoryBuilder {
        DescriberFactoryBuilder::default()
    }

    /// Describer over every inventory-registered type, with the cache
    /// selected by `config`.
    pub fn from_config(config: &DescriberConfig) -> Self {
        Self::builder()
            .shared_cache(config.shared_cache.build())
            .local_fallback(config.local_fallback)
            .build()
    }

    /// Describe the referenced type.
    ///
    /// Fails with [`crate::HyError::InvalidType`] if a name or type id does not
    /// resolve in the registry. Instances resolve unless their identifier is
    /// empty or belongs to another registered type
    /// ([`crate::HyError::DuplicatedType`]).
    pub fn describe<'a>(&self, type_ref: impl Into<TypeRef<'a>>) -> HyResult<Arc<TypeDescription>> {
        let resolved = self.registry.resolve(type_ref.into())?;
        Ok(self.describe_resolved(resolved))
    }

    pub fn describe_type<T: Describable>(&self) -> HyResult<Arc<TypeDescription>> {
        let resolved = self.registry.resolve_type::<T>()?;
        Ok(self.describe_resolved(resolved))
    }

    pub fn describe_value<T: Describable>(&self, value: &T) -> HyResult<Arc<TypeDescription>> {
        self.describe(TypeRef::of(value))
    }

    fn describe_resolved(&self, resolved: ResolvedType) -> Arc<TypeDescription> {
        if let Some(description) = self.cache.lookup(resolved.name) {
            return description;
        }

        debug!("Describing '{}'", resolved.name);
        let description = self.introspector.introspect(resolved);
        self.cache.store(resolved.name, description)
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &DescriptionCache {
        &self.cache
    }
}

/// Builder for [`DescriberFactory`].
pub struct DescriberFactoryBuilder {
    registry: Option<Arc<TypeRegistry>>,
    shared_cache: Arc<dyn SharedCache>,
    local_fallback: bool,
    introspector: Box<dyn Introspect>,
}

impl Default for DescriberFactoryBuilder {
    fn default() -> Self {
        Self {
            registry: None,
            shared_cache: Arc::new(NoSharedCache),
            local_fallback: true,
            introspector: Box::new(Introspector),
        }
    }
}

impl DescriberFactoryBuilder {
    /// Use `registry` instead of one loaded from the inventory.
    pub fn registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn shared_cache(mut self, shared_cache: Arc<dyn SharedCache>) -> Self {
        self.shared_cache = shared_cache;
        self
    }

    pub fn local_fallback(mut self, local_fallback: bool) -> Self {
        self.local_fallback = local_fallback;
        self
    }

    pub fn introspector(mut self, introspector: impl Introspect + 'static) -> Self {
        self.introspector = Box::new(introspector);
        self
    }

    pub fn build(self) -> DescriberFactory {
        DescriberFactory {
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(TypeRegistry::from_inventory())),
            cache: DescriptionCache::new(self.shared_cache, self.local_fallback),
            introspector: self.introspector,
        }
    }
}
