//! Registry of describable types, keyed by canonical identifier.
//!
//! Types deriving `Describe` are submitted to a link-time [`inventory`] and
//! picked up by [`TypeRegistry::from_inventory`]. Types can also be registered
//! explicitly with [`TypeRegistry::register`].

use std::{
    any::TypeId,
    collections::{BTreeMap, HashMap},
};

use log::{debug, info, warn};
use parking_lot::RwLock;

use crate::{
    schema::{Describable, TypeRef, TypeSchema},
    utils::error::{HyError, HyResult},
};

/// Inventory entry emitted for every type deriving `Describe`.
pub struct TypeRegistration {
    pub type_name: &'static str,
    pub type_id: fn() -> TypeId,
    pub schema: fn() -> &'static TypeSchema,
}
inventory::collect!(TypeRegistration);

impl TypeRegistration {
    pub const fn of<T: Describable>() -> Self {
        Self {
            type_name: T::TYPE_NAME,
            type_id: TypeId::of::<T>,
            schema: T::schema,
        }
    }
}

/// Register a hand-written [`Describable`] implementation in the global inventory.
#[macro_export]
macro_rules! register_describable {
    (
        $( $ty:ty ),+
        $(,)?
    ) => {
        $(
            $crate::inventory::submit! {
                $crate::registry::TypeRegistration::of::<$ty>()
            }
        )+
    };
}

/// A type that passed resolution.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedType {
    pub name: &'static str,
    pub schema: &'static TypeSchema,
}

#[derive(Default)]
struct RegistryInner {
    by_name: BTreeMap<&'static str, (TypeId, &'static TypeSchema)>,
    by_id: HashMap<TypeId, &'static str>,
}

/// Thread-safe index of the types that can be described.
#[derive(Default)]
pub struct TypeRegistry {
    inner: RwLock<RegistryInner>,
}

impl TypeRegistry {
    /// Create a registry without any type.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a registry holding every type submitted to the global inventory.
    ///
    /// Name clashes between distinct types are logged and the later
    /// registration is skipped.
    pub fn from_inventory() -> Self {
        let registry = Self::empty();
        for registration in inventory::iter::<TypeRegistration> {
            if let Err(err) = registry.insert(
                registration.type_name,
                (registration.type_id)(),
                (registration.schema)(),
            ) {
                warn!("Skipping inventory registration: {}", err);
            }
        }
        info!(
            "Loaded {} describable type(s) from inventory",
            registry.len()
        );
        registry
    }

    /// Register `T`. Registering the same type twice is a no-op.
    pub fn register<T: Describable>(&self) -> HyResult<()> {
        self.insert(T::TYPE_NAME, TypeId::of::<T>(), T::schema())
    }

    fn insert(
        &self,
        name: &'static str,
        type_id: TypeId,
        schema: &'static TypeSchema,
    ) -> HyResult<()> {
        if name.is_empty() {
            return Err(HyError::InvalidType(name.to_string()));
        }

        let mut inner = self.inner.write();
        match inner.by_name.get(name) {
            Some((existing, _)) if *existing == type_id => Ok(()),
            Some(_) => Err(HyError::DuplicatedType {
                name: name.to_string(),
            }),
            None => {
                inner.by_name.insert(name, (type_id, schema));
                inner.by_id.insert(type_id, name);
                Ok(())
            }
        }
    }

    /// Resolve a caller-supplied reference to a registered type.
    ///
    /// Names and type ids must already be registered. Instances register their
    /// type on first resolution, and fail only when their identifier is empty
    /// ([`HyError::InvalidType`]) or already taken by another type
    /// ([`HyError::DuplicatedType`]).
    pub fn resolve(&self, type_ref: TypeRef<'_>) -> HyResult<ResolvedType> {
        match type_ref {
            TypeRef::Instance(instance) => self.resolve_known(
                instance.type_name(),
                instance.concrete_type_id(),
                instance.type_schema(),
            ),
            TypeRef::Name(name) => {
                let inner = self.inner.read();
                inner
                    .by_name
                    .get_key_value(name)
                    .map(|(name, (_, schema))| ResolvedType {
                        name: *name,
                        schema: *schema,
                    })
                    .ok_or_else(|| HyError::InvalidType(name.to_string()))
            }
            TypeRef::Id(type_id) => {
                let inner = self.inner.read();
                inner
                    .by_id
                    .get(&type_id)
                    .and_then(|name| inner.by_name.get_key_value(name))
                    .map(|(name, (_, schema))| ResolvedType {
                        name: *name,
                        schema: *schema,
                    })
                    .ok_or_else(|| HyError::InvalidType(format!("{:?}", type_id)))
            }
        }
    }

    /// Resolve `T`, registering it if needed. Same rules as for instances.
    pub fn resolve_type<T: Describable>(&self) -> HyResult<ResolvedType> {
        self.resolve_known(T::TYPE_NAME, TypeId::of::<T>(), T::schema())
    }

    fn resolve_known(
        &self,
        name: &'static str,
        type_id: TypeId,
        schema: &'static TypeSchema,
    ) -> HyResult<ResolvedType> {
        if let Some((existing, registered)) = self.inner.read().by_name.get(name) {
            return if *existing == type_id {
                Ok(ResolvedType {
                    name,
                    schema: *registered,
                })
            } else {
                Err(HyError::DuplicatedType {
                    name: name.to_string(),
                })
            };
        }

        self.insert(name, type_id, schema)?;
        debug!("Registered '{}' on first resolution", name);
        Ok(ResolvedType { name, schema })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered identifiers, sorted.
    pub fn type_names(&self) -> Vec<&'static str> {
        self.inner.read().by_name.keys().copied().collect()
    }
}
