use crate::{
    cache::SharedCache,
    description::TypeDescription,
    utils::error::{HyError, HyResult},
};

/// Shared cache backend that is never available.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSharedCache;

impl SharedCache for NoSharedCache {
    fn exists(&self) -> bool {
        false
    }

    fn has(&self, _key: &str) -> HyResult<bool> {
        Ok(false)
    }

    fn get(&self, _key: &str) -> HyResult<Option<TypeDescription>> {
        Ok(None)
    }

    fn put(&self, key: &str, _value: &TypeDescription) -> HyResult<()> {
        Err(HyError::CacheUnavailable(format!(
            "no shared cache configured to store '{}'",
            key
        )))
    }
}
