//! Directory-backed shared cache, usable across processes.
//!
//! Each description is stored in its own file:
//!
//! ```text
//! magic (4 bytes) | format version (u16, LE) | zstd( borsh(key) borsh(description) )
//! ```
//!
//! Writes go through a temporary file renamed over the target, so readers only
//! ever observe complete records. Unreadable, foreign or corrupted records are
//! treated as missing.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use borsh::{BorshDeserialize, BorshSerialize};
use log::debug;

use crate::{
    cache::SharedCache,
    description::TypeDescription,
    magic::{
        DISK_CACHE_DEFAULT_COMPRESSION, DISK_CACHE_EXTENSION, DISK_CACHE_FORMAT_VERSION,
        DISK_CACHE_MAGIC,
    },
    utils::error::{HyError, HyResult},
};

const HEADER_LEN: usize = DISK_CACHE_MAGIC.len() + 2;

#[derive(Debug)]
pub struct DiskSharedCache {
    root: PathBuf,
    compression_level: i32,
    tmp_counter: AtomicUsize,
}

fn unavailable(path: &Path, err: impl std::fmt::Display) -> HyError {
    HyError::CacheUnavailable(format!("{}: {}", path.display(), err))
}

impl DiskSharedCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_compression(root, DISK_CACHE_DEFAULT_COMPRESSION)
    }

    pub fn with_compression(root: impl Into<PathBuf>, compression_level: i32) -> Self {
        Self {
            root: root.into(),
            compression_level,
            tmp_counter: AtomicUsize::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record holding `key`.
    ///
    /// Characters outside `[A-Za-z0-9_-]` are replaced by `.`, so
    /// `proto::Banner` maps to `proto..Banner.hyd`. The key itself is stored in
    /// the record and checked on read.
    pub fn record_path(&self, key: &str) -> PathBuf {
        let mut file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '-') {
                    c
                } else {
                    '.'
                }
            })
            .collect();
        file_name.push('.');
        file_name.push_str(DISK_CACHE_EXTENSION);
        self.root.join(file_name)
    }

    fn encode(&self, key: &str, value: &TypeDescription) -> HyResult<Vec<u8>> {
        let mut payload = Vec::new();
        key.to_string()
            .serialize(&mut payload)
            .and_then(|_| value.serialize(&mut payload))
            .map_err(|e| HyError::Unknown(format!("Failed to encode description: {}", e)))?;

        let compressed = zstd::encode_all(payload.as_slice(), self.compression_level)
            .map_err(|e| HyError::Unknown(format!("Failed to compress description: {}", e)))?;

        let mut record = Vec::with_capacity(HEADER_LEN + compressed.len());
        record.extend_from_slice(&DISK_CACHE_MAGIC);
        record.extend_from_slice(&DISK_CACHE_FORMAT_VERSION.to_le_bytes());
        record.extend_from_slice(&compressed);
        Ok(record)
    }

    fn decode(key: &str, record: &[u8]) -> Option<TypeDescription> {
        if record.len() < HEADER_LEN || record[..DISK_CACHE_MAGIC.len()] != DISK_CACHE_MAGIC {
            return None;
        }
        let version = u16::from_le_bytes([record[4], record[5]]);
        if version != DISK_CACHE_FORMAT_VERSION {
            debug!(
                "Ignoring record for '{}' with format version {}",
                key, version
            );
            return None;
        }

        let payload = zstd::decode_all(&record[HEADER_LEN..]).ok()?;
        let mut cursor = payload.as_slice();
        let stored_key = String::deserialize(&mut cursor).ok()?;
        if stored_key != key {
            debug!(
                "Record for '{}' holds '{}' instead, ignoring",
                key, stored_key
            );
            return None;
        }
        TypeDescription::deserialize(&mut cursor).ok()
    }
}

impl SharedCache for DiskSharedCache {
    fn exists(&self) -> bool {
        std::fs::create_dir_all(&self.root).is_ok() && self.root.is_dir()
    }

    fn has(&self, key: &str) -> HyResult<bool> {
        Ok(self.record_path(key).is_file())
    }

    fn get(&self, key: &str) -> HyResult<Option<TypeDescription>> {
        let path = self.record_path(key);
        let record = match std::fs::read(&path) {
            Ok(record) => record,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(unavailable(&path, e)),
        };

        let description = Self::decode(key, &record);
        if description.is_none() {
            debug!("Unreadable cache record '{}', ignoring", path.display());
        }
        Ok(description)
    }

    fn put(&self, key: &str, value: &TypeDescription) -> HyResult<()> {
        let path = self.record_path(key);
        let record = self.encode(key, value)?;

        let tmp_path = path.with_extension(format!(
            "{}.{}.tmp",
            std::process::id(),
            self.tmp_counter.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::write(&tmp_path, record).map_err(|e| unavailable(&tmp_path, e))?;
        std::fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            unavailable(&path, e)
        })
    }
}
