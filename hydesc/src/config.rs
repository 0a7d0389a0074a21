use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::{
    cache::{DiskSharedCache, MemorySharedCache, NoSharedCache, SharedCache},
    magic::{DISK_CACHE_DEFAULT_COMPRESSION, ENV_CONFIG_PATH},
    utils::error::{HyError, HyResult},
};

/// Selection of the shared cache backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum SharedCacheConfig {
    /// No shared cache.
    #[default]
    None,
    /// In-process cache, private to the describer built from this configuration.
    Memory,
    /// Directory of cache records shared between processes.
    Disk {
        path: PathBuf,
        #[serde(default = "default_compression_level")]
        compression_level: i32,
    },
}

fn default_compression_level() -> i32 {
    DISK_CACHE_DEFAULT_COMPRESSION
}

fn default_local_fallback() -> bool {
    true
}

impl SharedCacheConfig {
    /// Instantiate the configured backend.
    pub fn build(&self) -> Arc<dyn SharedCache> {
        match self {
            SharedCacheConfig::None => Arc::new(NoSharedCache),
            SharedCacheConfig::Memory => Arc::new(MemorySharedCache::new()),
            SharedCacheConfig::Disk {
                path,
                compression_level,
            } => Arc::new(DiskSharedCache::with_compression(
                path.clone(),
                *compression_level,
            )),
        }
    }
}

/// Configuration of a [`crate::DescriberFactory`].
///
/// ```toml
/// local_fallback = true
///
/// [shared_cache]
/// backend = "disk"
/// path = "/var/cache/hydesc"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriberConfig {
    /// Keep descriptions in a process-local map when the shared cache is
    /// unavailable.
    #[serde(default = "default_local_fallback")]
    pub local_fallback: bool,

    #[serde(default)]
    pub shared_cache: SharedCacheConfig,
}

impl Default for DescriberConfig {
    fn default() -> Self {
        Self {
            local_fallback: default_local_fallback(),
            shared_cache: SharedCacheConfig::default(),
        }
    }
}

impl DescriberConfig {
    /// Location of the configuration file: `$HYDESC_CONFIG_PATH` if set,
    /// otherwise `hydesc/config.toml` under the user configuration directory.
    pub fn default_path() -> PathBuf {
        if let Some(path) = std::env::var_os(ENV_CONFIG_PATH) {
            return path.into();
        }

        #[cfg(target_os = "windows")]
        let base = std::env::var_os("APPDATA").map(PathBuf::from);
        #[cfg(not(target_os = "windows"))]
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| Path::new(&home).join(".config")));

        base.unwrap_or_default().join("hydesc").join("config.toml")
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Load a configuration from a TOML file.
    pub fn load_from_toml(path: &Path) -> HyResult<Self> {
        let toml_str = std::fs::read_to_string(path)?;

        Self::from_toml_str(&toml_str).map_err(|e| HyError::ConfigParseError {
            source: e,
            file: path.display().to_string(),
        })
    }

    /// Load the configuration at [`Self::default_path`], or the defaults if
    /// there is no such file.
    pub fn load_or_default() -> HyResult<Self> {
        let path = Self::default_path();
        if path.is_file() {
            Self::load_from_toml(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the configuration to a TOML file.
    pub fn save_to_toml(&self, path: &Path) -> HyResult<()> {
        let toml_str = toml::to_string(self).map_err(|e| {
            HyError::Unknown(format!(
                "Failed during serialization of TOML to path `{}`: {}",
                path.display(),
                e
            ))
        })?;

        // Attempt to create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, toml_str)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use parking_lot::Mutex;

    use super::*;

    /// Serializes the tests touching the process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Set (or remove) environment variables for the duration of a test.
    struct EnvGuard {
        saved: Vec<(&'static str, Option<OsString>)>,
    }

    impl EnvGuard {
        fn set(vars: &[(&'static str, Option<&Path>)]) -> Self {
            let saved = vars
                .iter()
                .map(|(key, _)| (*key, std::env::var_os(key)))
                .collect();
            for (key, value) in vars {
                // SAFETY: callers hold ENV_LOCK, no other test reads these variables.
                unsafe {
                    match value {
                        Some(value) => std::env::set_var(key, value),
                        None => std::env::remove_var(key),
                    }
                }
            }
            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in &self.saved {
                // SAFETY: see `EnvGuard::set`.
                unsafe {
                    match value {
                        Some(value) => std::env::set_var(key, value),
                        None => std::env::remove_var(key),
                    }
                }
            }
        }
    }

    #[test]
    fn empty_document_gives_defaults() {
        let config = DescriberConfig::from_toml_str("").unwrap();
        assert_eq!(config, DescriberConfig::default());
        assert!(config.local_fallback);
        assert_eq!(config.shared_cache, SharedCacheConfig::None);
    }

    #[test]
    fn parses_disk_backend() {
        let config = DescriberConfig::from_toml_str(
            r#"
            local_fallback = false

            [shared_cache]
            backend = "disk"
            path = "/var/cache/hydesc"
            "#,
        )
        .unwrap();

        assert!(!config.local_fallback);
        assert_eq!(
            config.shared_cache,
            SharedCacheConfig::Disk {
                path: PathBuf::from("/var/cache/hydesc"),
                compression_level: DISK_CACHE_DEFAULT_COMPRESSION,
            }
        );
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(DescriberConfig::from_toml_str("[shared_cache]\nbackend = \"redis\"").is_err());
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("config.toml");
        let config = DescriberConfig {
            local_fallback: false,
            shared_cache: SharedCacheConfig::Memory,
        };

        config.save_to_toml(&path).unwrap();
        assert_eq!(DescriberConfig::load_from_toml(&path).unwrap(), config);
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "local_fallback = \"maybe\"").unwrap();

        match DescriberConfig::load_from_toml(&path) {
            Err(HyError::ConfigParseError { file, .. }) => {
                assert_eq!(file, path.display().to_string())
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn env_variable_overrides_default_path() {
        let _lock = ENV_LOCK.lock();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        let _env = EnvGuard::set(&[(ENV_CONFIG_PATH, Some(path.as_path()))]);

        assert_eq!(DescriberConfig::default_path(), path);

        let config = DescriberConfig {
            local_fallback: false,
            shared_cache: SharedCacheConfig::Disk {
                path: dir.path().join("records"),
                compression_level: 5,
            },
        };
        config.save_to_toml(&path).unwrap();
        assert_eq!(DescriberConfig::load_or_default().unwrap(), config);
    }

    #[test]
    fn missing_config_file_gives_defaults() {
        let _lock = ENV_LOCK.lock();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let _env = EnvGuard::set(&[(ENV_CONFIG_PATH, Some(path.as_path()))]);

        assert!(!path.exists());
        assert_eq!(
            DescriberConfig::load_or_default().unwrap(),
            DescriberConfig::default()
        );
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn default_path_follows_xdg_then_home() {
        let _lock = ENV_LOCK.lock();
        let dir = tempfile::tempdir().unwrap();
        let xdg = dir.path().join("xdg");
        let home = dir.path().join("home");

        {
            let _env = EnvGuard::set(&[
                (ENV_CONFIG_PATH, None),
                ("XDG_CONFIG_HOME", Some(xdg.as_path())),
                ("HOME", Some(home.as_path())),
            ]);
            assert_eq!(
                DescriberConfig::default_path(),
                xdg.join("hydesc").join("config.toml")
            );
        }

        let _env = EnvGuard::set(&[
            (ENV_CONFIG_PATH, None),
            ("XDG_CONFIG_HOME", None),
            ("HOME", Some(home.as_path())),
        ]);
        assert_eq!(
            DescriberConfig::default_path(),
            home.join(".config").join("hydesc").join("config.toml")
        );
    }
}
