/// Character introducing an annotation inside a documentation string.
pub const ANNOTATION_MARKER: char = '@';

/// Key under which every [`crate::annotations::AnnotationsBag`] stores the field name.
pub const NAME_ANNOTATION_KEY: &str = "name";

/// Name of the environment variable containing the path to the configuration file.
/// If not set, defaults to
///  (1) on Linux and macOS: `$XDG_CONFIG_HOME/hydesc/config.toml` or `$HOME/.config/hydesc/config.toml`
///  (2) on Windows: `%APPDATA%\hydesc\config.toml`
pub const ENV_CONFIG_PATH: &str = "HYDESC_CONFIG_PATH";

/// Magic bytes at the start of every record written by the disk cache.
pub const DISK_CACHE_MAGIC: [u8; 4] = *b"HYDC";

/// Version of the disk cache record layout. Records with another version are ignored.
pub const DISK_CACHE_FORMAT_VERSION: u16 = 1;

/// Extension of the disk cache record files.
pub const DISK_CACHE_EXTENSION: &str = "hyd";

/// Default zstd level used by the disk cache.
pub const DISK_CACHE_DEFAULT_COMPRESSION: i32 = 3;
