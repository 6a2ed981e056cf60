//! Runtime configuration for Filmorate.
//!
//! Every value has a compile-time default and can be overridden through an
//! environment variable. Command-line flags take precedence over both.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_CONFIG_DIR: &str = ".config/filmorate/data";
const DEV_DATA_DIR: &str = "./data";

/// File name of the SQLite database inside the data directory.
pub const DB_FILE_NAME: &str = "filmorate.db";

/// Which backend holds the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    /// Process-local. Nothing survives the process.
    Memory,
    #[default]
    Sqlite,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown storage kind '{0}', expected 'sqlite' or 'memory'")]
pub struct UnknownStorageKind(String);

impl FromStr for StorageKind {
    type Err = UnknownStorageKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "sqlite" | "db" => Ok(Self::Sqlite),
            _ => Err(UnknownStorageKind(s.to_string())),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Get the storage backend.
///
/// Priority:
/// 1. `FILMORATE_STORAGE` env variable if set and recognised
/// 2. `sqlite`
pub fn get_storage_kind() -> StorageKind {
    storage_kind_from(std::env::var("FILMORATE_STORAGE").ok())
}

fn storage_kind_from(value: Option<String>) -> StorageKind {
    match value {
        Some(raw) => raw.parse().unwrap_or_else(|e: UnknownStorageKind| {
            tracing::warn!("{e}; using {}", StorageKind::default());
            StorageKind::default()
        }),
        None => StorageKind::default(),
    }
}

/// Get the data directory for persistence.
///
/// Priority:
/// 1. `FILMORATE_DATA_DIR` env variable if set
/// 2. `$HOME/.config/filmorate/data` if HOME is set
/// 3. `./data` as fallback
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("FILMORATE_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(DEFAULT_CONFIG_DIR);
    }

    PathBuf::from(DEV_DATA_DIR)
}

/// Get the SQLite database file.
///
/// `FILMORATE_DB_PATH` wins; otherwise `filmorate.db` inside [`get_data_dir`].
pub fn get_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("FILMORATE_DB_PATH") {
        return PathBuf::from(path);
    }

    get_data_dir().join(DB_FILE_NAME)
}
