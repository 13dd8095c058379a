mod local;
mod memory;

pub use local::LocalStore;
pub use memory::MemoryStore;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("store error: {0}")]
    Internal(String),
}

/// Small device-local string storage, the equivalent of the app's
/// async key/value storage. Values survive restarts for `LocalStore`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. Returns `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write (create or overwrite) a value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a value. No-op if absent.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Keys become file names, so keep them to a safe alphabet.
pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    let ok = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !key.starts_with('.');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

// -- Configuration --

/// Configuration for device storage.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Directory holding one file per key. When `None`, use the default
    /// data directory.
    pub local_data_dir: Option<PathBuf>,
    /// Keep everything in memory; nothing survives the process.
    pub ephemeral: bool,
}

/// Default data directory: `$XDG_DATA_HOME/lovemission`, else
/// `~/.local/share/lovemission`, else `./lovemission`.
pub fn default_data_dir() -> PathBuf {
    let base = if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg)
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".local/share")
    } else {
        PathBuf::from(".")
    };
    base.join("lovemission")
}

// -- Factory --

pub fn create_store(config: &StoreConfig) -> Arc<dyn KeyValueStore> {
    if config.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(LocalStore::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_validation() {
        assert!(validate_key("isLoggedInLoveMission").is_ok());
        assert!(validate_key("session.json").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("a/b").is_err());
    }

    #[tokio::test]
    async fn factory_honours_ephemeral() {
        let store = create_store(&StoreConfig {
            local_data_dir: None,
            ephemeral: true,
        });
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn default_dir_ends_with_app_name() {
        assert!(default_data_dir().ends_with("lovemission"));
    }
}
