//! Opaque key-value storage for the provider's persisted session.
//!
//! DESIGN
//! ======
//! The provider treats storage as a string map; it serializes the session
//! itself. `FileStorage` keeps the whole map in one JSON object file and
//! serializes read-modify-write cycles behind an async lock so concurrent
//! writers cannot interleave.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use tokio::sync::Mutex as AsyncMutex;

use super::ProviderError;

#[async_trait::async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ProviderError>;
    async fn set_item(&self, key: &str, value: &str) -> Result<(), ProviderError>;
    async fn remove_item(&self, key: &str) -> Result<(), ProviderError>;
}

// =============================================================================
// MEMORY
// =============================================================================

/// Process-local storage. Sessions do not survive a restart.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ProviderError> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), ProviderError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), ProviderError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}

// =============================================================================
// FILE
// =============================================================================

/// JSON-file storage. A missing file reads as an empty map.
pub struct FileStorage {
    path: PathBuf,
    lock: AsyncMutex<()>,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: AsyncMutex::new(()) }
    }

    async fn read_map(&self) -> Result<HashMap<String, String>, ProviderError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| ProviderError::Storage(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(ProviderError::Storage(e.to_string())),
        }
    }

    async fn write_map(&self, map: &HashMap<String, String>) -> Result<(), ProviderError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ProviderError::Storage(e.to_string()))?;
        }
        let bytes = serde_json::to_vec_pretty(map).map_err(|e| ProviderError::Storage(e.to_string()))?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| ProviderError::Storage(e.to_string()))
    }
}

#[async_trait::async_trait]
impl SessionStorage for FileStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ProviderError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_map().await?.remove(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), ProviderError> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        map.insert(key.to_owned(), value.to_owned());
        self.write_map(&map).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), ProviderError> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        if map.remove(key).is_some() {
            self.write_map(&map).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
