/*!
Storage adapters for container files.

The container encoding is independent of where the bytes end up; this module
defines the port ([`StorageAdapter`]) and the local filesystem adapter.
*/

pub mod local;

use crate::Result;
use std::path::Path;

pub use local::LocalFileStorage;

/// Storage abstraction for saving and loading container bytes
#[cfg_attr(test, mockall::automock)]
pub trait StorageAdapter {
    /// Save container data to the specified location
    ///
    /// # Arguments
    /// * `data` - The encoded (and possibly compressed) container
    /// * `path` - The storage location (interpretation depends on implementation)
    fn save(&self, data: &[u8], path: &Path) -> Result<()>;

    /// Load container data from the specified location
    fn load(&self, path: &Path) -> Result<Vec<u8>>;

    /// Check if a container exists at the specified location
    fn exists(&self, path: &Path) -> bool;
}

/// Memory-based storage adapter for testing
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStorage {
    data: std::sync::Mutex<std::collections::HashMap<std::path::PathBuf, Vec<u8>>>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl StorageAdapter for MemoryStorage {
    fn save(&self, data: &[u8], path: &Path) -> Result<()> {
        let mut storage = self.data.lock().unwrap();
        storage.insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<Vec<u8>> {
        let storage = self.data.lock().unwrap();
        storage.get(path).cloned().ok_or_else(|| {
            crate::ClassioError::storage(format!("Container not found: {}", path.display()))
        })
    }

    fn exists(&self, path: &Path) -> bool {
        let storage = self.data.lock().unwrap();
        storage.contains_key(path)
    }
}
