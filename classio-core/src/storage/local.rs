/*!
Local filesystem storage adapter implementation.
*/

use super::StorageAdapter;
use crate::{ClassioError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Local filesystem storage adapter
///
/// Containers are stored as plain files. Missing parent directories are
/// created on save.
///
/// # Example
/// ```rust
/// use classio_core::storage::{LocalFileStorage, StorageAdapter};
/// use std::path::Path;
///
/// let dir = std::env::temp_dir().join("classio-doc");
/// let storage = LocalFileStorage::with_base_dir(&dir);
/// storage.save(b"container bytes", Path::new("models/iris.clio"))?;
/// assert!(storage.exists(Path::new("models/iris.clio")));
/// # Ok::<(), classio_core::ClassioError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct LocalFileStorage {
    /// Optional base directory for relative container paths
    base_dir: Option<PathBuf>,
}

impl LocalFileStorage {
    /// Create a new local file storage adapter without a base directory
    ///
    /// Paths provided to save/load will be used as-is.
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    /// Create a new local file storage adapter with a base directory
    ///
    /// Relative paths are resolved against the base directory; absolute
    /// paths replace it.
    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: Some(base_dir.as_ref().to_path_buf()),
        }
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) => base.join(path),
            None => path.to_path_buf(),
        }
    }

    fn ensure_parent_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    ClassioError::storage(format!(
                        "Failed to create directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        Ok(())
    }
}

impl StorageAdapter for LocalFileStorage {
    fn save(&self, data: &[u8], path: &Path) -> Result<()> {
        let full_path = self.resolve_path(path);

        self.ensure_parent_dir(&full_path)?;

        fs::write(&full_path, data).map_err(|e| {
            ClassioError::storage(format!(
                "Failed to write container to {}: {}",
                full_path.display(),
                e
            ))
        })
    }

    fn load(&self, path: &Path) -> Result<Vec<u8>> {
        let full_path = self.resolve_path(path);

        fs::read(&full_path).map_err(|e| {
            ClassioError::storage(format!(
                "Failed to read container from {}: {}",
                full_path.display(),
                e
            ))
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve_path(path).exists()
    }
}
