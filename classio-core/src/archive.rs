/*!
Archive: moves encoded containers between memory and storage.

An [`Archive`] pairs a storage adapter with a compression adapter. Declared
records hold one behind [`ArchiveInterface`] so the concrete adapters can be
picked from a [`ContainerConfig`] at declaration time.
*/

use crate::compression::{CompressionAdapter, GzipCompressor, NoCompression};
use crate::config::{CompressionKind, ContainerConfig};
use crate::storage::{LocalFileStorage, StorageAdapter};
use crate::{ClassioError, Result};
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;

/// Storage plus compression for container files
///
/// # Example
/// ```rust
/// use classio_core::archive::create_default_archive;
/// use classio_core::container::ContainerWriter;
///
/// let archive = create_default_archive();
/// let bytes = ContainerWriter::new("doc::Empty").finish()?;
/// let path = std::env::temp_dir().join("classio-archive-doc.clio");
/// archive.write(&bytes, &path)?;
/// assert_eq!(archive.read(&path)?, bytes);
/// # Ok::<(), classio_core::ClassioError>(())
/// ```
pub struct Archive<S, C>
where
    S: StorageAdapter,
    C: CompressionAdapter,
{
    storage: S,
    compressor: C,
}

impl<S, C> Archive<S, C>
where
    S: StorageAdapter,
    C: CompressionAdapter,
{
    pub fn new(storage: S, compressor: C) -> Self {
        Self {
            storage,
            compressor,
        }
    }

    /// Compress and store an encoded container, returning the stored size
    ///
    /// # Errors
    /// * `ClassioError::Compression` - If compression fails
    /// * `ClassioError::Storage` - If saving to storage fails
    pub fn write(&self, container: &[u8], path: &Path) -> Result<usize> {
        let stored = self.compressor.compress(container)?;
        self.storage
            .save(&stored, path)
            .map_err(|e| ClassioError::Storage(format!("Failed to save container: {e}")))?;
        Ok(stored.len())
    }

    /// Load and decompress a container
    ///
    /// # Errors
    /// * `ClassioError::Storage` - If loading from storage fails
    /// * `ClassioError::Compression` - If decompression fails
    pub fn read(&self, path: &Path) -> Result<Bytes> {
        let stored = self
            .storage
            .load(path)
            .map_err(|e| ClassioError::Storage(format!("Failed to load container: {e}")))?;
        Ok(Bytes::from(self.compressor.decompress(&stored)?))
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.storage.exists(path)
    }

    pub fn compression(&self) -> &str {
        self.compressor.algorithm_name()
    }
}

/// Object-safe view of an [`Archive`]
pub trait ArchiveInterface: Send + Sync {
    fn write(&self, container: &[u8], path: &Path) -> Result<usize>;
    fn read(&self, path: &Path) -> Result<Bytes>;
    fn exists(&self, path: &Path) -> bool;
    fn compression(&self) -> &str;
}

impl<S, C> ArchiveInterface for Archive<S, C>
where
    S: StorageAdapter + Send + Sync,
    C: CompressionAdapter + Send + Sync,
{
    fn write(&self, container: &[u8], path: &Path) -> Result<usize> {
        self.write(container, path)
    }

    fn read(&self, path: &Path) -> Result<Bytes> {
        self.read(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.exists(path)
    }

    fn compression(&self) -> &str {
        self.compression()
    }
}

/// Local files, no compression
pub fn create_default_archive() -> Archive<LocalFileStorage, NoCompression> {
    Archive::new(LocalFileStorage::new(), NoCompression::new())
}

/// Build the archive described by `config`
///
/// # Errors
/// * `ClassioError::Validation` - If the configuration is invalid
pub fn create_archive_from_config(config: &ContainerConfig) -> Result<Arc<dyn ArchiveInterface>> {
    config.validate()?;

    let storage = match &config.base_dir {
        Some(base_dir) => LocalFileStorage::with_base_dir(base_dir),
        None => LocalFileStorage::new(),
    };
    let archive: Arc<dyn ArchiveInterface> = match config.compression {
        CompressionKind::None => Arc::new(Archive::new(storage, NoCompression::new())),
        CompressionKind::Gzip => Arc::new(Archive::new(
            storage,
            GzipCompressor::from_level(config.compression_level),
        )),
    };
    Ok(archive)
}
