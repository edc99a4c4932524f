//! Configuration for how declared records are written to disk
//!
//! A [`ContainerConfig`] is attached to a record at declaration time and
//! selects the compression applied around the container and an optional base
//! directory that relative paths resolve against.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Compression applied to a whole container before it reaches storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionKind {
    /// Container bytes are stored as-is
    None,
    /// Container bytes are gzip-compressed
    Gzip,
}

/// Storage settings for a declared record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Compression applied around the container
    pub compression: CompressionKind,
    /// Gzip level (0-9); defaults to 6 when unset
    pub compression_level: Option<u32>,
    /// Base directory for relative container paths
    pub base_dir: Option<PathBuf>,
}

impl ContainerConfig {
    /// Uncompressed containers, paths used as given
    pub fn default_local() -> Self {
        ContainerConfig {
            compression: CompressionKind::None,
            compression_level: None,
            base_dir: None,
        }
    }

    /// Gzip-compressed containers at the default level
    pub fn gzip() -> Self {
        ContainerConfig {
            compression: CompressionKind::Gzip,
            compression_level: None,
            base_dir: None,
        }
    }

    /// Gzip-compressed containers at the given level
    pub fn gzip_with_level(level: u32) -> Self {
        ContainerConfig {
            compression: CompressionKind::Gzip,
            compression_level: Some(level),
            base_dir: None,
        }
    }

    /// Resolve relative container paths against `base_dir`
    pub fn with_base_dir<P: Into<PathBuf>>(mut self, base_dir: P) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        match (self.compression, self.compression_level) {
            (CompressionKind::Gzip, Some(level)) if level > 9 => {
                Err(crate::ClassioError::validation(format!(
                    "gzip compression level must be between 0 and 9, got {level}"
                )))
            }
            (CompressionKind::None, Some(_)) => Err(crate::ClassioError::validation(
                "compression_level requires gzip compression",
            )),
            _ => Ok(()),
        }
    }
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self::default_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_local_config() {
        let config = ContainerConfig::default();
        assert_eq!(config.compression, CompressionKind::None);
        assert!(config.compression_level.is_none());
        assert!(config.base_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_gzip_config() {
        let config = ContainerConfig::gzip();
        assert_eq!(config.compression, CompressionKind::Gzip);
        assert!(config.validate().is_ok());

        let config = ContainerConfig::gzip_with_level(9);
        assert_eq!(config.compression_level, Some(9));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_base_dir() {
        let config = ContainerConfig::gzip().with_base_dir("/var/lib/models");
        assert_eq!(config.base_dir, Some(PathBuf::from("/var/lib/models")));
        assert_eq!(config.compression, CompressionKind::Gzip);
    }

    #[test]
    fn test_validate_rejects_bad_level() {
        let config = ContainerConfig::gzip_with_level(10);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("between 0 and 9"));
    }

    #[test]
    fn test_validate_rejects_level_without_gzip() {
        let mut config = ContainerConfig::default_local();
        config.compression_level = Some(3);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = ContainerConfig::gzip_with_level(3).with_base_dir("data");
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"gzip\""));

        let parsed: ContainerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
