/*!
Container manifest: the index written at the head of every container.
*/

use crate::{ClassioError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Current container format version for compatibility tracking
pub const CONTAINER_FORMAT_VERSION: u8 = 1;

/// One named region of a container
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Attribute name the region belongs to
    pub name: String,

    /// Name of the codec that wrote the region
    pub codec: String,

    /// Offset of the region, relative to the start of the data section
    pub offset: u64,

    /// Length of the region in bytes
    pub length: u64,

    /// SHA-256 of the region bytes
    pub content_hash: String,
}

/// Index of a container: identity, provenance and one entry per region
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ContainerManifest {
    /// Format version for compatibility (current: 1)
    pub format_version: u8,

    /// Unique identifier for this container
    pub container_id: String,

    /// When the container was written
    pub created_at: DateTime<Utc>,

    /// Rust type name of the record that was saved
    pub type_name: String,

    /// Regions in write order
    pub entries: Vec<EntryInfo>,
}

impl ContainerManifest {
    /// Create an empty manifest for a record type
    pub fn new<S: Into<String>>(type_name: S) -> Self {
        Self {
            format_version: CONTAINER_FORMAT_VERSION,
            container_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            type_name: type_name.into(),
            entries: Vec::new(),
        }
    }

    /// Look up the entry for an attribute
    pub fn entry(&self, name: &str) -> Option<&EntryInfo> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Attribute names in write order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Total size of the data section
    pub fn data_len(&self) -> u64 {
        self.entries.iter().map(|entry| entry.length).sum()
    }

    /// Compute SHA-256 hash of the provided data as lowercase hex
    pub fn compute_hash(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("{:x}", hasher.finalize())
    }

    /// Verify region bytes against the hash recorded for `entry`
    pub fn verify_entry(entry: &EntryInfo, data: &[u8]) -> Result<()> {
        let computed_hash = Self::compute_hash(data);
        if computed_hash == entry.content_hash {
            Ok(())
        } else {
            Err(ClassioError::IntegrityCheckFailed {
                attribute: entry.name.clone(),
                expected: entry.content_hash.clone(),
                actual: computed_hash,
            })
        }
    }

    /// Check structural consistency: unique names, contiguous regions
    pub fn validate(&self) -> Result<()> {
        if self.container_id.is_empty() {
            return Err(ClassioError::invalid_format("container_id cannot be empty"));
        }
        let mut expected_offset = 0u64;
        for (index, entry) in self.entries.iter().enumerate() {
            if self.entries[..index].iter().any(|e| e.name == entry.name) {
                return Err(ClassioError::invalid_format(format!(
                    "duplicate region `{}`",
                    entry.name
                )));
            }
            if entry.offset != expected_offset {
                return Err(ClassioError::invalid_format(format!(
                    "region `{}` starts at {} but {} was expected",
                    entry.name, entry.offset, expected_offset
                )));
            }
            expected_offset = entry.offset.checked_add(entry.length).ok_or_else(|| {
                ClassioError::invalid_format(format!("region `{}` overflows", entry.name))
            })?;
        }
        Ok(())
    }

    /// Check if this manifest is compatible with the current format version
    pub fn is_compatible(&self) -> bool {
        self.format_version <= CONTAINER_FORMAT_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, offset: u64, data: &[u8]) -> EntryInfo {
        EntryInfo {
            name: name.to_string(),
            codec: "text".to_string(),
            offset,
            length: data.len() as u64,
            content_hash: ContainerManifest::compute_hash(data),
        }
    }

    #[test]
    fn test_manifest_creation() {
        let manifest = ContainerManifest::new("demo::MyData");
        assert_eq!(manifest.type_name, "demo::MyData");
        assert_eq!(manifest.format_version, CONTAINER_FORMAT_VERSION);
        assert!(!manifest.container_id.is_empty());
        assert!(manifest.entries.is_empty());
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_content_hash() {
        assert_eq!(
            ContainerManifest::compute_hash(b"test data"),
            "916f0027a575074ce72a331777c3478d6513f786a591bd892da1a577bf2335f9"
        );
    }

    #[test]
    fn test_verify_entry() {
        let e = entry("config", 0, b"{\"a\":\"1\"}");
        assert!(ContainerManifest::verify_entry(&e, b"{\"a\":\"1\"}").is_ok());

        let err = ContainerManifest::verify_entry(&e, b"{\"a\":\"2\"}").unwrap_err();
        match err {
            ClassioError::IntegrityCheckFailed { attribute, .. } => assert_eq!(attribute, "config"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_layout() {
        let mut manifest = ContainerManifest::new("T");
        manifest.entries.push(entry("a", 0, b"abc"));
        manifest.entries.push(entry("b", 3, b"de"));
        assert!(manifest.validate().is_ok());
        assert_eq!(manifest.data_len(), 5);
        assert_eq!(manifest.names().collect::<Vec<_>>(), vec!["a", "b"]);

        manifest.entries.push(entry("a", 5, b"x"));
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_gap() {
        let mut manifest = ContainerManifest::new("T");
        manifest.entries.push(entry("a", 0, b"abc"));
        manifest.entries.push(entry("b", 4, b"de"));
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("region `b`"));
    }

    #[test]
    fn test_compatibility() {
        let mut manifest = ContainerManifest::new("T");
        assert!(manifest.is_compatible());
        manifest.format_version = CONTAINER_FORMAT_VERSION + 1;
        assert!(!manifest.is_compatible());
    }

    #[test]
    fn test_manifest_serde_roundtrip() {
        let mut manifest = ContainerManifest::new("T");
        manifest.entries.push(entry("a", 0, b"abc"));
        let json = serde_json::to_string(&manifest).unwrap();
        let parsed: ContainerManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, manifest);
    }
}
