/*!
Single-artifact container holding one named region per attribute.

Layout:

```text
+--------+---------+--------------+-----------------+---------------------------+
| "CLIO" | version | manifest len | manifest (JSON) | regions, in manifest order |
| 4 B    | u8      | u32 BE       |                 |                           |
+--------+---------+--------------+-----------------+---------------------------+
```

The writer buffers every region in memory and produces the encoded bytes in
[`ContainerWriter::finish`]; dropping an unfinished writer discards it.
*/

use crate::manifest::{ContainerManifest, EntryInfo, CONTAINER_FORMAT_VERSION};
use crate::{ClassioError, Result};
use bytes::{buf::Reader, Buf, BufMut, Bytes, BytesMut};
use std::io::{self, Write};

/// Leading bytes of every container
pub const MAGIC: &[u8; 4] = b"CLIO";

const HEADER_LEN: usize = MAGIC.len() + 1 + 4;

/// Readable view over one region of a container
pub type SubSource = Reader<Bytes>;

struct PendingRegion {
    name: String,
    codec: String,
    data: Vec<u8>,
}

/// Writable slot for one attribute
pub struct SubTarget<'a> {
    buf: &'a mut Vec<u8>,
}

impl Write for SubTarget<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Builds a container region by region
pub struct ContainerWriter {
    type_name: String,
    regions: Vec<PendingRegion>,
}

impl ContainerWriter {
    /// Start a container for a record type
    pub fn new<S: Into<String>>(type_name: S) -> Self {
        Self {
            type_name: type_name.into(),
            regions: Vec::new(),
        }
    }

    /// Open the region for `name`, written by `codec`
    ///
    /// # Errors
    /// * `ClassioError::InvalidFormat` - If a region with the same name was already opened
    pub fn sub_target(&mut self, name: &str, codec: &str) -> Result<SubTarget<'_>> {
        if self.regions.iter().any(|region| region.name == name) {
            return Err(ClassioError::invalid_format(format!(
                "region `{name}` is already present in the container"
            )));
        }
        self.regions.push(PendingRegion {
            name: name.to_string(),
            codec: codec.to_string(),
            data: Vec::new(),
        });
        let region = self
            .regions
            .last_mut()
            .ok_or_else(|| ClassioError::invalid_format("region was not recorded"))?;
        Ok(SubTarget {
            buf: &mut region.data,
        })
    }

    /// Number of regions opened so far
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Encode the manifest and every region into the final container bytes
    pub fn finish(self) -> Result<Bytes> {
        let mut manifest = ContainerManifest::new(self.type_name);
        let mut offset = 0u64;
        for region in &self.regions {
            let length = region.data.len() as u64;
            manifest.entries.push(EntryInfo {
                name: region.name.clone(),
                codec: region.codec.clone(),
                offset,
                length,
                content_hash: ContainerManifest::compute_hash(&region.data),
            });
            offset += length;
        }

        let manifest_json = serde_json::to_vec(&manifest)?;
        let manifest_len = u32::try_from(manifest_json.len())
            .map_err(|_| ClassioError::invalid_format("container manifest is too large"))?;

        let mut out = BytesMut::with_capacity(HEADER_LEN + manifest_json.len() + offset as usize);
        out.put_slice(MAGIC);
        out.put_u8(CONTAINER_FORMAT_VERSION);
        out.put_u32(manifest_len);
        out.put_slice(&manifest_json);
        for region in &self.regions {
            out.put_slice(&region.data);
        }
        Ok(out.freeze())
    }
}

/// Read access to an encoded container
#[derive(Debug, Clone)]
pub struct ContainerReader {
    manifest: ContainerManifest,
    data: Bytes,
}

impl ContainerReader {
    /// Parse a container
    ///
    /// # Errors
    /// * `ClassioError::InvalidFormat` - Bad magic, truncated input, incompatible
    ///   version, or regions that do not match the data section
    /// * `ClassioError::Json` - If the manifest cannot be parsed
    pub fn from_bytes(bytes: Bytes) -> Result<Self> {
        let mut buf = bytes;
        if buf.remaining() < HEADER_LEN {
            return Err(ClassioError::invalid_format("container is truncated"));
        }
        if &buf[..MAGIC.len()] != MAGIC {
            return Err(ClassioError::invalid_format("missing container magic"));
        }
        buf.advance(MAGIC.len());

        let version = buf.get_u8();
        if version > CONTAINER_FORMAT_VERSION {
            return Err(ClassioError::invalid_format(format!(
                "Incompatible container format version: {version} (current: {CONTAINER_FORMAT_VERSION})"
            )));
        }

        let manifest_len = buf.get_u32() as usize;
        if buf.remaining() < manifest_len {
            return Err(ClassioError::invalid_format("container manifest is truncated"));
        }
        let manifest_bytes = buf.split_to(manifest_len);
        let manifest: ContainerManifest = serde_json::from_slice(&manifest_bytes)?;

        if !manifest.is_compatible() {
            return Err(ClassioError::invalid_format(format!(
                "Incompatible container format version: {} (current: {})",
                manifest.format_version, CONTAINER_FORMAT_VERSION
            )));
        }
        manifest.validate()?;
        if manifest.data_len() != buf.remaining() as u64 {
            return Err(ClassioError::invalid_format(format!(
                "data section holds {} bytes but the manifest describes {}",
                buf.remaining(),
                manifest.data_len()
            )));
        }

        Ok(Self {
            manifest,
            data: buf,
        })
    }

    /// The container's manifest
    pub fn manifest(&self) -> &ContainerManifest {
        &self.manifest
    }

    /// Whether a region for `name` exists
    pub fn contains(&self, name: &str) -> bool {
        self.manifest.entry(name).is_some()
    }

    /// Raw bytes of the region for `name`, integrity-checked
    ///
    /// # Errors
    /// * `ClassioError::MissingAttribute` - If the container has no such region
    /// * `ClassioError::IntegrityCheckFailed` - If the region does not match its hash
    pub fn region(&self, name: &str) -> Result<Bytes> {
        let entry = self
            .manifest
            .entry(name)
            .ok_or_else(|| ClassioError::MissingAttribute {
                attribute: name.to_string(),
            })?;
        let start = entry.offset as usize;
        let region = self.data.slice(start..start + entry.length as usize);
        ContainerManifest::verify_entry(entry, &region)?;
        Ok(region)
    }

    /// Open the region for `name` for reading
    pub fn sub_source(&self, name: &str) -> Result<SubSource> {
        Ok(self.region(name)?.reader())
    }

    /// Check every region against its recorded hash
    pub fn verify(&self) -> Result<()> {
        for name in self.manifest.names() {
            self.region(name)?;
        }
        Ok(())
    }
}
