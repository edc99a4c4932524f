/*!
# classio core

Declarative single-file save/load for plain data records.

A record type is declared once. Declaration reads the record's constructor
signature, picks a codec for every annotated parameter and caches the result
for the rest of the process. Saving writes each attribute through its codec
into one named region of a single container file; loading reads the regions
back and rebuilds the record through its constructor.

- Codecs are chosen per attribute: explicit override, then a record type
  declared earlier (stored as a nested container), then the codec registry,
  then the type's own schema-model hooks
- Containers carry a JSON manifest with a SHA-256 hash per region
- Storage and compression are pluggable adapters

## Usage

```rust
use classio_core::{impl_record, Declaration, ContainerConfig};
use std::collections::HashMap;

pub struct MyData {
    config: HashMap<String, String>,
    count: i64,
}

impl_record!(MyData {
    config: HashMap<String, String>,
    count: i64,
});

let dir = tempfile::tempdir()?;
let declared = Declaration::new()
    .with_config(ContainerConfig::gzip().with_base_dir(dir.path()))
    .declare::<MyData>()?;

let data = MyData {
    config: HashMap::from([("lr".to_string(), "0.1".to_string())]),
    count: 7,
};
declared.save(&data, "my_data.clio")?;

let restored = declared.load("my_data.clio")?;
assert_eq!(restored.config, data.config);
assert_eq!(restored.count, 7);
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

pub mod archive;
pub mod binding;
pub mod codecs;
pub mod compression;
pub mod config;
pub mod container;
pub mod declare;
pub mod error;
pub mod manifest;
pub mod observability;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod storage;
pub mod validator;


pub use archive::{create_archive_from_config, Archive, ArchiveInterface};
pub use binding::{AttributeSpec, ClassBinding};
pub use codecs::{
    BytesCodec, CodecProvider, Compressed, JsonCodec, ModelCodec, PrimitiveCodec, SchemaModel,
    TextCodec,
};
pub use compression::{CompressionAdapter, GzipCompressor, NoCompression};
pub use config::{CompressionKind, ContainerConfig};
pub use container::{ContainerReader, ContainerWriter};
pub use declare::{declare, Declaration, Declared};
pub use error::{ClassioError, Result};
pub use manifest::{ContainerManifest, EntryInfo};
pub use record::{Annotation, Arguments, Parameter, Record, Signature, TypeDescriptor};
pub use registry::CodecRegistry;
pub use resolver::{Codec, CodecKind, CodecResolver, Overrides};
pub use storage::{LocalFileStorage, StorageAdapter};
