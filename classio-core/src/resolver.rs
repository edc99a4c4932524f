/*!
Codec resolution: picks the codec for one attribute from its declared type.

Resolution order, first match wins:

1. an explicit override for the attribute name;
2. a record type already declared in this process (nested container);
3. an exact-type entry in the [`CodecRegistry`];
4. the type's own schema-model hooks.
*/

use crate::binding::{self, ClassBinding};
use crate::codecs::CodecProvider;
use crate::record::TypeDescriptor;
use crate::registry::CodecRegistry;
use crate::{ClassioError, Result};
use bytes::Bytes;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

/// Codec overrides keyed by attribute name
pub type Overrides = BTreeMap<String, Arc<dyn CodecProvider>>;

/// Which resolution step produced a codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    Override,
    Declared,
    Registry,
    Model,
}

/// The codec chosen for an attribute
#[derive(Clone)]
pub enum Codec {
    /// Supplied explicitly at declaration time
    Override(Arc<dyn CodecProvider>),
    /// The attribute is itself a declared record, written as a nested container
    Declared(Arc<ClassBinding>),
    /// Found in the codec registry
    Registry(Arc<dyn CodecProvider>),
    /// Built from the type's schema-model hooks
    Model(Arc<dyn CodecProvider>),
}

impl Codec {
    pub fn kind(&self) -> CodecKind {
        match self {
            Self::Override(_) => CodecKind::Override,
            Self::Declared(_) => CodecKind::Declared,
            Self::Registry(_) => CodecKind::Registry,
            Self::Model(_) => CodecKind::Model,
        }
    }

    /// Name recorded in the container manifest
    pub fn name(&self) -> &str {
        match self {
            Self::Declared(_) => "record",
            Self::Override(codec) | Self::Registry(codec) | Self::Model(codec) => codec.name(),
        }
    }

    pub fn dump(&self, value: &dyn Any, target: &mut dyn Write) -> Result<()> {
        match self {
            Self::Declared(binding) => {
                let nested = binding.encode(value)?;
                target.write_all(&nested)?;
                Ok(())
            }
            Self::Override(codec) | Self::Registry(codec) | Self::Model(codec) => {
                codec.dump(value, target)
            }
        }
    }

    pub fn load(&self, source: &mut dyn Read) -> Result<Box<dyn Any + Send>> {
        match self {
            Self::Declared(binding) => {
                let mut nested = Vec::new();
                source.read_to_end(&mut nested)?;
                binding.decode(Bytes::from(nested))
            }
            Self::Override(codec) | Self::Registry(codec) | Self::Model(codec) => {
                codec.load(source)
            }
        }
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declared(binding) => f
                .debug_tuple("Declared")
                .field(&binding.type_name())
                .finish(),
            _ => f
                .debug_tuple(&format!("{:?}", self.kind()))
                .field(&self.name())
                .finish(),
        }
    }
}

/// Resolves codecs against one registry and the process-wide bindings
#[derive(Debug, Clone)]
pub struct CodecResolver {
    registry: Arc<CodecRegistry>,
}

impl CodecResolver {
    pub fn new(registry: Arc<CodecRegistry>) -> Self {
        Self { registry }
    }

    /// Select the codec for attribute `name` of type `declared_type`
    ///
    /// # Errors
    /// * `ClassioError::UnresolvedCodec` - If no step matches
    pub fn resolve(
        &self,
        name: &str,
        declared_type: &TypeDescriptor,
        overrides: &Overrides,
    ) -> Result<Codec> {
        if let Some(codec) = overrides.get(name) {
            return Ok(Codec::Override(Arc::clone(codec)));
        }
        if let Some(nested) = binding::lookup(declared_type.type_id()) {
            return Ok(Codec::Declared(nested));
        }
        if let Some(codec) = self.registry.get(declared_type.type_id()) {
            return Ok(Codec::Registry(codec));
        }
        if let Some(codec) = declared_type.model_codec() {
            return Ok(Codec::Model(codec));
        }
        Err(ClassioError::UnresolvedCodec {
            attribute: name.to_string(),
            type_name: declared_type.name().to_string(),
        })
    }
}

impl Default for CodecResolver {
    fn default() -> Self {
        Self::new(CodecRegistry::shared())
    }
}
