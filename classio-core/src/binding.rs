/*!
Class bindings: the per-record attribute/codec table computed once at
declaration time, and the process-wide cache that holds them.
*/

use crate::config::ContainerConfig;
use crate::container::{ContainerReader, ContainerWriter};
use crate::record::{Arguments, Record, TypeDescriptor};
use crate::resolver::Codec;
use crate::{ClassioError, Result};
use bytes::Bytes;
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

type AccessFn = for<'a> fn(&'a dyn Any, &str) -> Option<&'a dyn Any>;
type ConstructFn = fn(Arguments) -> Result<Box<dyn Any + Send>>;

static BINDINGS: Lazy<RwLock<HashMap<TypeId, Arc<ClassBinding>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// The cached binding for a record type, if it has been declared
pub fn lookup(id: TypeId) -> Option<Arc<ClassBinding>> {
    BINDINGS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .cloned()
}

/// Whether a binding exists for `id`
pub fn is_declared(id: TypeId) -> bool {
    BINDINGS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains_key(&id)
}

/// Cache `binding`; a record type can only be bound once per process
pub(crate) fn insert(binding: ClassBinding) -> Result<Arc<ClassBinding>> {
    let mut bindings = BINDINGS.write().unwrap_or_else(PoisonError::into_inner);
    if bindings.contains_key(&binding.type_id) {
        return Err(ClassioError::AlreadyDeclared {
            type_name: binding.type_name.to_string(),
        });
    }
    let binding = Arc::new(binding);
    bindings.insert(binding.type_id, Arc::clone(&binding));
    Ok(binding)
}

fn erased_access<'a, R: Record>(value: &'a dyn Any, name: &str) -> Option<&'a dyn Any> {
    value.downcast_ref::<R>()?.attribute(name)
}

fn erased_construct<R: Record>(args: Arguments) -> Result<Box<dyn Any + Send>> {
    let record: Box<dyn Any + Send> = Box::new(R::construct(args)?);
    Ok(record)
}

/// One persisted attribute: its name, declared type and codec
#[derive(Clone)]
pub struct AttributeSpec {
    name: String,
    declared_type: TypeDescriptor,
    codec: Codec,
}

impl AttributeSpec {
    pub fn new(name: String, declared_type: TypeDescriptor, codec: Codec) -> Self {
        Self {
            name,
            declared_type,
            codec,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &TypeDescriptor {
        &self.declared_type
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }
}

impl fmt::Debug for AttributeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeSpec")
            .field("name", &self.name)
            .field("declared_type", &self.declared_type.name())
            .field("codec", &self.codec)
            .finish()
    }
}

/// Ordered attribute table for one record type
pub struct ClassBinding {
    type_id: TypeId,
    type_name: &'static str,
    attributes: Vec<AttributeSpec>,
    config: ContainerConfig,
    access: AccessFn,
    construct: ConstructFn,
}

impl ClassBinding {
    pub(crate) fn new<R: Record>(attributes: Vec<AttributeSpec>, config: ContainerConfig) -> Self {
        Self {
            type_id: TypeId::of::<R>(),
            type_name: std::any::type_name::<R>(),
            attributes,
            config,
            access: erased_access::<R>,
            construct: erased_construct::<R>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn attributes(&self) -> &[AttributeSpec] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|spec| spec.name == name)
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Write every attribute of `value` into a new container
    ///
    /// # Errors
    /// * `ClassioError::ValueType` - If `value` is not the bound record type
    /// * `ClassioError::AttributeAccess` - If the record does not expose an attribute
    /// * any error returned by an attribute's codec, unchanged
    pub fn encode(&self, value: &dyn Any) -> Result<Bytes> {
        if (*value).type_id() != self.type_id {
            return Err(ClassioError::ValueType {
                codec: "record".to_string(),
                expected: self.type_name,
            });
        }

        let mut writer = ContainerWriter::new(self.type_name);
        for spec in &self.attributes {
            let field = (self.access)(value, &spec.name).ok_or_else(|| {
                ClassioError::AttributeAccess {
                    attribute: spec.name.clone(),
                }
            })?;
            debug!(record = self.type_name, attribute = %spec.name, codec = spec.codec.name(), "Dumping attribute");
            let mut target = writer.sub_target(&spec.name, spec.codec.name())?;
            spec.codec.dump(field, &mut target)?;
        }
        writer.finish()
    }

    /// Rebuild a record from container bytes
    ///
    /// # Errors
    /// * `ClassioError::MissingAttribute` - If the container lacks a region for an attribute
    /// * any error returned by an attribute's codec or the record constructor, unchanged
    pub fn decode(&self, bytes: Bytes) -> Result<Box<dyn Any + Send>> {
        let reader = ContainerReader::from_bytes(bytes)?;
        if reader.manifest().type_name != self.type_name {
            debug!(
                record = self.type_name,
                stored = %reader.manifest().type_name,
                "Container was written for a different type name"
            );
        }

        let mut args = Arguments::new();
        for spec in &self.attributes {
            let mut source = reader.sub_source(&spec.name)?;
            debug!(record = self.type_name, attribute = %spec.name, codec = spec.codec.name(), "Loading attribute");
            let value = spec.codec.load(&mut source)?;
            args.insert(spec.name.clone(), value);
        }
        (self.construct)(args)
    }
}

impl fmt::Debug for ClassBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassBinding")
            .field("type_name", &self.type_name)
            .field("attributes", &self.attributes)
            .field("config", &self.config)
            .finish()
    }
}
