/*!
Declaration: binds a record type to its codecs once and hands out the
save/load entry points.

```rust
use classio_core::{impl_record, Declaration};
use std::collections::HashMap;

pub struct MyData {
    config: HashMap<String, String>,
    count: i64,
}

impl_record!(MyData {
    config: HashMap<String, String>,
    count: i64,
});

let declared = Declaration::new().declare::<MyData>()?;
let path = std::env::temp_dir().join("classio-declare-doc");
declared.save(
    &MyData { config: HashMap::from([("a".into(), "1".into())]), count: 3 },
    &path,
)?;
let loaded = declared.load(&path)?;
assert_eq!(loaded.count, 3);
# Ok::<(), classio_core::ClassioError>(())
```
*/

use crate::archive::{create_archive_from_config, ArchiveInterface};
use crate::binding::{self, AttributeSpec, ClassBinding};
use crate::codecs::CodecProvider;
use crate::config::ContainerConfig;
use crate::container::ContainerReader;
use crate::manifest::ContainerManifest;
use crate::observability;
use crate::record::Record;
use crate::registry::CodecRegistry;
use crate::resolver::{CodecResolver, Overrides};
use crate::validator;
use crate::{ClassioError, Result};
use std::any::{type_name, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Declaration-time options for a record type
#[derive(Clone)]
pub struct Declaration {
    overrides: Overrides,
    registry: Arc<CodecRegistry>,
    config: ContainerConfig,
}

impl Declaration {
    /// No overrides, the built-in registry, uncompressed local files
    pub fn new() -> Self {
        Self {
            overrides: Overrides::new(),
            registry: CodecRegistry::shared(),
            config: ContainerConfig::default(),
        }
    }

    /// Use `codec` for attribute `name` regardless of its type
    pub fn with_override<S, C>(self, name: S, codec: C) -> Self
    where
        S: Into<String>,
        C: CodecProvider + 'static,
    {
        self.with_shared_override(name, Arc::new(codec))
    }

    /// Like [`Declaration::with_override`], for a codec shared with other declarations
    pub fn with_shared_override<S: Into<String>>(
        mut self,
        name: S,
        codec: Arc<dyn CodecProvider>,
    ) -> Self {
        self.overrides.insert(name.into(), codec);
        self
    }

    /// Resolve attribute types against `registry` instead of the built-in table
    pub fn with_registry(mut self, registry: Arc<CodecRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    /// Validate `R`'s signature and resolve a codec per attribute, without
    /// caching anything
    pub fn bind<R: Record>(&self) -> Result<ClassBinding> {
        self.config.validate()?;

        let signature = R::signature();
        let attributes = validator::validate(&signature, self.overrides.keys().map(String::as_str))?;

        let resolver = CodecResolver::new(Arc::clone(&self.registry));
        let specs = attributes
            .into_iter()
            .map(|(name, declared_type)| {
                let codec = resolver.resolve(&name, &declared_type, &self.overrides)?;
                Ok(AttributeSpec::new(name, declared_type, codec))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ClassBinding::new::<R>(specs, self.config.clone()))
    }

    /// Bind `R` and cache the binding for the rest of the process
    ///
    /// Nothing is cached when any step fails.
    ///
    /// # Errors
    /// * `ClassioError::AlreadyDeclared` - If `R` was declared before
    /// * `ClassioError::UnknownOverride` - If an override names no parameter of `R`
    /// * `ClassioError::MissingAnnotation` / `ClassioError::UnionType` - If the signature is invalid
    /// * `ClassioError::UnresolvedCodec` - If an attribute has no codec
    pub fn declare<R: Record>(self) -> Result<Declared<R>> {
        if binding::is_declared(TypeId::of::<R>()) {
            return Err(ClassioError::AlreadyDeclared {
                type_name: type_name::<R>().to_string(),
            });
        }

        let binding = binding::insert(self.bind::<R>()?)?;
        info!(
            record = binding.type_name(),
            attributes = binding.attributes().len(),
            "Declared record"
        );
        Declared::from_binding(binding)
    }
}

impl Default for Declaration {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

/// Declare `R` with no overrides and default settings
pub fn declare<R: Record>() -> Result<Declared<R>> {
    Declaration::new().declare()
}

/// Save/load entry points for a declared record type
pub struct Declared<R> {
    binding: Arc<ClassBinding>,
    archive: Arc<dyn ArchiveInterface>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Declared<R> {
    fn from_binding(binding: Arc<ClassBinding>) -> Result<Self> {
        let archive = create_archive_from_config(binding.config())?;
        Ok(Self {
            binding,
            archive,
            _record: PhantomData,
        })
    }

    /// Handle for a record type declared earlier in the process
    ///
    /// # Errors
    /// * `ClassioError::NotDeclared` - If `R` has not been declared
    pub fn lookup() -> Result<Self> {
        let binding =
            binding::lookup(TypeId::of::<R>()).ok_or_else(|| ClassioError::NotDeclared {
                type_name: type_name::<R>().to_string(),
            })?;
        Self::from_binding(binding)
    }

    pub fn binding(&self) -> &ClassBinding {
        &self.binding
    }

    /// Write every attribute of `value` into a single container at `path`
    pub fn save<P: AsRef<Path>>(&self, value: &R, path: P) -> Result<()> {
        let path = path.as_ref();
        let result = self
            .binding
            .encode(value)
            .and_then(|container| self.archive.write(&container, path));

        match result {
            Ok(stored) => {
                info!(record = self.binding.type_name(), path = %path.display(), size = stored, "Saved container");
                observability::record_save(stored);
                Ok(())
            }
            Err(e) => {
                error!(record = self.binding.type_name(), path = %path.display(), error = %e, "Failed to save container");
                observability::record_save_error();
                Err(e)
            }
        }
    }

    /// Rebuild a `R` from the container at `path`
    ///
    /// # Errors
    /// * `ClassioError::MissingAttribute` - If the container lacks an attribute's region
    /// * any storage, format or codec error, unchanged
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<R> {
        let path = path.as_ref();
        let result = self.archive.read(path).and_then(|container| {
            let size = container.len();
            // Bindings are cached under `TypeId::of::<R>()`, so decode builds an `R`
            let record = self
                .binding
                .decode(container)?
                .downcast::<R>()
                .map_err(|_| {
                    ClassioError::invalid_format(format!(
                        "binding for {} did not produce a {}",
                        self.binding.type_name(),
                        type_name::<R>()
                    ))
                })?;
            Ok((*record, size))
        });

        match result {
            Ok((record, size)) => {
                info!(record = self.binding.type_name(), path = %path.display(), size, "Loaded container");
                observability::record_load(size);
                Ok(record)
            }
            Err(e) => {
                error!(record = self.binding.type_name(), path = %path.display(), error = %e, "Failed to load container");
                observability::record_load_error();
                Err(e)
            }
        }
    }

    /// Read the manifest of the container at `path` without loading attributes
    pub fn inspect<P: AsRef<Path>>(&self, path: P) -> Result<ContainerManifest> {
        let container = self.archive.read(path.as_ref())?;
        Ok(ContainerReader::from_bytes(container)?.manifest().clone())
    }

    /// Check that the container at `path` parses and every region matches its hash
    pub fn verify<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let container = self.archive.read(path.as_ref())?;
        ContainerReader::from_bytes(container)?.verify()
    }

    pub fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        self.archive.exists(path.as_ref())
    }
}

impl<R> Clone for Declared<R> {
    fn clone(&self) -> Self {
        Self {
            binding: Arc::clone(&self.binding),
            archive: Arc::clone(&self.archive),
            _record: PhantomData,
        }
    }
}

impl<R> fmt::Debug for Declared<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declared")
            .field("binding", &self.binding)
            .field("compression", &self.archive.compression())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::TextCodec;
    use crate::record::{Annotation, Arguments, Parameter, Signature};
    use crate::resolver::CodecKind;
    use std::any::Any;
    use std::collections::HashMap;

    struct Plain {
        config: HashMap<String, String>,
        count: i64,
    }

    crate::impl_record!(Plain {
        config: HashMap<String, String>,
        count: i64,
    });

    #[test]
    fn test_bind_resolves_each_attribute() {
        let binding = Declaration::new().bind::<Plain>().unwrap();
        let kinds: Vec<(&str, CodecKind, &str)> = binding
            .attributes()
            .iter()
            .map(|spec| (spec.name(), spec.codec().kind(), spec.codec().name()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("config", CodecKind::Registry, "json"),
                ("count", CodecKind::Registry, "primitive"),
            ]
        );
        assert!(!binding::is_declared(TypeId::of::<Plain>()));
    }

    #[test]
    fn test_bind_is_stable() {
        let declaration = Declaration::new().with_override("count", TextCodec);
        let first = declaration.bind::<Plain>().unwrap();
        let second = declaration.bind::<Plain>().unwrap();
        let describe = |binding: &ClassBinding| {
            binding
                .attributes()
                .iter()
                .map(|spec| format!("{}:{}:{}", spec.name(), spec.declared_type(), spec.codec().name()))
                .collect::<Vec<_>>()
        };
        assert_eq!(describe(&first), describe(&second));
        assert_eq!(first.attribute("count").unwrap().codec().kind(), CodecKind::Override);
    }

    struct Twice {
        label: String,
    }

    crate::impl_record!(Twice { label: String });

    #[test]
    fn test_declare_twice_fails() {
        let declared = declare::<Twice>().unwrap();
        assert_eq!(declared.binding().attributes().len(), 1);

        match declare::<Twice>() {
            Err(ClassioError::AlreadyDeclared { type_name }) => assert!(type_name.ends_with("Twice")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(Declared::<Twice>::lookup().is_ok());
    }

    struct Unannotated {
        value: i64,
    }

    impl Record for Unannotated {
        fn signature() -> Signature {
            Signature::new(vec![Parameter::unannotated("value")])
        }

        fn attribute(&self, name: &str) -> Option<&dyn Any> {
            (name == "value").then_some(&self.value as &dyn Any)
        }

        fn construct(mut args: Arguments) -> Result<Self> {
            Ok(Self {
                value: args.take("value")?,
            })
        }
    }

    #[test]
    fn test_failed_declaration_caches_nothing() {
        assert!(matches!(
            declare::<Unannotated>(),
            Err(ClassioError::MissingAnnotation { .. })
        ));
        assert!(matches!(
            Declared::<Unannotated>::lookup(),
            Err(ClassioError::NotDeclared { .. })
        ));
    }

    struct NeverDeclared {
        value: i64,
    }

    crate::impl_record!(NeverDeclared { value: i64 });

    #[test]
    fn test_lookup_undeclared() {
        match Declared::<NeverDeclared>::lookup() {
            Err(ClassioError::NotDeclared { type_name }) => {
                assert!(type_name.ends_with("NeverDeclared"))
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    struct BadOverride {
        value: i64,
    }

    impl Record for BadOverride {
        fn signature() -> Signature {
            Signature::new(vec![Parameter::new("value", Annotation::of::<i64>())])
        }

        fn attribute(&self, name: &str) -> Option<&dyn Any> {
            (name == "value").then_some(&self.value as &dyn Any)
        }

        fn construct(mut args: Arguments) -> Result<Self> {
            Ok(Self {
                value: args.take("value")?,
            })
        }
    }

    #[test]
    fn test_unknown_override_fails_declaration() {
        let result = Declaration::new()
            .with_override("valeu", TextCodec)
            .declare::<BadOverride>();
        match result {
            Err(ClassioError::UnknownOverride { names }) => assert_eq!(names, vec!["valeu"]),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!binding::is_declared(TypeId::of::<BadOverride>()));
    }

    #[test]
    fn test_invalid_config_fails_declaration() {
        struct Configured {
            value: i64,
        }
        crate::impl_record!(Configured { value: i64 });

        let result = Declaration::new()
            .with_config(ContainerConfig::gzip_with_level(42))
            .declare::<Configured>();
        assert!(matches!(result, Err(ClassioError::Validation(_))));
        assert!(!binding::is_declared(TypeId::of::<Configured>()));
    }

    #[test]
    fn test_optional_field_fails_declaration() {
        struct Profile {
            name: String,
            nickname: Option<String>,
        }
        crate::impl_record!(Profile {
            name: String,
            #[optional]
            nickname: Option<String>,
        });

        match declare::<Profile>() {
            Err(ClassioError::UnionType { attribute, annotation }) => {
                assert_eq!(attribute, "nickname");
                assert!(annotation.starts_with("Option<"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!binding::is_declared(TypeId::of::<Profile>()));
    }

    #[test]
    fn test_load_through_mismatched_binding() {
        struct Left {
            value: i64,
        }
        crate::impl_record!(Left { value: i64 });

        struct Right {
            value: i64,
        }
        crate::impl_record!(Right { value: i64 });

        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("right.clio");
        let right = Declaration::new().bind::<Right>().unwrap();
        std::fs::write(&path, right.encode(&Right { value: 5 }).unwrap()).unwrap();

        let declared = Declared::<Left>::from_binding(Arc::new(right)).unwrap();
        match declared.load(&path) {
            Err(ClassioError::InvalidFormat(msg)) => assert!(msg.contains("Left")),
            Ok(left) => panic!("loaded {} through a foreign binding", left.value),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}
