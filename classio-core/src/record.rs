/*!
Records: plain data types described by their constructor signature.

A [`Record`] publishes an ordered [`Signature`] of annotated parameters, hands
out its attributes by name, and can be rebuilt from named [`Arguments`]. The
[`impl_record!`](crate::impl_record) macro writes all three for a struct with
named fields.
*/

use crate::codecs::{CodecProvider, ModelCodec, SchemaModel};
use crate::{ClassioError, Result};
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type ModelHooks = fn() -> Arc<dyn CodecProvider>;

fn model_hooks<T: SchemaModel>() -> Arc<dyn CodecProvider> {
    Arc::new(ModelCodec::<T>::new())
}

/// Identity of a concrete attribute type
#[derive(Clone, Copy)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
    model: Option<ModelHooks>,
}

impl TypeDescriptor {
    /// Descriptor for a plain type
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            model: None,
        }
    }

    /// Descriptor for a schema model, carrying its serialization hooks
    pub fn model<T: SchemaModel>() -> Self {
        Self {
            model: Some(model_hooks::<T>),
            ..Self::of::<T>()
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Codec built from the type's own model hooks, if it has any
    pub fn model_codec(&self) -> Option<Arc<dyn CodecProvider>> {
        self.model.map(|hooks| hooks())
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDescriptor {}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("model", &self.model.is_some())
            .finish()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Declared type of a constructor parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// A single concrete type
    Type(TypeDescriptor),
    /// A concrete type that may also be absent
    Optional(TypeDescriptor),
    /// Any of several concrete types
    Union(Vec<TypeDescriptor>),
}

impl Annotation {
    pub fn of<T: Any>() -> Self {
        Self::Type(TypeDescriptor::of::<T>())
    }

    pub fn model<T: SchemaModel>() -> Self {
        Self::Type(TypeDescriptor::model::<T>())
    }

    pub fn optional<T: Any>() -> Self {
        Self::Optional(TypeDescriptor::of::<T>())
    }

    pub fn union(members: Vec<TypeDescriptor>) -> Self {
        Self::Union(members)
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(ty) => write!(f, "{ty}"),
            Self::Optional(ty) => write!(f, "Option<{ty}>"),
            Self::Union(members) => {
                let names: Vec<&str> = members.iter().map(TypeDescriptor::name).collect();
                f.write_str(&names.join(" | "))
            }
        }
    }
}

/// One constructor parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub annotation: Option<Annotation>,
}

impl Parameter {
    pub fn new<S: Into<String>>(name: S, annotation: Annotation) -> Self {
        Self {
            name: name.into(),
            annotation: Some(annotation),
        }
    }

    pub fn unannotated<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            annotation: None,
        }
    }
}

/// Ordered constructor parameters of a record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    parameters: Vec<Parameter>,
}

impl Signature {
    pub fn new(parameters: Vec<Parameter>) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parameters.iter().any(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// Named constructor arguments collected while loading
#[derive(Default)]
pub struct Arguments {
    values: HashMap<String, Box<dyn Any + Send>>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, name: S, value: Box<dyn Any + Send>) {
        self.values.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Remove the argument for `name` as a `T`
    ///
    /// # Errors
    /// * `ClassioError::MissingAttribute` - If no argument was collected for `name`
    /// * `ClassioError::ArgumentType` - If the argument is not a `T`
    pub fn take<T: Any>(&mut self, name: &str) -> Result<T> {
        let value = self
            .values
            .remove(name)
            .ok_or_else(|| ClassioError::MissingAttribute {
                attribute: name.to_string(),
            })?;
        value
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| ClassioError::ArgumentType {
                attribute: name.to_string(),
                expected: type_name::<T>(),
            })
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Arguments").field("names", &names).finish()
    }
}

/// `Option<T>` fields, exposing `T` for [`Annotation::optional`]
pub trait OptionalType {
    type Inner: Any;
}

impl<T: Any> OptionalType for Option<T> {
    type Inner = T;
}

/// A data type that can be declared for single-file save/load
pub trait Record: Any + Send + Sized {
    /// Constructor parameters, in declaration order
    fn signature() -> Signature;

    /// The attribute stored for parameter `name`
    fn attribute(&self, name: &str) -> Option<&dyn Any>;

    /// Build an instance from named arguments
    fn construct(args: Arguments) -> Result<Self>;
}

/// Implement [`Record`] for a struct with named fields.
///
/// Fields marked `#[model]` are annotated as schema models and must implement
/// [`SchemaModel`](crate::SchemaModel). Fields marked `#[optional]` must be an
/// `Option<T>` and are annotated with [`Annotation::optional`]; declaring such
/// a record fails.
///
/// ```rust
/// use classio_core::impl_record;
/// use std::collections::HashMap;
///
/// pub struct MyData {
///     config: HashMap<String, String>,
///     count: i64,
/// }
///
/// impl_record!(MyData {
///     config: HashMap<String, String>,
///     count: i64,
/// });
/// ```
#[macro_export]
macro_rules! impl_record {
    ($name:ident { $( $(#[$kind:ident])? $field:ident : $field_ty:ty ),* $(,)? }) => {
        impl $crate::Record for $name {
            fn signature() -> $crate::Signature {
                $crate::Signature::new(vec![
                    $(
                        $crate::Parameter::new(
                            stringify!($field),
                            $crate::__annotation!($($kind)? ; $field_ty),
                        ),
                    )*
                ])
            }

            fn attribute(&self, name: &str) -> Option<&dyn ::std::any::Any> {
                match name {
                    $( stringify!($field) => Some(&self.$field as &dyn ::std::any::Any), )*
                    _ => None,
                }
            }

            #[allow(unused_mut, unused_variables)]
            fn construct(mut args: $crate::Arguments) -> $crate::Result<Self> {
                Ok(Self {
                    $( $field: args.take::<$field_ty>(stringify!($field))?, )*
                })
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __annotation {
    (model ; $ty:ty) => {
        $crate::Annotation::model::<$ty>()
    };
    (optional ; $ty:ty) => {
        $crate::Annotation::optional::< <$ty as $crate::record::OptionalType>::Inner >()
    };
    ( ; $ty:ty) => {
        $crate::Annotation::of::<$ty>()
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Metrics {
        rmse: f64,
    }

    impl SchemaModel for Metrics {}

    struct Package {
        documentation: String,
        config: HashMap<String, i64>,
        metrics: Metrics,
    }

    crate::impl_record!(Package {
        documentation: String,
        config: HashMap<String, i64>,
        #[model]
        metrics: Metrics,
    });

    #[test]
    fn test_macro_signature() {
        let signature = Package::signature();
        let names: Vec<&str> = signature
            .parameters()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["documentation", "config", "metrics"]);

        assert_eq!(
            signature.parameters()[0].annotation,
            Some(Annotation::of::<String>())
        );
        match &signature.parameters()[2].annotation {
            Some(Annotation::Type(ty)) => assert!(ty.model_codec().is_some()),
            other => panic!("unexpected annotation: {other:?}"),
        }
        assert!(signature.contains("config"));
        assert!(!signature.contains("df"));
    }

    #[test]
    fn test_macro_attribute_access() {
        let package = Package {
            documentation: "docs".to_string(),
            config: HashMap::from([("lr".to_string(), 1)]),
            metrics: Metrics { rmse: 0.5 },
        };
        let doc = package.attribute("documentation").unwrap();
        assert_eq!(doc.downcast_ref::<String>().unwrap(), "docs");
        assert!(package.attribute("missing").is_none());
    }

    #[test]
    fn test_macro_construct() {
        let mut args = Arguments::new();
        args.insert("documentation", Box::new("docs".to_string()));
        args.insert("config", Box::new(HashMap::<String, i64>::new()));
        args.insert("metrics", Box::new(Metrics { rmse: 0.1 }));

        let package = Package::construct(args).unwrap();
        assert_eq!(package.documentation, "docs");
        assert_eq!(package.metrics, Metrics { rmse: 0.1 });
    }

    #[test]
    fn test_arguments_take_errors() {
        let mut args = Arguments::new();
        args.insert("count", Box::new(3i64));
        assert_eq!(args.len(), 1);

        match args.take::<String>("count") {
            Err(ClassioError::ArgumentType { attribute, .. }) => assert_eq!(attribute, "count"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(args.is_empty());
        assert!(matches!(
            args.take::<i64>("count"),
            Err(ClassioError::MissingAttribute { .. })
        ));
    }

    struct Contact {
        name: String,
        nickname: Option<String>,
    }

    crate::impl_record!(Contact {
        name: String,
        #[optional]
        nickname: Option<String>,
    });

    #[test]
    fn test_macro_optional_field() {
        let signature = Contact::signature();
        assert_eq!(
            signature.parameters()[1].annotation,
            Some(Annotation::optional::<String>())
        );

        let contact = Contact {
            name: "ada".to_string(),
            nickname: None,
        };
        let nickname = contact.attribute("nickname").unwrap();
        assert!(nickname.downcast_ref::<Option<String>>().unwrap().is_none());
        assert_eq!(
            contact.attribute("name").unwrap().downcast_ref::<String>().unwrap(),
            "ada"
        );
    }

    #[test]
    fn test_annotation_display() {
        assert_eq!(Annotation::of::<i64>().to_string(), "i64");
        assert_eq!(Annotation::optional::<i64>().to_string(), "Option<i64>");
        let union = Annotation::union(vec![TypeDescriptor::of::<i64>(), TypeDescriptor::of::<f64>()]);
        assert_eq!(union.to_string(), "i64 | f64");
    }

    #[test]
    fn test_descriptor_equality_ignores_hooks() {
        assert_eq!(TypeDescriptor::of::<Metrics>(), TypeDescriptor::model::<Metrics>());
        assert_ne!(TypeDescriptor::of::<i64>(), TypeDescriptor::of::<i32>());
    }
}
