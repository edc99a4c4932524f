/*!
Signature validation: turns a record's constructor signature into the ordered
list of attributes to persist.
*/

use crate::record::{Annotation, Signature, TypeDescriptor};
use crate::{ClassioError, Result};

/// Check a signature against the declared overrides and return `(name, type)`
/// pairs in declaration order.
///
/// # Errors
/// * `ClassioError::UnknownOverride` - If an override names no parameter
/// * `ClassioError::Validation` - If two parameters share a name
/// * `ClassioError::MissingAnnotation` - If a parameter has no annotation
/// * `ClassioError::UnionType` - If a parameter is a union of distinct types,
///   or an optional type
pub fn validate<'a, I>(signature: &Signature, override_names: I) -> Result<Vec<(String, TypeDescriptor)>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut unknown: Vec<String> = override_names
        .into_iter()
        .filter(|name| !signature.contains(name))
        .map(str::to_string)
        .collect();
    if !unknown.is_empty() {
        unknown.sort();
        return Err(ClassioError::UnknownOverride { names: unknown });
    }

    let mut attributes: Vec<(String, TypeDescriptor)> = Vec::with_capacity(signature.len());
    for parameter in signature.parameters() {
        if attributes.iter().any(|(name, _)| *name == parameter.name) {
            return Err(ClassioError::validation(format!(
                "parameter `{}` is declared more than once",
                parameter.name
            )));
        }

        let annotation = parameter
            .annotation
            .as_ref()
            .ok_or_else(|| ClassioError::MissingAnnotation {
                attribute: parameter.name.clone(),
            })?;

        let declared = concrete_type(&parameter.name, annotation)?;
        attributes.push((parameter.name.clone(), declared));
    }
    Ok(attributes)
}

fn concrete_type(name: &str, annotation: &Annotation) -> Result<TypeDescriptor> {
    let union_error = || ClassioError::UnionType {
        attribute: name.to_string(),
        annotation: annotation.to_string(),
    };

    match annotation {
        Annotation::Type(ty) => Ok(*ty),
        // `T | None` is a union with the absent value.
        Annotation::Optional(_) => Err(union_error()),
        Annotation::Union(members) => {
            let mut distinct: Vec<TypeDescriptor> = Vec::new();
            for member in members {
                if !distinct.contains(member) {
                    distinct.push(*member);
                }
            }
            match distinct.as_slice() {
                [single] => Ok(*single),
                [] => Err(ClassioError::MissingAnnotation {
                    attribute: name.to_string(),
                }),
                _ => Err(union_error()),
            }
        }
    }
}
