/*!
Error types for the classio core.
*/

use thiserror::Error;

/// Result type used throughout the classio core.
pub type Result<T> = std::result::Result<T, ClassioError>;

/// Errors raised while declaring records or moving them through containers.
#[derive(Error, Debug)]
pub enum ClassioError {
    /// A constructor parameter carries no type annotation
    #[error("Parameter `{attribute}` has no type annotation")]
    MissingAnnotation { attribute: String },

    /// A constructor parameter is annotated with a union of concrete types
    #[error("Parameter `{attribute}` is annotated with a union type: {annotation}")]
    UnionType {
        attribute: String,
        annotation: String,
    },

    /// No codec could be selected for a parameter
    #[error("No codec provided or inferred for `{attribute}`: {type_name}")]
    UnresolvedCodec {
        attribute: String,
        type_name: String,
    },

    /// The record type already has a binding in this process
    #[error("Record type {type_name} is already declared")]
    AlreadyDeclared { type_name: String },

    /// Codec overrides name attributes the record does not have
    #[error("Codec overrides name unknown attributes: {}", .names.join(", "))]
    UnknownOverride { names: Vec<String> },

    /// The record type has no binding yet
    #[error("Record type {type_name} has not been declared")]
    NotDeclared { type_name: String },

    /// A container has no region for an attribute of the record
    #[error("Container has no region for attribute `{attribute}`")]
    MissingAttribute { attribute: String },

    /// A record instance did not expose one of its declared attributes
    #[error("Record does not expose attribute `{attribute}`")]
    AttributeAccess { attribute: String },

    /// A codec received a value of a type it cannot dump
    #[error("Codec `{codec}` cannot dump a value that is not {expected}")]
    ValueType {
        codec: String,
        expected: &'static str,
    },

    /// A loaded value does not have the type the constructor expects
    #[error("Argument `{attribute}` is not of type {expected}")]
    ArgumentType {
        attribute: String,
        expected: &'static str,
    },

    /// Error raised by a codec implementation
    #[error("Codec error: {0}")]
    Codec(Box<dyn std::error::Error + Send + Sync>),

    /// I/O errors during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Compression/decompression errors
    #[error("Compression error: {0}")]
    Compression(String),

    /// Integrity check failures
    #[error("Integrity check failed for `{attribute}`: expected hash {expected}, got {actual}")]
    IntegrityCheckFailed {
        attribute: String,
        expected: String,
        actual: String,
    },

    /// Invalid container format
    #[error("Invalid container format: {0}")]
    InvalidFormat(String),

    /// Storage adapter errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

impl ClassioError {
    /// Create a new compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Self::Compression(msg.into())
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new invalid format error
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// Wrap an error raised inside a user codec
    pub fn codec<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Codec(err.into())
    }

    /// Whether the error is raised at declaration time rather than by save/load
    pub fn is_declaration_error(&self) -> bool {
        matches!(
            self,
            Self::MissingAnnotation { .. }
                | Self::UnionType { .. }
                | Self::UnresolvedCodec { .. }
                | Self::AlreadyDeclared { .. }
                | Self::UnknownOverride { .. }
        )
    }
}
