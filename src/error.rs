//! Error taxonomy. Every error carries the attribute path it was raised at.

use thiserror::Error;

use crate::path::AttributePath;

/// Failure to turn a schema document node into a type descriptor. Fatal for
/// the resource kind being resolved; there is no partial result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("{path}: unknown schema reference {reference:?}")]
    UnknownReference { path: AttributePath, reference: String },

    #[error("{path}: schema recursion exceeded the depth budget")]
    RecursionOverrun { path: AttributePath },

    #[error("{path}: unsupported schema shape: {reason}")]
    UnsupportedShape { path: AttributePath, reason: String },
}

impl SchemaError {
    pub fn path(&self) -> &AttributePath {
        match self {
            Self::UnknownReference { path, .. }
            | Self::RecursionOverrun { path }
            | Self::UnsupportedShape { path, .. } => path,
        }
    }
}

/// Failure converting a value between the generic tree and the typed model.
/// The first failure in depth-first order aborts the whole conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertError {
    #[error("{path}: cannot use {got} value as {want}")]
    TypeMismatch { path: AttributePath, got: String, want: String },

    #[error("{path}: number cannot be represented exactly as a 64-bit integer or float")]
    InexactNumber { path: AttributePath },

    #[error("{path}: string {text:?} is not a valid number")]
    InvalidNumber { path: AttributePath, text: String },

    #[error("{path}: element type differs from the preceding elements")]
    InconsistentElementType { path: AttributePath },

    #[error("{path}: attribute is not declared by the object type")]
    UnexpectedAttribute { path: AttributePath },

    #[error("{path}: value is unknown and cannot be serialized")]
    UnknownValue { path: AttributePath },
}

impl ConvertError {
    pub fn path(&self) -> &AttributePath {
        match self {
            Self::TypeMismatch { path, .. }
            | Self::InexactNumber { path }
            | Self::InvalidNumber { path, .. }
            | Self::InconsistentElementType { path }
            | Self::UnexpectedAttribute { path }
            | Self::UnknownValue { path } => path,
        }
    }

    /// Same error, re-addressed through `f`.
    pub fn map_path(mut self, f: impl FnOnce(&AttributePath) -> AttributePath) -> Self {
        let path = match &mut self {
            Self::TypeMismatch { path, .. }
            | Self::InexactNumber { path }
            | Self::InvalidNumber { path, .. }
            | Self::InconsistentElementType { path }
            | Self::UnexpectedAttribute { path }
            | Self::UnknownValue { path } => path,
        };
        *path = f(path);
        self
    }

    /// Message without the leading path, for renderers that print the path
    /// separately.
    pub fn message(&self) -> String {
        let full = self.to_string();
        let prefix = format!("{}: ", self.path());
        full.strip_prefix(&prefix).map(str::to_owned).unwrap_or(full)
    }
}

/// Failure to load a schema document from its source.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read schema document: {0}")]
    Io(#[from] std::io::Error),

    #[error("at JSON path {path} → {message}")]
    Parse { path: String, message: String },

    #[error("schema document has neither `definitions` nor `components.schemas`")]
    MissingDefinitions,
}
