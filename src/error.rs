use serde_json::Value;
use thiserror::Error;

use crate::engine::Instance;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, InstantiateError>;

/// Every failure the builder, the engine, or the facade can produce.
///
/// All of them abort the whole call; there are no partial results.
#[derive(Debug, Error)]
pub enum InstantiateError {
    /// A declared type name does not resolve in the registry.
    #[error("type '{type_name}' does not exist")]
    UnknownType { type_name: String },

    /// Unsupported algebraic shape, at build time or at traversal time.
    #[error("not implemented: {what}")]
    NotImplemented { what: String },

    /// The tree builder's depth guard tripped.
    #[error("type graph is deeper than {max_depth} levels: {path}")]
    StructuralError { max_depth: usize, path: String },

    /// Malformed text or an out-of-range depth bound.
    #[error("decode error: {message}")]
    DecodeError { message: String },

    /// One or more constructor arguments could not be converted.
    #[error(transparent)]
    Arguments(#[from] ArgumentErrors),

    /// No alternative of a union or intersection accepts the input value.
    #[error("no alternative of '{name}' accepts {value}")]
    UnresolvedUnion { name: String, value: Value },

    /// A constructor rejected its arguments.
    #[error("failed to construct '{type_name}': {message}")]
    Construct { type_name: String, message: String },

    /// A type declaration (string or file) could not be read.
    #[error("invalid type declaration: {message}")]
    Schema { message: String },
}

impl InstantiateError {
    pub fn construct(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Construct { type_name: type_name.into(), message: message.into() }
    }

    pub(crate) fn not_implemented(what: impl Into<String>) -> Self {
        Self::NotImplemented { what: what.into() }
    }

    pub(crate) fn unknown_type(type_name: impl Into<String>) -> Self {
        Self::UnknownType { type_name: type_name.into() }
    }

    /// Stable name of the error kind, used by fixtures and the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownType { .. } => "UnknownType",
            Self::NotImplemented { .. } => "NotImplemented",
            Self::StructuralError { .. } => "StructuralError",
            Self::DecodeError { .. } => "DecodeError",
            Self::Arguments(_) => "ArgumentError",
            Self::UnresolvedUnion { .. } => "UnresolvedUnion",
            Self::Construct { .. } => "Construct",
            Self::Schema { .. } => "Schema",
        }
    }
}

/// One rejected constructor argument.
#[derive(Debug, Clone)]
pub struct ArgumentError {
    pub name: String,
    pub value: Instance,
}

/// Aggregated argument failures for a single constructor call.
#[derive(Debug, Clone, Error)]
#[error("{}", render(.errors))]
pub struct ArgumentErrors {
    pub errors: Vec<ArgumentError>,
}

fn render(errors: &[ArgumentError]) -> String {
    let mut s = String::from("Instantiate error:\n");
    for error in errors {
        s.push_str(&format!("\t{}: {}\n", error.name, error.value));
    }
    s
}
