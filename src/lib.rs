//! Build strongly-typed object graphs from untyped JSON data.
//!
//! Composites are registered in a [`TypeRegistry`] with their constructor
//! parameters in declaration order. For a target type, the [`TreeBuilder`]
//! resolves every declared parameter type into a [`TypeDescriptor`] and expands
//! it into a [`PropertyNode`] tree; the [`Engine`] then walks that tree against
//! one input value, extracting each parameter by name and calling constructors
//! bottom-up.
//!
//! ```no_run
//! use instantiate::{Instantiator, Param, TypeDef, TypeRegistry, DEFAULT_JSON_DEPTH};
//!
//! #[derive(Debug)]
//! struct Point { x: i64, y: i64 }
//!
//! let registry = TypeRegistry::new().with(
//!     TypeDef::new("Point")
//!         .param(Param::parse("x", "int")?)
//!         .param(Param::parse("y", "int")?)
//!         .constructor(|args| {
//!             let (x, y) = args.into_tuple()?;
//!             Ok(Point { x, y })
//!         }),
//! );
//! let point = Instantiator::new(&registry).from_text(r#"{"x": 1, "y": 2}"#, "Point", DEFAULT_JSON_DEPTH)?;
//! assert_eq!(point.downcast_ref::<Point>().map(|p| p.x + p.y), Some(3));
//! # Ok::<(), instantiate::InstantiateError>(())
//! ```
pub mod config;
pub mod decl;
pub mod engine;
pub mod error;
pub mod facade;
pub mod introspect;
pub mod path_de;
pub mod registry;
pub mod tree;
pub mod types;

#[cfg(test)]
mod samples;

pub use config::{BranchPolicy, Config, DEFAULT_JSON_DEPTH, DEFAULT_MAX_TREE_DEPTH, MAX_JSON_DEPTH, MAX_TREE_DEPTH};
pub use decl::TypeDecl;
pub use engine::{
    Arguments, Engine, Extract, FromArguments, FromInstance, Instance, MappingExtractor, Object, ObjectExtractor,
    Record,
};
pub use error::{ArgumentError, ArgumentErrors, InstantiateError, Result};
pub use facade::{Instantiator, decode};
pub use introspect::introspect;
pub use registry::{Hints, Param, TypeDef, TypeRegistry};
pub use tree::{Children, PropertyNode, TreeBuilder};
pub use types::{AlgebraicOperator, BuiltinType, ElementaryType, TypeDescriptor, UserDefinedType};
