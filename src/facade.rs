//! The three entry points: keyed mappings, decoded objects, and JSON text.
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::{Config, MAX_JSON_DEPTH};
use crate::engine::{Engine, Extract, Instance, MappingExtractor, ObjectExtractor};
use crate::error::{InstantiateError, Result};
use crate::registry::TypeRegistry;
use crate::tree::{PropertyNode, TreeBuilder};

pub use crate::config::DEFAULT_JSON_DEPTH;

/// Builds trees and instances against one registry.
///
/// Trees are rebuilt on every call; callers that want reuse can keep the
/// result of [`Instantiator::build_tree`] and call [`Instantiator::instantiate_with`].
#[derive(Debug, Clone, Copy)]
pub struct Instantiator<'r> {
    registry: &'r TypeRegistry,
    config: Config,
}

impl<'r> Instantiator<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry, config: Config::default() }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn build_tree(&self, type_name: &str) -> Result<PropertyNode> {
        TreeBuilder::new(self.registry)
            .with_max_depth(self.config.max_tree_depth)
            .build(type_name)
    }

    pub fn instantiate_with(&self, tree: &PropertyNode, value: &Value, extract: &dyn Extract) -> Result<Instance> {
        Engine::new(self.registry)
            .with_policy(self.config.branch_policy)
            .instantiate(tree, value, extract)
    }

    pub fn from_mapping(&self, mapping: &Map<String, Value>, type_name: &str) -> Result<Instance> {
        let tree = self.build_tree(type_name)?;
        self.instantiate_with(&tree, &Value::Object(mapping.clone()), &MappingExtractor)
    }

    pub fn from_object(&self, object: &Value, type_name: &str) -> Result<Instance> {
        let tree = self.build_tree(type_name)?;
        self.instantiate_with(&tree, object, &ObjectExtractor)
    }

    /// Decode `text` with at most `max_depth` levels of nesting, then
    /// delegate to [`Instantiator::from_object`].
    pub fn from_text(&self, text: &str, type_name: &str, max_depth: usize) -> Result<Instance> {
        let object = decode(text, max_depth)?;
        self.from_object(&object, type_name)
    }
}

/// Decode JSON text, rejecting nesting deeper than `max_depth`.
///
/// Each array or object opens one level; scalars sit at depth zero. Bounds
/// above [`MAX_JSON_DEPTH`] are clamped to it.
pub fn decode(text: &str, max_depth: usize) -> Result<Value> {
    if max_depth < 1 {
        return Err(decode_error(format!("depth {max_depth} is not a natural number")));
    }
    let limit = max_depth.min(MAX_JSON_DEPTH);
    let depth = nesting_depth(text);
    if depth > limit {
        return Err(decode_error(format!("maximum depth {limit} exceeded ({depth})")));
    }

    let mut json = serde_json::Deserializer::from_str(text);
    // The scan above bounds nesting; the stacker grows the stack while parsing.
    json.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut json))
        .map_err(|error| decode_error(error.to_string()))?;
    json.end().map_err(|error| decode_error(error.to_string()))?;
    Ok(value)
}

// Bracket depth outside string literals. Malformed text is left to the parser.
fn nesting_depth(text: &str) -> usize {
    let (mut depth, mut max) = (0usize, 0usize);
    let (mut in_string, mut escaped) = (false, false);
    for b in text.bytes() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                max = max.max(depth);
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max
}

fn decode_error(message: String) -> InstantiateError {
    InstantiateError::DecodeError { message }
}
