//! Instantiation engine: walks a property tree against one input value.
//!
//! The fold is operator-directed. Leaves pass the extracted value through,
//! products extract each field by name and call the composite's constructor
//! with the results in declaration order, unions and intersections apply the
//! configured [`BranchPolicy`], and arrays are rejected.
use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

use crate::config::BranchPolicy;
use crate::error::{ArgumentError, ArgumentErrors, InstantiateError, Result};
use crate::registry::TypeRegistry;
use crate::tree::{Children, PropertyNode};
use crate::types::UserDefinedType;

// ————————————————————————————————————————————————————————————————————————————
// INSTANCES
// ————————————————————————————————————————————————————————————————————————————

/// Result of traversing one node.
#[derive(Debug, Clone)]
pub enum Instance {
    /// A leaf value, passed through unchanged.
    Value(Value),
    /// A constructed composite.
    Object(Object),
}

impl Instance {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Instance::Value(v) => Some(v),
            Instance::Object(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Instance::Object(o) => Some(o),
            Instance::Value(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Instance::Value(Value::Null))
    }

    pub fn type_name(&self) -> Option<&str> {
        self.as_object().map(Object::type_name)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_object().and_then(Object::downcast_ref)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instance::Value(v) => write!(f, "{v}"),
            Instance::Object(o) => write!(f, "<{}>", o.type_name),
        }
    }
}

type DebugFn = fn(&(dyn Any + Send + Sync), &mut fmt::Formatter<'_>) -> fmt::Result;

/// Type-erased constructed value, shareable across threads.
#[derive(Clone)]
pub struct Object {
    type_name: String,
    value: Arc<dyn Any + Send + Sync>,
    debug: DebugFn,
}

impl Object {
    pub fn new<T: Any + fmt::Debug + Send + Sync>(type_name: impl Into<String>, value: T) -> Self {
        Self { type_name: type_name.into(), value: Arc::new(value), debug: debug_as::<T> }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.value).downcast_ref::<T>()
    }

    pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }
}

fn debug_as<T: Any + fmt::Debug>(value: &(dyn Any + Send + Sync), f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value.downcast_ref::<T>() {
        Some(v) => fmt::Debug::fmt(v, f),
        None => f.write_str("<opaque>"),
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.debug)(&*self.value, f)
    }
}

/// Generic composite built for types registered without a constructor.
#[derive(Debug, Clone)]
pub struct Record {
    pub type_name: String,
    pub fields: IndexMap<String, Instance>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&Instance> {
        self.fields.get(name)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ARGUMENTS
// ————————————————————————————————————————————————————————————————————————————

/// Conversion from a traversal result into a constructor argument.
///
/// On failure the instance is handed back so it can be reported.
pub trait FromInstance: Sized {
    fn from_instance(instance: Instance) -> std::result::Result<Self, Instance>;
}

impl FromInstance for Instance {
    fn from_instance(instance: Instance) -> std::result::Result<Self, Instance> {
        Ok(instance)
    }
}

impl FromInstance for Value {
    fn from_instance(instance: Instance) -> std::result::Result<Self, Instance> {
        match instance {
            Instance::Value(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl FromInstance for bool {
    fn from_instance(instance: Instance) -> std::result::Result<Self, Instance> {
        match instance {
            Instance::Value(Value::Bool(b)) => Ok(b),
            other => Err(other),
        }
    }
}

impl FromInstance for i64 {
    fn from_instance(instance: Instance) -> std::result::Result<Self, Instance> {
        match instance.as_value().and_then(Value::as_i64) {
            Some(n) => Ok(n),
            None => Err(instance),
        }
    }
}

impl FromInstance for f64 {
    fn from_instance(instance: Instance) -> std::result::Result<Self, Instance> {
        match instance.as_value().and_then(Value::as_f64) {
            Some(n) => Ok(n),
            None => Err(instance),
        }
    }
}

impl FromInstance for String {
    fn from_instance(instance: Instance) -> std::result::Result<Self, Instance> {
        match instance {
            Instance::Value(Value::String(s)) => Ok(s),
            other => Err(other),
        }
    }
}

impl<T: FromInstance> FromInstance for Option<T> {
    fn from_instance(instance: Instance) -> std::result::Result<Self, Instance> {
        if instance.is_null() {
            return Ok(None);
        }
        T::from_instance(instance).map(Some)
    }
}

impl<T: Any + Send + Sync> FromInstance for Arc<T> {
    fn from_instance(instance: Instance) -> std::result::Result<Self, Instance> {
        match instance.as_object().and_then(Object::downcast_arc::<T>) {
            Some(value) => Ok(value),
            None => Err(instance),
        }
    }
}

/// Ordered, named constructor arguments.
#[derive(Debug)]
pub struct Arguments {
    type_name: String,
    entries: VecDeque<(String, Instance)>,
}

impl Arguments {
    pub fn new(type_name: impl Into<String>, entries: Vec<(String, Instance)>) -> Self {
        Self { type_name: type_name.into(), entries: entries.into() }
    }

    /// Type being constructed.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Arguments not yet taken.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take the next argument, failing fast if it does not convert.
    pub fn next<T: FromInstance>(&mut self) -> Result<T> {
        self.take_with(T::from_instance)
    }

    /// Take the next argument as a clone of a constructed Rust value.
    pub fn next_object<T: Any + Clone>(&mut self) -> Result<T> {
        self.take_with(|instance| match instance.downcast_ref::<T>() {
            Some(value) => Ok(value.clone()),
            None => Err(instance),
        })
    }

    /// Convert every remaining argument at once, reporting all failures together.
    pub fn into_tuple<T: FromArguments>(self) -> Result<T> {
        T::from_arguments(self)
    }

    pub(crate) fn into_instances(self) -> impl Iterator<Item = Instance> {
        self.entries.into_iter().map(|(_, instance)| instance)
    }

    fn take_with<T>(&mut self, convert: impl FnOnce(Instance) -> std::result::Result<T, Instance>) -> Result<T> {
        let Some((name, instance)) = self.entries.pop_front() else {
            return Err(InstantiateError::construct(&self.type_name, "not enough arguments"));
        };
        convert(instance).map_err(|value| ArgumentErrors { errors: vec![ArgumentError { name, value }] }.into())
    }
}

pub trait FromArguments: Sized {
    fn from_arguments(args: Arguments) -> Result<Self>;
}

fn convert_next<T: FromInstance>(
    entries: &mut impl Iterator<Item = (String, Instance)>,
    errors: &mut Vec<ArgumentError>,
) -> Option<T> {
    let (name, instance) = entries.next()?;
    match T::from_instance(instance) {
        Ok(value) => Some(value),
        Err(value) => {
            errors.push(ArgumentError { name, value });
            None
        }
    }
}

macro_rules! tuple_from_arguments {
    ($($t:ident),+) => {
        impl<$($t: FromInstance),+> FromArguments for ($($t,)+) {
            #[allow(non_snake_case)]
            fn from_arguments(args: Arguments) -> Result<Self> {
                let expected = [$(stringify!($t)),+].len();
                if args.len() != expected {
                    return Err(InstantiateError::construct(
                        &args.type_name,
                        format!("expected {expected} arguments, got {}", args.len()),
                    ));
                }
                let type_name = args.type_name;
                let mut entries = args.entries.into_iter();
                let mut errors = Vec::new();
                let ($($t,)+) = ($(convert_next::<$t>(&mut entries, &mut errors),)+);
                if !errors.is_empty() {
                    return Err(ArgumentErrors { errors }.into());
                }
                match ($($t,)+) {
                    ($(Some($t),)+) => Ok(($($t,)+)),
                    _ => Err(InstantiateError::construct(type_name, "not enough arguments")),
                }
            }
        }
    };
}

tuple_from_arguments!(A);
tuple_from_arguments!(A, B);
tuple_from_arguments!(A, B, C);
tuple_from_arguments!(A, B, C, D);
tuple_from_arguments!(A, B, C, D, E);
tuple_from_arguments!(A, B, C, D, E, F);
tuple_from_arguments!(A, B, C, D, E, F, G);
tuple_from_arguments!(A, B, C, D, E, F, G, H);

// ————————————————————————————————————————————————————————————————————————————
// EXTRACTION
// ————————————————————————————————————————————————————————————————————————————

/// Key lookup bridging node names to values inside an input container.
/// A missing key yields `null`.
pub trait Extract {
    fn extract(&self, key: &str, container: &Value) -> Value;
}

impl<F> Extract for F
where
    F: Fn(&str, &Value) -> Value,
{
    fn extract(&self, key: &str, container: &Value) -> Value {
        self(key, container)
    }
}

/// Keyed mappings: object keys, or numeric keys indexing into sequences.
#[derive(Debug, Clone, Copy, Default)]
pub struct MappingExtractor;

impl Extract for MappingExtractor {
    fn extract(&self, key: &str, container: &Value) -> Value {
        match container {
            Value::Object(map) => map.get(key).cloned().unwrap_or(Value::Null),
            Value::Array(items) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }
}

/// Generic decoded objects: property access only.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectExtractor;

impl Extract for ObjectExtractor {
    fn extract(&self, key: &str, container: &Value) -> Value {
        // `Value::get` with a string key only ever reads object properties.
        container.get(key).cloned().unwrap_or(Value::Null)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ENGINE
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy)]
pub struct Engine<'r> {
    registry: &'r TypeRegistry,
    policy: BranchPolicy,
}

impl<'r> Engine<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry, policy: BranchPolicy::default() }
    }

    pub fn with_policy(mut self, policy: BranchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Traverse `tree` against `value`. The root of a built tree is a product
    /// over the target type, so the result is the constructed target.
    pub fn instantiate(&self, tree: &PropertyNode, value: &Value, extract: &dyn Extract) -> Result<Instance> {
        self.visit(tree, value, extract)
    }

    fn visit(&self, node: &PropertyNode, value: &Value, extract: &dyn Extract) -> Result<Instance> {
        trace!(node = node.name(), operator = ?node.operator(), "traversing node");
        match node.children() {
            Children::Leaf => Ok(Instance::Value(value.clone())),
            Children::Fields(fields) => {
                if node.descriptor().is_nullable() && value.is_null() {
                    return Ok(Instance::Value(Value::Null));
                }
                let ty = node
                    .descriptor()
                    .user_defined()
                    .ok_or_else(|| InstantiateError::not_implemented(format!("field list on '{}'", node.name())))?;
                self.construct(ty, fields, value, extract)
            }
            Children::Branches(branches) => match self.policy {
                BranchPolicy::FirstBranch => {
                    let results = branches
                        .iter()
                        .map(|branch| self.visit(branch, value, extract))
                        .collect::<Result<Vec<_>>>()?;
                    first(results, node)
                }
                BranchPolicy::FirstMatch => {
                    let chosen = node
                        .descriptor()
                        .types()
                        .iter()
                        .zip(branches)
                        .find(|(ty, _)| ty.matches(value));
                    match chosen {
                        Some((_, branch)) => self.visit(branch, value, extract),
                        None => Err(unresolved(node, value)),
                    }
                }
            },
            Children::Components(components) => {
                let types = node.descriptor().types();
                match self.policy {
                    BranchPolicy::FirstBranch => {
                        let mut results = Vec::with_capacity(components.len());
                        for (ty, fields) in types.iter().zip(components) {
                            results.push(self.construct_component(ty.as_user_defined(), fields, value, extract)?);
                        }
                        first(results, node)
                    }
                    BranchPolicy::FirstMatch => {
                        let chosen = types.iter().zip(components).find(|(ty, _)| ty.matches(value));
                        match chosen {
                            Some((ty, fields)) => self.construct_component(ty.as_user_defined(), fields, value, extract),
                            None => Err(unresolved(node, value)),
                        }
                    }
                }
            }
            Children::Element(_) => Err(InstantiateError::not_implemented(format!(
                "array instantiation for '{}'",
                node.name()
            ))),
        }
    }

    fn construct_component(
        &self,
        ty: Option<&UserDefinedType>,
        fields: &[PropertyNode],
        value: &Value,
        extract: &dyn Extract,
    ) -> Result<Instance> {
        let ty = ty.ok_or_else(|| InstantiateError::not_implemented("builtin intersection component"))?;
        self.construct(ty, fields, value, extract)
    }

    fn construct(
        &self,
        ty: &UserDefinedType,
        fields: &[PropertyNode],
        value: &Value,
        extract: &dyn Extract,
    ) -> Result<Instance> {
        let mut arguments = Vec::with_capacity(fields.len());
        for field in fields {
            let extracted = extract.extract(field.name(), value);
            arguments.push((field.name().to_owned(), self.visit(field, &extracted, extract)?));
        }
        let def = self
            .registry
            .get(ty.name())
            .ok_or_else(|| InstantiateError::unknown_type(ty.name()))?;
        def.construct(Arguments::new(ty.name(), arguments))
    }
}

fn first(results: Vec<Instance>, node: &PropertyNode) -> Result<Instance> {
    results
        .into_iter()
        .next()
        .ok_or_else(|| InstantiateError::not_implemented(format!("'{}' has no alternatives", node.name())))
}

fn unresolved(node: &PropertyNode, value: &Value) -> InstantiateError {
    InstantiateError::UnresolvedUnion { name: node.name().to_owned(), value: value.clone() }
}
