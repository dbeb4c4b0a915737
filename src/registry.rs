//! Runtime type registry: the host type system the builder introspects.
//!
//! Each registered composite lists its constructor parameters in declaration
//! order, with their declared types and hints, plus an optional constructor
//! function. Composites without a constructor are built as [`Record`]s.
use std::any::Any;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::decl::TypeDecl;
use crate::engine::{Arguments, Instance, Object, Record};
use crate::error::{InstantiateError, Result};
use crate::types::canonical_name;

pub type Constructor = Arc<dyn Fn(Arguments) -> Result<Instance> + Send + Sync>;

/// Static per-parameter metadata, consumed once at tree-build time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Hints {
    /// Lookup key used against input data instead of the parameter name.
    #[serde(default)]
    pub rename: Option<String>,
    /// Composite each element of an `array` parameter expands into.
    #[serde(default)]
    pub element_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    name: String,
    ty: TypeDecl,
    hints: Hints,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeDecl) -> Self {
        Self { name: name.into(), ty, hints: Hints::default() }
    }

    /// `Param::parse("speed", "int|CarSpeed")`
    pub fn parse(name: impl Into<String>, ty: &str) -> Result<Self> {
        Ok(Self::new(name, TypeDecl::parse(ty)?))
    }

    pub fn rename(mut self, key: impl Into<String>) -> Self {
        self.hints.rename = Some(key.into());
        self
    }

    pub fn element_type(mut self, type_name: impl Into<String>) -> Self {
        self.hints.element_type = Some(type_name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeDecl {
        &self.ty
    }

    pub fn hints(&self) -> &Hints {
        &self.hints
    }

    /// The key this parameter is looked up by.
    pub fn key(&self) -> &str {
        self.hints.rename.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Clone)]
pub struct TypeDef {
    name: String,
    params: Vec<Param>,
    constructor: Option<Constructor>,
}

impl TypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let name = canonical_name(&name).to_owned();
        Self { name, params: Vec::new(), constructor: None }
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Install a Rust constructor. Its output is wrapped as an [`Object`].
    pub fn constructor<T, F>(mut self, f: F) -> Self
    where
        T: Any + fmt::Debug + Send + Sync,
        F: Fn(Arguments) -> Result<T> + Send + Sync + 'static,
    {
        let name = self.name.clone();
        self.constructor = Some(Arc::new(move |args| {
            f(args).map(|value| Instance::Object(Object::new(name.clone(), value)))
        }));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    pub fn construct(&self, args: Arguments) -> Result<Instance> {
        match &self.constructor {
            Some(constructor) => constructor(args),
            None => {
                if args.len() != self.params.len() {
                    return Err(InstantiateError::construct(
                        &self.name,
                        format!("expected {} arguments, got {}", self.params.len(), args.len()),
                    ));
                }
                let fields = self
                    .params
                    .iter()
                    .map(|p| p.name.clone())
                    .zip(args.into_instances())
                    .collect::<IndexMap<_, _>>();
                let record = Record { type_name: self.name.clone(), fields };
                Ok(Instance::Object(Object::new(self.name.clone(), record)))
            }
        }
    }
}

impl fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDef")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("constructor", &self.constructor.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, TypeDef>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a composite, replacing any previous definition of the same name.
    pub fn register(&mut self, def: TypeDef) -> Option<TypeDef> {
        self.types.insert(def.name.clone(), def)
    }

    pub fn with(mut self, def: TypeDef) -> Self {
        self.register(def);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(canonical_name(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(canonical_name(name))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.values()
    }

    /// Merge declarations from a JSON declaration file into this registry.
    ///
    /// Existing definitions keep their constructors unless the file redeclares them.
    pub fn extend_from_json_str(&mut self, src: &str) -> Result<()> {
        self.extend_from(src, "declarations")
    }

    fn extend_from(&mut self, src: &str, origin: &str) -> Result<()> {
        let file: DeclarationFile = crate::path_de::from_str_with_path(src, origin)?;
        for entry in file.types {
            let mut def = TypeDef::new(entry.name);
            for p in entry.params {
                def.params.push(Param { name: p.name, ty: p.ty, hints: p.hints });
            }
            self.register(def);
        }
        Ok(())
    }

    pub fn from_json_str(src: &str) -> Result<Self> {
        let mut registry = Self::new();
        registry.extend_from_json_str(src)?;
        Ok(registry)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|error| InstantiateError::Schema {
            message: format!("failed to read {}: {error}", path.display()),
        })?;
        let mut registry = Self::new();
        registry.extend_from(&src, &path.display().to_string())?;
        Ok(registry)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DECLARATION FILE
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeclarationFile {
    types: Vec<TypeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeEntry {
    name: String,
    #[serde(default)]
    params: Vec<ParamEntry>,
}

#[derive(Debug, Deserialize)]
struct ParamEntry {
    name: String,
    #[serde(rename = "type")]
    ty: TypeDecl,
    #[serde(flatten)]
    hints: Hints,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DECLARATIONS: &str = r#"{
        "types": [
            { "name": "\\App\\Tag", "params": [ { "name": "label", "type": "string" } ] },
            { "name": "Post", "params": [
                { "name": "title", "type": "?string", "rename": "post_title" },
                { "name": "tags", "type": "array", "element_type": "App\\Tag" }
            ] }
        ]
    }"#;

    #[test]
    fn loads_declaration_file_in_order() {
        let registry = TypeRegistry::from_json_str(DECLARATIONS).unwrap();
        assert_eq!(registry.len(), 2);
        let names: Vec<_> = registry.iter().map(TypeDef::name).collect();
        assert_eq!(names, ["App\\Tag", "Post"]);

        let post = registry.get("Post").unwrap();
        assert!(!post.has_constructor());
        let params = post.params();
        assert_eq!(params[0].name(), "title");
        assert_eq!(params[0].key(), "post_title");
        assert_eq!(params[0].ty(), &TypeDecl::nullable("string"));
        assert_eq!(params[1].key(), "tags");
        assert_eq!(params[1].hints().element_type.as_deref(), Some("App\\Tag"));
        assert!(registry.contains("\\App\\Tag"));
    }

    #[test]
    fn bad_declarations_report_their_path() {
        let src = r#"{ "types": [ { "name": "A", "params": [ { "name": "x", "type": "int|" } ] } ] }"#;
        let err = TypeRegistry::from_json_str(src).unwrap_err();
        let InstantiateError::Schema { message } = err else { panic!("expected schema error") };
        assert!(message.contains("types[0].params[0]"), "{message}");
    }

    #[test]
    fn records_zip_parameter_names_with_arguments() {
        let registry = TypeRegistry::from_json_str(DECLARATIONS).unwrap();
        let tag = registry.get("App\\Tag").unwrap();
        let args = Arguments::new(
            "App\\Tag",
            vec![("label".into(), Instance::Value(json!("rust")))],
        );
        let instance = tag.construct(args).unwrap();
        let record = instance.downcast_ref::<Record>().unwrap();
        assert_eq!(record.type_name, "App\\Tag");
        assert_eq!(record.get("label").and_then(Instance::as_value), Some(&json!("rust")));
    }

    #[test]
    fn record_arity_mismatch_is_rejected() {
        let registry = TypeRegistry::from_json_str(DECLARATIONS).unwrap();
        let err = registry.get("Post").unwrap().construct(Arguments::new("Post", vec![])).unwrap_err();
        assert_eq!(err.kind(), "Construct");
    }

    #[test]
    fn register_replaces_previous_definition() {
        let mut registry = TypeRegistry::new();
        assert!(registry.register(TypeDef::new("A")).is_none());
        let previous = registry.register(TypeDef::new("\\A").param(Param::new("x", TypeDecl::named("int"))));
        assert!(previous.is_some());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("A").unwrap().params().len(), 1);
    }
}
