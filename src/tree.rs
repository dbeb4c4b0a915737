//! Property tree builder.
//!
//! Expands a registered composite's constructor parameters, in declaration
//! order, into a tree mirroring its full nested shape. The tree is a pure
//! function of the registry's declarations and hints: build it once, share it
//! across any number of instantiation calls.
//!
//! Children depend on the parent's operator:
//! - `NONE` → none
//! - `PRODUCT` → the composite's parameter nodes
//! - `UNION` → one unnamed node per alternative
//! - `INTERSECTION` → one parameter *list* per component
//! - `ARRAY` → one element node (the hinted composite's tree, or a `MIXED` leaf)
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::{DEFAULT_MAX_TREE_DEPTH, MAX_TREE_DEPTH};
use crate::decl::TypeDecl;
use crate::error::{InstantiateError, Result};
use crate::introspect::introspect;
use crate::registry::{Hints, Param, TypeRegistry};
use crate::types::{AlgebraicOperator, BuiltinType, ElementaryType, TypeDescriptor, UserDefinedType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyNode {
    name: String,
    descriptor: TypeDescriptor,
    children: Children,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "nodes", rename_all = "snake_case")]
pub enum Children {
    Leaf,
    Fields(Vec<PropertyNode>),
    Branches(Vec<PropertyNode>),
    Components(Vec<Vec<PropertyNode>>),
    Element(Box<PropertyNode>),
}

impl PropertyNode {
    pub fn new(name: impl Into<String>, descriptor: TypeDescriptor, children: Children) -> Self {
        Self { name: name.into(), descriptor, children }
    }

    /// Lookup key against input data. Empty for root, branch, and element nodes.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn operator(&self) -> AlgebraicOperator {
        self.descriptor.operator()
    }

    pub fn children(&self) -> &Children {
        &self.children
    }

    /// Direct child count; an intersection counts one per component list.
    pub fn arity(&self) -> usize {
        match &self.children {
            Children::Leaf => 0,
            Children::Fields(nodes) | Children::Branches(nodes) => nodes.len(),
            Children::Components(lists) => lists.len(),
            Children::Element(_) => 1,
        }
    }

    /// Fields, branches, or the element node. Empty for leaves and intersections.
    pub fn nodes(&self) -> &[PropertyNode] {
        match &self.children {
            Children::Fields(nodes) | Children::Branches(nodes) => nodes,
            Children::Element(node) => std::slice::from_ref(node),
            Children::Leaf | Children::Components(_) => &[],
        }
    }

    /// Total nodes in this subtree, itself included.
    pub fn size(&self) -> usize {
        let below: usize = match &self.children {
            Children::Leaf => 0,
            Children::Fields(nodes) | Children::Branches(nodes) => nodes.iter().map(Self::size).sum(),
            Children::Components(lists) => lists.iter().flatten().map(Self::size).sum(),
            Children::Element(node) => node.size(),
        };
        1 + below
    }
}

pub struct TreeBuilder<'r> {
    registry: &'r TypeRegistry,
    max_depth: usize,
}

impl<'r> TreeBuilder<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry, max_depth: DEFAULT_MAX_TREE_DEPTH }
    }

    /// Composite nesting allowed before [`InstantiateError::StructuralError`].
    /// Clamped to [`MAX_TREE_DEPTH`].
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        if max_depth > MAX_TREE_DEPTH {
            warn!(requested = max_depth, ceiling = MAX_TREE_DEPTH, "clamping tree depth");
        }
        self.max_depth = max_depth.min(MAX_TREE_DEPTH);
        self
    }

    /// Build the tree for `type_name`. The root is an unnamed `PRODUCT` node.
    pub fn build(&self, type_name: &str) -> Result<PropertyNode> {
        let mut path = Vec::new();
        let tree = self.build_root(type_name, 0, &mut path)?;
        debug!(type_name, nodes = tree.size(), "built property tree");
        Ok(tree)
    }

    fn build_root(&self, type_name: &str, depth: usize, path: &mut Vec<String>) -> Result<PropertyNode> {
        let ty = UserDefinedType::new(type_name, self.registry)?;
        let fields = self.build_params(&ty, depth, path)?;
        Ok(PropertyNode::new("", TypeDescriptor::product(ty), Children::Fields(fields)))
    }

    fn build_params(&self, ty: &UserDefinedType, depth: usize, path: &mut Vec<String>) -> Result<Vec<PropertyNode>> {
        path.push(ty.name().to_owned());
        if depth >= self.max_depth {
            let path = path.join(" -> ");
            warn!(max_depth = self.max_depth, %path, "type graph too deep");
            return Err(InstantiateError::StructuralError { max_depth: self.max_depth, path });
        }
        let def = self
            .registry
            .get(ty.name())
            .ok_or_else(|| InstantiateError::unknown_type(ty.name()))?;
        let nodes = def
            .params()
            .iter()
            .map(|param| self.build_param(param, depth + 1, path))
            .collect::<Result<Vec<_>>>()?;
        path.pop();
        Ok(nodes)
    }

    fn build_param(&self, param: &Param, depth: usize, path: &mut Vec<String>) -> Result<PropertyNode> {
        trace!(param = param.name(), ty = %param.ty(), "expanding parameter");
        self.build_node(param.key(), param.ty(), param.hints(), depth, path)
    }

    fn build_node(
        &self,
        name: &str,
        decl: &TypeDecl,
        hints: &Hints,
        depth: usize,
        path: &mut Vec<String>,
    ) -> Result<PropertyNode> {
        let descriptor = introspect(decl, self.registry)?;
        let children = match descriptor.operator() {
            AlgebraicOperator::None => Children::Leaf,
            AlgebraicOperator::Product => {
                let ty = descriptor
                    .user_defined()
                    .ok_or_else(|| InstantiateError::not_implemented(format!("product over `{decl}`")))?;
                Children::Fields(self.build_params(ty, depth, path)?)
            }
            AlgebraicOperator::Union => {
                let TypeDecl::Union(members) = decl else {
                    return Err(InstantiateError::not_implemented(format!("union over `{decl}`")));
                };
                // Each alternative expands as if it were the whole parameter.
                let branches = members
                    .iter()
                    .map(|member| self.build_node("", member, hints, depth, path))
                    .collect::<Result<Vec<_>>>()?;
                Children::Branches(branches)
            }
            AlgebraicOperator::Intersection => {
                let components = descriptor
                    .types()
                    .iter()
                    .map(|ty| match ty {
                        ElementaryType::UserDefined(ty) => self.build_params(ty, depth, path),
                        ElementaryType::Builtin(b) => Err(InstantiateError::not_implemented(format!(
                            "builtin `{}` in intersection `{decl}`",
                            b.name()
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Children::Components(components)
            }
            AlgebraicOperator::Array => Children::Element(Box::new(self.build_element(hints, depth, path)?)),
        };
        Ok(PropertyNode::new(name, descriptor, children))
    }

    fn build_element(&self, hints: &Hints, depth: usize, path: &mut Vec<String>) -> Result<PropertyNode> {
        match &hints.element_type {
            Some(element_type) => self.build_root(element_type, depth, path),
            None => Ok(PropertyNode::new("", TypeDescriptor::builtin(BuiltinType::Mixed), Children::Leaf)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples;

    fn build(type_name: &str) -> Result<PropertyNode> {
        TreeBuilder::new(&samples::registry()).build(type_name)
    }

    fn type_names(node: &PropertyNode) -> Vec<&str> {
        node.descriptor().types().iter().map(ElementaryType::name).collect()
    }

    #[test]
    fn scalar_holders_have_one_leaf() {
        for (type_name, field, builtin) in [
            ("NullProperty", "nullProperty", "null"),
            ("StringProperty", "value", "string"),
            ("BoolProperty", "value", "bool"),
            ("IntProperty", "value", "int"),
            ("FloatProperty", "value", "float"),
        ] {
            let tree = build(type_name).unwrap();
            assert_eq!(tree.name(), "");
            assert_eq!(tree.operator(), AlgebraicOperator::Product);
            assert_eq!(type_names(&tree), [type_name]);
            assert_eq!(tree.arity(), 1);
            let leaf = &tree.nodes()[0];
            assert_eq!(leaf.name(), field);
            assert_eq!(leaf.operator(), AlgebraicOperator::None);
            assert_eq!(type_names(leaf), [builtin]);
            assert_eq!(leaf.children(), &Children::Leaf);
        }
    }

    #[test]
    fn builtin_union_expands_every_alternative() {
        let tree = build("BuiltinUnionProperty").unwrap();
        let value = &tree.nodes()[0];
        assert_eq!(value.name(), "value");
        assert_eq!(value.operator(), AlgebraicOperator::Union);
        assert_eq!(type_names(value), ["array", "string", "int", "float", "bool", "null"]);

        let branches = value.nodes();
        assert_eq!(branches.len(), 6);
        assert!(branches.iter().all(|b| b.name().is_empty()));

        let array = &branches[0];
        assert_eq!(array.operator(), AlgebraicOperator::Array);
        assert_eq!(type_names(array), ["array"]);
        assert_eq!(array.arity(), 1);
        let mixed = &array.nodes()[0];
        assert_eq!(type_names(mixed), ["mixed"]);
        assert_eq!(mixed.operator(), AlgebraicOperator::None);

        for (branch, builtin) in branches[1..].iter().zip(["string", "int", "float", "bool", "null"]) {
            assert_eq!(branch.operator(), AlgebraicOperator::None);
            assert_eq!(type_names(branch), [builtin]);
        }
    }

    #[test]
    fn nested_composites_become_products() {
        let tree = build("User").unwrap();
        let names: Vec<_> = tree.nodes().iter().map(PropertyNode::name).collect();
        assert_eq!(names, ["id", "email"]);
        for child in tree.nodes() {
            assert_eq!(child.operator(), AlgebraicOperator::Product);
            assert_eq!(child.arity(), 1);
            let grandchild = &child.nodes()[0];
            assert_eq!(grandchild.name(), "value");
            assert_eq!(grandchild.operator(), AlgebraicOperator::None);
        }
        assert_eq!(tree.size(), 5);
    }

    #[test]
    fn build_is_idempotent() {
        let registry = samples::registry();
        let builder = TreeBuilder::new(&registry);
        for type_name in ["User", "Car", "Tagged", "Stamped", "BuiltinUnionProperty"] {
            assert_eq!(builder.build(type_name).unwrap(), builder.build(type_name).unwrap());
        }
    }

    #[test]
    fn union_composite_alternative_expands_its_parameters() {
        let tree = build("Car").unwrap();
        let speed = &tree.nodes()[1];
        assert_eq!(speed.operator(), AlgebraicOperator::Union);
        let branches = speed.nodes();
        assert_eq!(branches[0].operator(), AlgebraicOperator::None);
        assert_eq!(branches[1].operator(), AlgebraicOperator::Product);
        assert_eq!(branches[1].nodes()[0].name(), "value");
    }

    #[test]
    fn intersection_keeps_one_list_per_component() {
        let tree = build("Stamped").unwrap();
        let mark = &tree.nodes()[0];
        assert_eq!(mark.operator(), AlgebraicOperator::Intersection);
        assert_eq!(mark.arity(), 2);
        assert!(mark.nodes().is_empty());
        let Children::Components(lists) = mark.children() else { panic!("expected component lists") };
        assert_eq!(lists[0].iter().map(PropertyNode::name).collect::<Vec<_>>(), ["at"]);
        assert_eq!(lists[1].iter().map(PropertyNode::name).collect::<Vec<_>>(), ["text"]);
    }

    #[test]
    fn arrays_use_element_hint_or_mixed() {
        let tree = build("Tagged").unwrap();
        let tags = &tree.nodes()[0];
        assert_eq!(tags.operator(), AlgebraicOperator::Array);
        let element = &tags.nodes()[0];
        assert_eq!(element.name(), "");
        assert_eq!(element.operator(), AlgebraicOperator::Product);
        assert_eq!(type_names(element), ["Tag"]);
        assert_eq!(element.nodes()[0].name(), "label");

        let plain = &tree.nodes()[1];
        assert_eq!(plain.arity(), 1);
        assert_eq!(type_names(&plain.nodes()[0]), ["mixed"]);
        assert_eq!(plain.nodes()[0].children(), &Children::Leaf);
    }

    #[test]
    fn rename_hint_sets_lookup_key() {
        let tree = build("Renamed").unwrap();
        assert_eq!(tree.nodes()[0].name(), "user_name");
    }

    #[test]
    fn cyclic_graphs_hit_the_depth_guard() {
        let registry = samples::registry();
        let err = TreeBuilder::new(&registry).with_max_depth(8).build("Node").unwrap_err();
        let InstantiateError::StructuralError { max_depth, path } = err else { panic!("expected structural error") };
        assert_eq!(max_depth, 8);
        assert!(path.starts_with("Node -> Node"));
    }

    #[test]
    fn oversized_depth_is_clamped_before_expansion() {
        let registry = samples::registry();
        let err = TreeBuilder::new(&registry).with_max_depth(200_000).build("Node").unwrap_err();
        let InstantiateError::StructuralError { max_depth, path } = err else { panic!("expected structural error") };
        assert_eq!(max_depth, MAX_TREE_DEPTH);
        assert_eq!(path.split(" -> ").count(), MAX_TREE_DEPTH + 1);
    }

    #[test]
    fn depth_guard_allows_declared_depth() {
        let registry = samples::registry();
        // User -> UserId is two composite levels.
        assert!(TreeBuilder::new(&registry).with_max_depth(2).build("User").is_ok());
        assert!(TreeBuilder::new(&registry).with_max_depth(1).build("User").is_err());
    }

    #[test]
    fn unknown_types_fail_without_a_tree() {
        let err = build("Nope").unwrap_err();
        assert_eq!(err.kind(), "UnknownType");
        let err = build("Dangling").unwrap_err();
        assert!(matches!(err, InstantiateError::UnknownType { ref type_name } if type_name == "Missing"));
        let err = build("BadElement").unwrap_err();
        assert!(matches!(err, InstantiateError::UnknownType { ref type_name } if type_name == "NoSuchElement"));
    }

    #[test]
    fn nested_sum_types_fail_at_build() {
        let err = build("BadUnion").unwrap_err();
        assert_eq!(err.kind(), "NotImplemented");
    }

    #[test]
    fn tree_serializes_operators_and_types() {
        let tree = build("IntProperty").unwrap();
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["descriptor"]["operator"], "PRODUCT");
        assert_eq!(json["descriptor"]["types"][0], "IntProperty");
        assert_eq!(json["children"]["kind"], "fields");
        assert_eq!(json["children"]["nodes"][0]["name"], "value");
        assert_eq!(json["children"]["nodes"][0]["children"]["kind"], "leaf");
    }
}
