// Algebraic type model: elementary types and the descriptors built over them.
// Descriptors carry names only; constructors are looked up in the registry at call time.

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{InstantiateError, Result};
use crate::registry::TypeRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinType {
    Null,
    Bool,
    Int,
    Float,
    String,
    Array,
    Mixed,
}

impl BuiltinType {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "null" => Some(Self::Null),
            "bool" => Some(Self::Bool),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "string" => Some(Self::String),
            "array" => Some(Self::Array),
            "mixed" => Some(Self::Mixed),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Array => "array",
            Self::Mixed => "mixed",
        }
    }

    /// Strict tag check against a decoded value. Integral numbers are not floats.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Null => value.is_null(),
            Self::Bool => value.is_boolean(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Float => value.is_f64(),
            Self::String => value.is_string(),
            Self::Array => value.is_array(),
            Self::Mixed => true,
        }
    }
}

/// Reference to a composite registered in a [`TypeRegistry`].
///
/// Only constructible through [`UserDefinedType::new`], which checks that the
/// name resolves at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserDefinedType {
    name: String,
}

impl UserDefinedType {
    pub fn new(name: &str, registry: &TypeRegistry) -> Result<Self> {
        let name = canonical_name(name);
        if !registry.contains(name) {
            return Err(InstantiateError::unknown_type(name));
        }
        Ok(Self { name: name.to_owned() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Composites are fed from keyed objects.
    pub fn matches(&self, value: &Value) -> bool {
        value.is_object()
    }
}

/// Fully-qualified names may be written with a leading `\`.
pub fn canonical_name(name: &str) -> &str {
    name.strip_prefix('\\').unwrap_or(name)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementaryType {
    Builtin(BuiltinType),
    UserDefined(UserDefinedType),
}

impl ElementaryType {
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin(b) => b.name(),
            Self::UserDefined(u) => u.name(),
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Builtin(b) => b.matches(value),
            Self::UserDefined(u) => u.matches(value),
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin(_))
    }

    pub fn as_user_defined(&self) -> Option<&UserDefinedType> {
        match self {
            Self::UserDefined(u) => Some(u),
            Self::Builtin(_) => None,
        }
    }
}

impl From<BuiltinType> for ElementaryType {
    fn from(b: BuiltinType) -> Self {
        Self::Builtin(b)
    }
}

impl Serialize for ElementaryType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlgebraicOperator {
    None,         // builtin leaf
    Product,      // composite, expanded through its constructor
    Union,        // one of
    Intersection, // all of
    Array,        // homogeneous sequence
}

/// `(operator, elementary types)` for one declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDescriptor {
    operator: AlgebraicOperator,
    types: Vec<ElementaryType>,
}

impl TypeDescriptor {
    pub fn new(operator: AlgebraicOperator, types: Vec<ElementaryType>) -> Self {
        Self { operator, types }
    }

    pub fn builtin(builtin: BuiltinType) -> Self {
        Self::new(AlgebraicOperator::None, vec![builtin.into()])
    }

    pub fn product(ty: UserDefinedType) -> Self {
        Self::new(AlgebraicOperator::Product, vec![ElementaryType::UserDefined(ty)])
    }

    pub fn operator(&self) -> AlgebraicOperator {
        self.operator
    }

    pub fn types(&self) -> &[ElementaryType] {
        &self.types
    }

    /// `[NULL, X]` shape produced for `?X`.
    pub fn is_nullable(&self) -> bool {
        matches!(self.operator, AlgebraicOperator::None | AlgebraicOperator::Product)
            && self.types.len() == 2
            && self.types[0] == ElementaryType::Builtin(BuiltinType::Null)
    }

    /// The composite a `PRODUCT` descriptor expands into.
    pub fn user_defined(&self) -> Option<&UserDefinedType> {
        match self.operator {
            AlgebraicOperator::Product => self.types.last().and_then(ElementaryType::as_user_defined),
            _ => None,
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        self.types.iter().any(|t| t.matches(value))
    }
}
