use crate::decl::TypeDecl;
use crate::error::{InstantiateError, Result};
use crate::registry::TypeRegistry;
use crate::types::{AlgebraicOperator, BuiltinType, ElementaryType, TypeDescriptor, UserDefinedType};

/// Map one declared parameter type to its algebraic descriptor.
pub fn introspect(decl: &TypeDecl, registry: &TypeRegistry) -> Result<TypeDescriptor> {
    match decl {
        TypeDecl::Named { name, nullable } => {
            let resolved = resolve(name, registry)?;

            // `array` stays an ARRAY even when declared nullable.
            if resolved == ElementaryType::Builtin(BuiltinType::Array) {
                return Ok(TypeDescriptor::new(AlgebraicOperator::Array, vec![resolved]));
            }

            let operator = if resolved.is_builtin() {
                AlgebraicOperator::None
            } else {
                AlgebraicOperator::Product
            };
            let null = ElementaryType::Builtin(BuiltinType::Null);
            if *nullable && resolved != null {
                Ok(TypeDescriptor::new(operator, vec![null, resolved]))
            } else {
                Ok(TypeDescriptor::new(operator, vec![resolved]))
            }
        }
        TypeDecl::Union(members) => Ok(TypeDescriptor::new(
            AlgebraicOperator::Union,
            resolve_members(members, registry)?,
        )),
        TypeDecl::Intersection(members) => Ok(TypeDescriptor::new(
            AlgebraicOperator::Intersection,
            resolve_members(members, registry)?,
        )),
    }
}

/// Keyword → builtin tag, anything else → registered composite.
pub fn resolve(name: &str, registry: &TypeRegistry) -> Result<ElementaryType> {
    match BuiltinType::from_keyword(name) {
        Some(builtin) => Ok(ElementaryType::Builtin(builtin)),
        None => Ok(ElementaryType::UserDefined(UserDefinedType::new(name, registry)?)),
    }
}

fn resolve_members(members: &[TypeDecl], registry: &TypeRegistry) -> Result<Vec<ElementaryType>> {
    members
        .iter()
        .map(|member| match member {
            TypeDecl::Named { name, .. } => resolve(name, registry),
            nested => Err(InstantiateError::not_implemented(format!(
                "nested union or intersection `{nested}`"
            ))),
        })
        .collect()
}
