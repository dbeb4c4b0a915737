// Sample composites shared by the unit tests.

use std::sync::Arc;

use crate::decl::TypeDecl;
use crate::registry::{Param, TypeDef, TypeRegistry};

#[derive(Debug, Clone, PartialEq)]
pub struct UserId {
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub email: Email,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NullableStringProperty {
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    pub left: i64,
    pub right: String,
}

fn param(name: &str, ty: &str) -> Param {
    Param::parse(name, ty).expect("sample declaration parses")
}

fn holder(name: &str, field: &str, ty: &str) -> TypeDef {
    TypeDef::new(name).param(param(field, ty))
}

pub fn registry() -> TypeRegistry {
    TypeRegistry::new()
        .with(
            holder("UserId", "value", "int")
                .constructor(|mut args| Ok(UserId { value: args.next()? })),
        )
        .with(
            holder("Email", "value", "string")
                .constructor(|mut args| Ok(Email { value: args.next()? })),
        )
        .with(
            TypeDef::new("User")
                .param(param("id", "UserId"))
                .param(param("email", "Email"))
                .constructor(|mut args| {
                    let id = args.next_object::<UserId>()?;
                    let email = args.next::<Arc<Email>>()?;
                    Ok(User { id, email: (*email).clone() })
                }),
        )
        .with(
            TypeDef::new("Pair")
                .param(param("left", "int"))
                .param(param("right", "string"))
                .constructor(|args| {
                    let (left, right) = args.into_tuple::<(i64, String)>()?;
                    Ok(Pair { left, right })
                }),
        )
        .with(holder("NullProperty", "nullProperty", "null"))
        .with(holder("StringProperty", "value", "string"))
        .with(holder("BoolProperty", "value", "bool"))
        .with(holder("IntProperty", "value", "int"))
        .with(holder("FloatProperty", "value", "float"))
        .with(holder("BuiltinUnionProperty", "value", "array|string|int|float|bool|null"))
        .with(
            holder("NullableStringProperty", "value", "?string")
                .constructor(|mut args| Ok(NullableStringProperty { value: args.next()? })),
        )
        .with(holder("ScalarUnion", "value", "int|string|null"))
        .with(
            TypeDef::new("Triple")
                .param(param("a", "int"))
                .param(param("b", "int"))
                .param(param("c", "int")),
        )
        .with(holder("CarSpeed", "value", "int"))
        .with(
            TypeDef::new("Car")
                .param(param("name", "string"))
                .param(param("speed", "int|CarSpeed")),
        )
        .with(holder("Profile", "owner", "?UserId"))
        .with(holder("Stamp", "at", "int"))
        .with(holder("Label", "text", "string"))
        .with(holder("Stamped", "mark", "Stamp&Label"))
        .with(holder("Tag", "label", "string"))
        .with(
            TypeDef::new("Tagged")
                .param(param("tags", "array").element_type("Tag"))
                .param(param("plain", "array")),
        )
        .with(TypeDef::new("Renamed").param(param("userName", "string").rename("user_name")))
        .with(
            TypeDef::new("Node")
                .param(param("value", "int"))
                .param(Param::new("next", TypeDecl::nullable("Node"))),
        )
        .with(holder("Dangling", "x", "Missing"))
        .with(TypeDef::new("BadElement").param(param("items", "array").element_type("NoSuchElement")))
        .with(holder("BadUnion", "value", "(Stamp&Label)|null"))
}
