//! Declared parameter types.
//!
//! A `TypeDecl` is what a constructor parameter says about itself before any
//! name is resolved: a named type (optionally nullable), a union, or an
//! intersection. Declarations can be written as strings:
//!
//! - `int`, `?string`, `App\Model\User`
//! - `int|string|null`
//! - `Stamp&Label`
//! - `(Stamp&Label)|null`
//!
//! `X|null` with a single non-null named member is reported as `?X`.
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::InstantiateError;

static IDENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\\?[A-Za-z_][A-Za-z0-9_]*(\\[A-Za-z_][A-Za-z0-9_]*)*$").expect("valid identifier regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeDecl {
    Named { name: String, nullable: bool },
    Union(Vec<TypeDecl>),
    Intersection(Vec<TypeDecl>),
}

impl TypeDecl {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named { name: name.into(), nullable: false }
    }

    pub fn nullable(name: impl Into<String>) -> Self {
        Self::Named { name: name.into(), nullable: true }
    }

    /// Union with the `X|null` collapse applied.
    pub fn union(members: Vec<TypeDecl>) -> Self {
        if members.len() == 2 {
            let null_at = members.iter().position(TypeDecl::is_null);
            if let Some(i) = null_at {
                if let TypeDecl::Named { name, .. } = &members[1 - i] {
                    if !members[1 - i].is_null() {
                        return Self::nullable(name.clone());
                    }
                }
            }
        }
        Self::Union(members)
    }

    pub fn intersection(members: Vec<TypeDecl>) -> Self {
        Self::Intersection(members)
    }

    fn is_null(&self) -> bool {
        matches!(self, TypeDecl::Named { name, .. } if name == "null")
    }

    pub fn parse(src: &str) -> Result<Self, InstantiateError> {
        let src = src.trim();
        if src.is_empty() {
            return Err(schema_error(src, "empty declaration"));
        }
        if let Some(rest) = src.strip_prefix('?') {
            return Ok(Self::nullable(ident(rest.trim(), src)?));
        }

        let arms = split_top_level(src, '|').ok_or_else(|| schema_error(src, "unbalanced parentheses"))?;
        if arms.len() > 1 {
            let members = arms
                .into_iter()
                .map(|arm| parse_arm(arm, src))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Self::union(members));
        }
        parse_arm(src, src)
    }
}

// A union arm: `Name`, `A&B`, or `(A&B)`.
fn parse_arm(arm: &str, whole: &str) -> Result<TypeDecl, InstantiateError> {
    let arm = arm.trim();
    let inner = match arm.strip_prefix('(') {
        Some(rest) => rest
            .strip_suffix(')')
            .ok_or_else(|| schema_error(whole, "unbalanced parentheses"))?,
        None => arm,
    };
    if inner.contains('&') {
        let members = inner
            .split('&')
            .map(|part| ident(part.trim(), whole).map(TypeDecl::named))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(TypeDecl::intersection(members));
    }
    if inner.len() != arm.len() {
        return Err(schema_error(whole, "parentheses may only group an intersection"));
    }
    Ok(TypeDecl::named(ident(inner, whole)?))
}

fn ident<'a>(s: &'a str, whole: &str) -> Result<&'a str, InstantiateError> {
    if IDENT.is_match(s) {
        Ok(s)
    } else {
        Err(schema_error(whole, &format!("'{s}' is not a type name")))
    }
}

fn split_top_level(src: &str, sep: char) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in src.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            c if c == sep && depth == 0 => {
                parts.push(&src[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(&src[start..]);
    Some(parts)
}

fn schema_error(src: &str, reason: &str) -> InstantiateError {
    InstantiateError::Schema { message: format!("`{src}`: {reason}") }
}

impl FromStr for TypeDecl {
    type Err = InstantiateError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TypeDecl {
    type Error = InstantiateError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<TypeDecl> for String {
    fn from(decl: TypeDecl) -> Self {
        decl.to_string()
    }
}

impl fmt::Display for TypeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDecl::Named { name, nullable: true } => write!(f, "?{name}"),
            TypeDecl::Named { name, nullable: false } => f.write_str(name),
            TypeDecl::Union(members) => {
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    match m {
                        TypeDecl::Intersection(_) => write!(f, "({m})")?,
                        _ => write!(f, "{m}")?,
                    }
                }
                Ok(())
            }
            TypeDecl::Intersection(members) => {
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str("&")?;
                    }
                    write!(f, "{m}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_and_nullable() {
        assert_eq!(TypeDecl::parse("int").unwrap(), TypeDecl::named("int"));
        assert_eq!(TypeDecl::parse(" ?string ").unwrap(), TypeDecl::nullable("string"));
        assert_eq!(
            TypeDecl::parse("\\App\\Model\\User").unwrap(),
            TypeDecl::named("\\App\\Model\\User")
        );
    }

    #[test]
    fn single_member_or_null_collapses_to_nullable() {
        assert_eq!(TypeDecl::parse("UserId|null").unwrap(), TypeDecl::nullable("UserId"));
        assert_eq!(TypeDecl::parse("null|int").unwrap(), TypeDecl::nullable("int"));
    }

    #[test]
    fn union_keeps_declared_order() {
        let decl = TypeDecl::parse("int|string|null").unwrap();
        assert_eq!(
            decl,
            TypeDecl::Union(vec![
                TypeDecl::named("int"),
                TypeDecl::named("string"),
                TypeDecl::named("null"),
            ])
        );
        assert_eq!(decl.to_string(), "int|string|null");
    }

    #[test]
    fn intersections_and_dnf() {
        assert_eq!(
            TypeDecl::parse("Stamp&Label").unwrap(),
            TypeDecl::Intersection(vec![TypeDecl::named("Stamp"), TypeDecl::named("Label")])
        );
        let dnf = TypeDecl::parse("(Stamp&Label)|null").unwrap();
        assert_eq!(
            dnf,
            TypeDecl::Union(vec![
                TypeDecl::Intersection(vec![TypeDecl::named("Stamp"), TypeDecl::named("Label")]),
                TypeDecl::named("null"),
            ])
        );
        assert_eq!(dnf.to_string(), "(Stamp&Label)|null");
    }

    #[test]
    fn rejects_malformed_declarations() {
        for bad in ["", "?", "int|", "(A&B", "A&&B", "1abc", "(int)", "?int|string"] {
            let err = TypeDecl::parse(bad).unwrap_err();
            assert_eq!(err.kind(), "Schema", "{bad:?} should be rejected");
        }
    }

    #[test]
    fn deserializes_from_string() {
        let decl: TypeDecl = serde_json::from_str("\"?Email\"").unwrap();
        assert_eq!(decl, TypeDecl::nullable("Email"));
        assert_eq!(serde_json::to_string(&decl).unwrap(), "\"?Email\"");
    }
}
