//! Type descriptors attached to builtin signatures.
//!
//! A [`TypeDesc`] is what the external static checker reads from the builtin
//! registry to validate call sites ahead of time. At call time the same
//! descriptor drives a shallow tag check ([`TypeDesc::accepts`]) so that a
//! value of the wrong shape never reaches a builtin implementation.

use crate::values::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a builtin parameter or result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "of", rename_all = "snake_case")]
pub enum TypeDesc {
    /// Any value; no tag check is performed.
    Any,
    /// No value (result of side-effect-only builtins).
    Unit,
    Int,
    Float,
    #[serde(rename = "string")]
    Str,
    Bool,
    Bytes,
    /// An opaque resource handle. Represented as bytes at run time.
    Handle,
    List(Box<TypeDesc>),
    /// A string-keyed mapping with values of the given type.
    Dict(Box<TypeDesc>),
    Optional(Box<TypeDesc>),
    Function {
        params: Vec<TypeDesc>,
        result: Box<TypeDesc>,
    },
    Error,
    /// A nominal record declared by the program, by name.
    Record(String),
    /// An anonymous record with ordered, named fields.
    Shape(Vec<(String, TypeDesc)>),
}

/// Tag-level classification of a [`TypeDesc`], ignoring element types.
///
/// Method dispatch keys on the kind, so a `list<int>` receiver finds the
/// methods declared on `list<any>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Any,
    Unit,
    Int,
    Float,
    Str,
    Bool,
    Bytes,
    List,
    Dict,
    Optional,
    Function,
    Error,
    Record,
}

impl TypeDesc {
    pub fn list(elem: TypeDesc) -> Self {
        TypeDesc::List(Box::new(elem))
    }

    pub fn dict(value: TypeDesc) -> Self {
        TypeDesc::Dict(Box::new(value))
    }

    pub fn optional(inner: TypeDesc) -> Self {
        TypeDesc::Optional(Box::new(inner))
    }

    pub fn function(params: Vec<TypeDesc>, result: TypeDesc) -> Self {
        TypeDesc::Function {
            params,
            result: Box::new(result),
        }
    }

    /// Build an anonymous record shape from `(field, type)` pairs.
    pub fn shape<'a>(fields: impl IntoIterator<Item = (&'a str, TypeDesc)>) -> Self {
        TypeDesc::Shape(
            fields
                .into_iter()
                .map(|(name, ty)| (name.to_string(), ty))
                .collect(),
        )
    }

    /// The dispatch kind of this descriptor.
    pub fn kind(&self) -> TypeKind {
        match self {
            TypeDesc::Any => TypeKind::Any,
            TypeDesc::Unit => TypeKind::Unit,
            TypeDesc::Int => TypeKind::Int,
            TypeDesc::Float => TypeKind::Float,
            TypeDesc::Str => TypeKind::Str,
            TypeDesc::Bool => TypeKind::Bool,
            TypeDesc::Bytes | TypeDesc::Handle => TypeKind::Bytes,
            TypeDesc::List(_) => TypeKind::List,
            TypeDesc::Dict(_) => TypeKind::Dict,
            TypeDesc::Optional(_) => TypeKind::Optional,
            TypeDesc::Function { .. } => TypeKind::Function,
            TypeDesc::Error => TypeKind::Error,
            TypeDesc::Record(_) | TypeDesc::Shape(_) => TypeKind::Record,
        }
    }

    /// Shallow runtime tag check: does `value` carry the tag this descriptor
    /// requires? Element types of containers are not inspected.
    pub fn accepts(&self, value: &Value) -> bool {
        match self.kind() {
            TypeKind::Any => true,
            kind => value.kind() == kind,
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Any => f.write_str("any"),
            TypeDesc::Unit => f.write_str("unit"),
            TypeDesc::Int => f.write_str("int"),
            TypeDesc::Float => f.write_str("float"),
            TypeDesc::Str => f.write_str("string"),
            TypeDesc::Bool => f.write_str("bool"),
            TypeDesc::Bytes => f.write_str("bytes"),
            TypeDesc::Handle => f.write_str("handle"),
            TypeDesc::List(elem) => write!(f, "list<{}>", elem),
            TypeDesc::Dict(value) => write!(f, "dict<{}>", value),
            TypeDesc::Optional(inner) => write!(f, "{}?", inner),
            TypeDesc::Function { params, result } => {
                let params = params
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "fn({}) -> {}", params, result)
            }
            TypeDesc::Error => f.write_str("error"),
            TypeDesc::Record(name) => f.write_str(name),
            TypeDesc::Shape(fields) => {
                let fields = fields
                    .iter()
                    .map(|(name, ty)| format!("{}: {}", name, ty))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{{{}}}", fields)
            }
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TypeKind::Any => "any",
            TypeKind::Unit => "unit",
            TypeKind::Int => "int",
            TypeKind::Float => "float",
            TypeKind::Str => "string",
            TypeKind::Bool => "bool",
            TypeKind::Bytes => "bytes",
            TypeKind::List => "list",
            TypeKind::Dict => "dict",
            TypeKind::Optional => "optional",
            TypeKind::Function => "function",
            TypeKind::Error => "error",
            TypeKind::Record => "record",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_nested_types() {
        let ty = TypeDesc::function(
            vec![TypeDesc::list(TypeDesc::Int), TypeDesc::optional(TypeDesc::Bytes)],
            TypeDesc::dict(TypeDesc::Str),
        );
        assert_eq!(ty.to_string(), "fn(list<int>, bytes?) -> dict<string>");

        let shape = TypeDesc::shape([("status", TypeDesc::Int), ("body", TypeDesc::Bytes)]);
        assert_eq!(shape.to_string(), "{status: int, body: bytes}");
    }

    #[test]
    fn handle_is_a_bytes_kind() {
        assert_eq!(TypeDesc::Handle.kind(), TypeKind::Bytes);
        assert!(TypeDesc::Handle.accepts(&Value::Bytes(vec![1, 0, 0, 0, 0, 0, 0, 0])));
        assert!(!TypeDesc::Handle.accepts(&Value::Int(1)));
    }

    #[test]
    fn accepts_is_shallow() {
        let ty = TypeDesc::list(TypeDesc::Int);
        assert!(ty.accepts(&Value::List(vec![Value::str("not an int")])));
        assert!(!ty.accepts(&Value::str("x")));
        assert!(TypeDesc::Any.accepts(&Value::Unit));
    }

    #[test]
    fn serializes_to_tagged_json() {
        let json = serde_json::to_value(TypeDesc::list(TypeDesc::Str)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "list", "of": {"type": "string"}}));
        let back: TypeDesc = serde_json::from_value(json).unwrap();
        assert_eq!(back, TypeDesc::list(TypeDesc::Str));
    }
}
