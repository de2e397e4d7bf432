//! Tagged value representation passed between the interpreter and builtins.

use crate::handle::Handle;
use crate::types::TypeKind;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Runtime values of the Brisk language.
///
/// Equality is structural and recursive. Values are treated as immutable by
/// convention, with one deliberate exception: a [`Value::Dict`] shares its
/// underlying map between clones, so in-place dictionary updates are visible
/// through every copy of the value.
#[derive(Debug, Clone)]
pub enum Value {
    Unit,
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Dict(DictRef),
    Optional(Option<Box<Value>>),
    Closure(Arc<Closure>),
    Error(ErrorValue),
    Record(RecordValue),
}

/// A first-class function owned by the interpreter.
///
/// Builtins cannot run closures themselves; they hand them back to the
/// interpreter through the environment's closure invoker.
#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    /// Index of the compiled function in the interpreter's function table.
    pub function: u32,
    /// Captured upvalues, in declaration order.
    pub captures: Vec<Value>,
}

/// A script-level error value.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorValue {
    pub message: String,
}

/// A record instance: ordered field values plus the declaring type.
///
/// `type_index` is `None` for anonymous records produced by host builtins.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordValue {
    pub type_index: Option<u32>,
    pub fields: Vec<Value>,
}

// ---------------------------------------------------------------------------
// DictRef
// ---------------------------------------------------------------------------

/// Shared, lock-guarded string-keyed map backing [`Value::Dict`].
#[derive(Clone, Default)]
pub struct DictRef(Arc<RwLock<BTreeMap<String, Value>>>);

impl DictRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: BTreeMap<String, Value>) -> Self {
        Self(Arc::new(RwLock::new(map)))
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.read().get(key).cloned()
    }

    /// Insert in place. Every clone of this dict observes the change.
    pub fn insert(&self, key: String, value: Value) -> Option<Value> {
        self.0.write().insert(key, value)
    }

    /// Remove in place. Every clone of this dict observes the change.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.write().remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.0.read().keys().cloned().collect()
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.0.read().clone()
    }

    /// `true` when both refer to the same underlying map.
    pub fn ptr_eq(&self, other: &DictRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for DictRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.read().iter()).finish()
    }
}

impl PartialEq for DictRef {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        *self.0.read() == *other.0.read()
    }
}

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn some(v: Value) -> Self {
        Value::Optional(Some(Box::new(v)))
    }

    pub fn none() -> Self {
        Value::Optional(None)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Value::Error(ErrorValue {
            message: message.into(),
        })
    }

    /// Build a dict value from string-valued pairs.
    pub fn string_dict<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Value::Dict(DictRef::from_map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), Value::Str(v.into())))
                .collect(),
        ))
    }

    /// Anonymous record with the given ordered fields.
    pub fn record(fields: Vec<Value>) -> Self {
        Value::Record(RecordValue {
            type_index: None,
            fields,
        })
    }

    /// Encode a resource handle as the byte-sequence scripts see.
    pub fn handle(handle: Handle) -> Self {
        Value::Bytes(handle.to_bytes().to_vec())
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            Value::Unit => TypeKind::Unit,
            Value::Int(_) => TypeKind::Int,
            Value::Float(_) => TypeKind::Float,
            Value::Str(_) => TypeKind::Str,
            Value::Bool(_) => TypeKind::Bool,
            Value::Bytes(_) => TypeKind::Bytes,
            Value::List(_) => TypeKind::List,
            Value::Dict(_) => TypeKind::Dict,
            Value::Optional(_) => TypeKind::Optional,
            Value::Closure(_) => TypeKind::Function,
            Value::Error(_) => TypeKind::Error,
            Value::Record(_) => TypeKind::Record,
        }
    }

    /// Tag name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Optional(_) => "optional",
            Value::Closure(_) => "function",
            Value::Error(_) => "error",
            Value::Record(_) => "record",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Human-readable rendering used by `io.print` and friends.
    pub fn display_pretty(&self) -> String {
        match self {
            Value::Unit => "()".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Bytes(b) => format!("<bytes:{}>", b.len()),
            Value::List(items) => format!(
                "[{}]",
                items
                    .iter()
                    .map(|v| v.display_pretty())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Value::Dict(d) => format!(
                "{{{}}}",
                d.snapshot()
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.display_pretty()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Value::Optional(Some(v)) => format!("some({})", v.display_pretty()),
            Value::Optional(None) => "none".to_string(),
            Value::Closure(c) => format!("<fn:{}>", c.function),
            Value::Error(e) => format!("error({})", e.message),
            Value::Record(r) => format!(
                "({})",
                r.fields
                    .iter()
                    .map(|v| v.display_pretty())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            (Value::Optional(a), Value::Optional(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_pretty())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_structural() {
        let a = Value::List(vec![Value::Int(1), Value::some(Value::str("x"))]);
        let b = Value::List(vec![Value::Int(1), Value::some(Value::str("x"))]);
        assert_eq!(a, b);
        assert_ne!(a, Value::List(vec![Value::Int(1), Value::none()]));
    }

    #[test]
    fn absent_optionals_equal_only_each_other() {
        assert_eq!(Value::none(), Value::none());
        assert_ne!(Value::none(), Value::some(Value::Unit));
        assert_ne!(Value::none(), Value::Unit);
    }

    #[test]
    fn dict_clones_share_storage() {
        let original = DictRef::new();
        let value = Value::Dict(original.clone());
        let copy = value.clone();
        original.insert("k".into(), Value::Int(7));
        match copy {
            Value::Dict(d) => assert_eq!(d.get("k"), Some(Value::Int(7))),
            other => panic!("expected dict, got {:?}", other),
        }
    }

    #[test]
    fn dicts_compare_by_contents() {
        let a = Value::string_dict([("a", "1")]);
        let b = Value::string_dict([("a", "1")]);
        assert_eq!(a, b);
        assert_eq!(a, a.clone());
        assert_ne!(a, Value::string_dict([("a", "2")]));
    }

    #[test]
    fn records_compare_type_and_fields() {
        let a = Value::Record(RecordValue {
            type_index: Some(3),
            fields: vec![Value::Int(1)],
        });
        let b = Value::Record(RecordValue {
            type_index: None,
            fields: vec![Value::Int(1)],
        });
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn handle_value_is_eight_bytes() {
        let v = Value::handle(Handle::new(5).unwrap());
        assert_eq!(v.as_bytes().map(|b| b.len()), Some(8));
    }

    #[test]
    fn display_pretty_renders_nested() {
        let v = Value::List(vec![Value::Float(2.0), Value::none(), Value::str("s")]);
        assert_eq!(v.display_pretty(), "[2.0, none, s]");
    }
}
