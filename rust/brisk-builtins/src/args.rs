//! Typed access to already tag-checked arguments.
//!
//! The registry has verified every tag before an implementation runs, so a
//! mismatch here means the declared signature and the implementation
//! disagree. It is still reported as an error rather than a panic.

use crate::error::BuiltinError;
use brisk_core::{Closure, DictRef, ErrorValue, Handle, Value};
use std::collections::BTreeMap;

fn arg(args: &[Value], i: usize) -> Result<&Value, BuiltinError> {
    args.get(i)
        .ok_or_else(|| BuiltinError::InvalidArgument(format!("missing argument {}", i)))
}

fn mismatch(i: usize, expected: &str, got: &Value) -> BuiltinError {
    BuiltinError::InvalidArgument(format!(
        "argument {} must be {}, got {}",
        i,
        expected,
        got.type_name()
    ))
}

/// An argument declared `any`.
pub(crate) fn any(args: &[Value], i: usize) -> Result<&Value, BuiltinError> {
    arg(args, i)
}

pub(crate) fn int(args: &[Value], i: usize) -> Result<i64, BuiltinError> {
    match arg(args, i)? {
        Value::Int(n) => Ok(*n),
        other => Err(mismatch(i, "int", other)),
    }
}

pub(crate) fn string(args: &[Value], i: usize) -> Result<&str, BuiltinError> {
    match arg(args, i)? {
        Value::Str(s) => Ok(s),
        other => Err(mismatch(i, "string", other)),
    }
}

pub(crate) fn bytes(args: &[Value], i: usize) -> Result<&[u8], BuiltinError> {
    match arg(args, i)? {
        Value::Bytes(b) => Ok(b),
        other => Err(mismatch(i, "bytes", other)),
    }
}

/// Decode a handle. Empty or wrong-length byte sequences are resource
/// errors, not contract errors.
pub(crate) fn handle(args: &[Value], i: usize) -> Result<Handle, BuiltinError> {
    let raw = bytes(args, i)?;
    Handle::from_bytes(raw).map_err(|e| BuiltinError::Host(e.into()))
}

pub(crate) fn list(args: &[Value], i: usize) -> Result<&[Value], BuiltinError> {
    match arg(args, i)? {
        Value::List(items) => Ok(items),
        other => Err(mismatch(i, "list", other)),
    }
}

pub(crate) fn dict(args: &[Value], i: usize) -> Result<&DictRef, BuiltinError> {
    match arg(args, i)? {
        Value::Dict(d) => Ok(d),
        other => Err(mismatch(i, "dict", other)),
    }
}

/// A `dict<string>` argument flattened into owned pairs.
pub(crate) fn string_map(
    args: &[Value],
    i: usize,
) -> Result<BTreeMap<String, String>, BuiltinError> {
    dict(args, i)?
        .snapshot()
        .into_iter()
        .map(|(k, v)| match v {
            Value::Str(s) => Ok((k, s)),
            other => Err(BuiltinError::InvalidArgument(format!(
                "value for key '{}' must be string, got {}",
                k,
                other.type_name()
            ))),
        })
        .collect()
}

pub(crate) fn closure(args: &[Value], i: usize) -> Result<&Closure, BuiltinError> {
    match arg(args, i)? {
        Value::Closure(c) => Ok(c),
        other => Err(mismatch(i, "function", other)),
    }
}

pub(crate) fn error(args: &[Value], i: usize) -> Result<&ErrorValue, BuiltinError> {
    match arg(args, i)? {
        Value::Error(e) => Ok(e),
        other => Err(mismatch(i, "error", other)),
    }
}

pub(crate) fn optional(args: &[Value], i: usize) -> Result<Option<&Value>, BuiltinError> {
    match arg(args, i)? {
        Value::Optional(inner) => Ok(inner.as_deref()),
        other => Err(mismatch(i, "optional", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brisk_runtime::HostError;

    #[test]
    fn empty_handle_is_a_resource_error() {
        let err = handle(&[Value::Bytes(vec![])], 0).unwrap_err();
        assert!(matches!(
            err,
            BuiltinError::Host(HostError::InvalidHandle(_))
        ));
        assert_eq!(err.kind(), crate::error::ErrorKind::Resource);
    }

    #[test]
    fn string_map_rejects_non_string_values() {
        let d = DictRef::new();
        d.insert("ok".into(), Value::str("v"));
        d.insert("bad".into(), Value::Int(1));
        assert!(string_map(&[Value::Dict(d.clone())], 0).is_err());
        d.remove("bad");
        let map = string_map(&[Value::Dict(d)], 0).unwrap();
        assert_eq!(map.get("ok").map(String::as_str), Some("v"));
    }

    #[test]
    fn wrong_tag_is_reported_not_panicked() {
        assert!(int(&[Value::str("x")], 0).is_err());
        assert!(string(&[], 0).is_err());
        assert!(any(&[Value::Unit], 1).is_err());
        assert!(error(&[Value::Int(1)], 0).is_err());
        assert_eq!(any(&[Value::Int(7)], 0).unwrap(), &Value::Int(7));
    }
}
