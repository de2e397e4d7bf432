//! Methods on `bytes`.

use crate::args;
use crate::error::BuiltinError;
use crate::registry::{BuiltinId, BuiltinMeta, BuiltinRegistry};
use brisk_core::{TypeDesc, Value};

pub const LEN: BuiltinId = BuiltinId(1100);
pub const TO_STRING: BuiltinId = BuiltinId(1101);
pub const SLICE: BuiltinId = BuiltinId(1102);
pub const CONCAT: BuiltinId = BuiltinId(1103);

fn method(id: BuiltinId, name: &str) -> BuiltinMeta {
    BuiltinMeta::method(id, TypeDesc::Bytes, name)
}

fn index(value: i64, len: usize, what: &str) -> Result<usize, BuiltinError> {
    usize::try_from(value)
        .ok()
        .filter(|&i| i <= len)
        .ok_or_else(|| {
            BuiltinError::InvalidArgument(format!("{} {} out of range 0..={}", what, value, len))
        })
}

pub(crate) fn register(registry: &BuiltinRegistry) {
    registry.define(method(LEN, "len").returns(TypeDesc::Int), |_, args| {
        Ok(Value::Int(args::bytes(args, 0)?.len() as i64))
    });

    registry.define(method(TO_STRING, "toString").returns(TypeDesc::Str), |_, args| {
        let text = std::str::from_utf8(args::bytes(args, 0)?).map_err(|e| {
            BuiltinError::InvalidArgument(format!("bytes are not valid UTF-8: {}", e))
        })?;
        Ok(Value::str(text))
    });

    // Half-open range `[start, end)`.
    registry.define(
        method(SLICE, "slice")
            .param("start", TypeDesc::Int)
            .param("end", TypeDesc::Int)
            .returns(TypeDesc::Bytes),
        |_, args| {
            let data = args::bytes(args, 0)?;
            let start = index(args::int(args, 1)?, data.len(), "start")?;
            let end = index(args::int(args, 2)?, data.len(), "end")?;
            if start > end {
                return Err(BuiltinError::InvalidArgument(format!(
                    "slice start {} is after end {}",
                    start, end
                )));
            }
            Ok(Value::Bytes(data[start..end].to_vec()))
        },
    );

    registry.define(
        method(CONCAT, "concat")
            .param("other", TypeDesc::Bytes)
            .returns(TypeDesc::Bytes),
        |_, args| {
            let mut out = args::bytes(args, 0)?.to_vec();
            out.extend_from_slice(args::bytes(args, 1)?);
            Ok(Value::Bytes(out))
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use brisk_runtime::Environment;

    fn call(method: &str, args: &[Value]) -> Result<Value, BuiltinError> {
        let reg = BuiltinRegistry::new();
        register(&reg);
        reg.call_method(method, &Environment::builder().build(), args)
    }

    fn b(s: &str) -> Value {
        Value::Bytes(s.as_bytes().to_vec())
    }

    #[test]
    fn slicing_is_bounds_checked() {
        assert_eq!(
            call("slice", &[b("hello"), Value::Int(1), Value::Int(3)]).unwrap(),
            b("el")
        );
        assert_eq!(
            call("slice", &[b("hello"), Value::Int(5), Value::Int(5)]).unwrap(),
            b("")
        );
        for (start, end) in [(-1, 2), (0, 6), (3, 2)] {
            assert!(
                call("slice", &[b("hello"), Value::Int(start), Value::Int(end)]).is_err(),
                "slice({}, {})",
                start,
                end
            );
        }
    }

    #[test]
    fn text_conversion() {
        assert_eq!(call("toString", &[b("hi")]).unwrap(), Value::str("hi"));
        assert!(call("toString", &[Value::Bytes(vec![0xff, 0xfe])]).is_err());
        assert_eq!(call("concat", &[b("a"), b("b")]).unwrap(), b("ab"));
        assert_eq!(call("len", &[b("four")]).unwrap(), Value::Int(4));
    }
}
