//! Methods on `string`.

use crate::args;
use crate::error::BuiltinError;
use crate::registry::{BuiltinId, BuiltinMeta, BuiltinRegistry};
use brisk_core::{TypeDesc, Value};

pub const LEN: BuiltinId = BuiltinId(1000);
pub const UPPER: BuiltinId = BuiltinId(1001);
pub const LOWER: BuiltinId = BuiltinId(1002);
pub const TRIM: BuiltinId = BuiltinId(1003);
pub const SPLIT: BuiltinId = BuiltinId(1004);
pub const CONTAINS: BuiltinId = BuiltinId(1005);
pub const TO_BYTES: BuiltinId = BuiltinId(1006);

fn method(id: BuiltinId, name: &str) -> BuiltinMeta {
    BuiltinMeta::method(id, TypeDesc::Str, name)
}

pub(crate) fn register(registry: &BuiltinRegistry) {
    // Length in characters, not bytes.
    registry.define(method(LEN, "len").returns(TypeDesc::Int), |_, args| {
        Ok(Value::Int(args::string(args, 0)?.chars().count() as i64))
    });

    registry.define(method(UPPER, "upper").returns(TypeDesc::Str), |_, args| {
        Ok(Value::Str(args::string(args, 0)?.to_uppercase()))
    });

    registry.define(method(LOWER, "lower").returns(TypeDesc::Str), |_, args| {
        Ok(Value::Str(args::string(args, 0)?.to_lowercase()))
    });

    registry.define(method(TRIM, "trim").returns(TypeDesc::Str), |_, args| {
        Ok(Value::str(args::string(args, 0)?.trim()))
    });

    registry.define(
        method(SPLIT, "split")
            .param("sep", TypeDesc::Str)
            .returns(TypeDesc::list(TypeDesc::Str)),
        |_, args| {
            let s = args::string(args, 0)?;
            let sep = args::string(args, 1)?;
            if sep.is_empty() {
                return Err(BuiltinError::InvalidArgument(
                    "split separator must not be empty".into(),
                ));
            }
            Ok(Value::List(s.split(sep).map(Value::str).collect()))
        },
    );

    registry.define(
        method(CONTAINS, "contains")
            .param("needle", TypeDesc::Str)
            .returns(TypeDesc::Bool),
        |_, args| {
            let s = args::string(args, 0)?;
            Ok(Value::Bool(s.contains(args::string(args, 1)?)))
        },
    );

    registry.define(method(TO_BYTES, "toBytes").returns(TypeDesc::Bytes), |_, args| {
        Ok(Value::Bytes(args::string(args, 0)?.as_bytes().to_vec()))
    });
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

    #[test]
    fn case_and_length() {
        assert_eq!(call("len", &[Value::str("héllo")]).unwrap(), Value::Int(5));
        assert_eq!(
            call("upper", &[Value::str("abc")]).unwrap(),
            Value::str("ABC")
        );
        assert_eq!(
            call("trim", &[Value::str("  x \n")]).unwrap(),
            Value::str("x")
        );
    }

    #[test]
    fn split_keeps_empty_fields() {
        assert_eq!(
            call("split", &[Value::str("a,,b"), Value::str(",")]).unwrap(),
            Value::List(vec![Value::str("a"), Value::str(""), Value::str("b")])
        );
        assert!(matches!(
            call("split", &[Value::str("a"), Value::str("")]),
            Err(BuiltinError::InvalidArgument(_))
        ));
    }

    #[test]
    fn wrong_receiver_finds_nothing() {
        assert!(matches!(
            call("upper", &[Value::Int(1)]),
            Err(BuiltinError::UnknownBuiltin(_))
        ));
        assert!(matches!(
            call("contains", &[Value::str("abc"), Value::Int(1)]),
            Err(BuiltinError::TypeMismatch { index: 1, .. })
        ));
    }
}
