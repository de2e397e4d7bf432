//! Introspection and error-value builtins.

use crate::args;
use crate::registry::{BuiltinId, BuiltinMeta, BuiltinRegistry};
use brisk_core::{TypeDesc, Value};
use brisk_runtime::Environment;

pub const TYPE_OF: BuiltinId = BuiltinId(600);
pub const ERROR: BuiltinId = BuiltinId(601);
pub const ERROR_MESSAGE: BuiltinId = BuiltinId(602);

/// Script-visible type name. Records report their declared struct name when
/// the environment knows it.
pub fn type_of(env: &Environment, value: &Value) -> String {
    match value {
        Value::Record(r) => r
            .type_index
            .and_then(|index| env.struct_name(index))
            .unwrap_or_else(|| "record".to_string()),
        other => other.type_name().to_string(),
    }
}

pub(crate) fn register(registry: &BuiltinRegistry) {
    registry.define(
        BuiltinMeta::function(TYPE_OF, "typeOf")
            .param("value", TypeDesc::Any)
            .returns(TypeDesc::Str),
        |env, args| Ok(Value::Str(type_of(env, args::any(args, 0)?))),
    );

    registry.define(
        BuiltinMeta::function(ERROR, "error")
            .param("message", TypeDesc::Str)
            .returns(TypeDesc::Error),
        |_, args| Ok(Value::error(args::string(args, 0)?)),
    );

    registry.define(
        BuiltinMeta::method(ERROR_MESSAGE, TypeDesc::Error, "message").returns(TypeDesc::Str),
        |_, args| Ok(Value::Str(args::error(args, 0)?.message.clone())),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use brisk_core::RecordValue;

    #[test]
    fn records_use_declared_names() {
        let env = Environment::builder()
            .struct_names(|i| (i == 0).then(|| "Point".to_string()))
            .build();
        let named = Value::Record(RecordValue {
            type_index: Some(0),
            fields: vec![Value::Int(1), Value::Int(2)],
        });
        let unknown = Value::Record(RecordValue {
            type_index: Some(9),
            fields: vec![],
        });
        assert_eq!(type_of(&env, &named), "Point");
        assert_eq!(type_of(&env, &unknown), "record");
        assert_eq!(type_of(&env, &Value::record(vec![])), "record");
        assert_eq!(type_of(&env, &Value::Bytes(vec![])), "bytes");
    }

    #[test]
    fn error_round_trip_through_builtins() {
        let reg = BuiltinRegistry::new();
        register(&reg);
        let env = Environment::builder().build();

        let err = reg.call(ERROR, &env, &[Value::str("bad input")]).unwrap();
        assert_eq!(
            reg.call(TYPE_OF, &env, &[err.clone()]).unwrap(),
            Value::str("error")
        );
        assert_eq!(
            reg.call_method("message", &env, &[err]).unwrap(),
            Value::str("bad input")
        );
    }
}
