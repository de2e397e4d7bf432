//! Methods on `dict`.
//!
//! Unlike lists, dicts are shared: `set` and `remove` mutate the receiver in
//! place, and every copy of the dict value observes the change.

use crate::args;
use crate::registry::{BuiltinId, BuiltinMeta, BuiltinRegistry};
use brisk_core::{TypeDesc, Value};

pub const LEN: BuiltinId = BuiltinId(1300);
pub const GET: BuiltinId = BuiltinId(1301);
pub const SET: BuiltinId = BuiltinId(1302);
pub const REMOVE: BuiltinId = BuiltinId(1303);
pub const KEYS: BuiltinId = BuiltinId(1304);
pub const HAS: BuiltinId = BuiltinId(1305);

fn method(id: BuiltinId, name: &str) -> BuiltinMeta {
    BuiltinMeta::method(id, TypeDesc::dict(TypeDesc::Any), name)
}

fn optional(value: Option<Value>) -> Value {
    value.map_or_else(Value::none, Value::some)
}

pub(crate) fn register(registry: &BuiltinRegistry) {
    registry.define(method(LEN, "len").returns(TypeDesc::Int), |_, args| {
        Ok(Value::Int(args::dict(args, 0)?.len() as i64))
    });

    registry.define(
        method(GET, "get")
            .param("key", TypeDesc::Str)
            .returns(TypeDesc::optional(TypeDesc::Any)),
        |_, args| {
            let d = args::dict(args, 0)?;
            Ok(optional(d.get(args::string(args, 1)?)))
        },
    );

    registry.define(
        method(SET, "set")
            .param("key", TypeDesc::Str)
            .param("value", TypeDesc::Any),
        |_, args| {
            let d = args::dict(args, 0)?;
            d.insert(args::string(args, 1)?.to_string(), args::any(args, 2)?.clone());
            Ok(Value::Unit)
        },
    );

    registry.define(
        method(REMOVE, "remove")
            .param("key", TypeDesc::Str)
            .returns(TypeDesc::optional(TypeDesc::Any)),
        |_, args| {
            let d = args::dict(args, 0)?;
            Ok(optional(d.remove(args::string(args, 1)?)))
        },
    );

    registry.define(
        method(KEYS, "keys").returns(TypeDesc::list(TypeDesc::Str)),
        |_, args| {
            let keys = args::dict(args, 0)?.keys();
            Ok(Value::List(keys.into_iter().map(Value::Str).collect()))
        },
    );

    registry.define(
        method(HAS, "has")
            .param("key", TypeDesc::Str)
            .returns(TypeDesc::Bool),
        |_, args| {
            let d = args::dict(args, 0)?;
            Ok(Value::Bool(d.contains_key(args::string(args, 1)?)))
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuiltinError;
    use brisk_runtime::Environment;

    fn call(method: &str, args: &[Value]) -> Result<Value, BuiltinError> {
        let reg = BuiltinRegistry::new();
        register(&reg);
        reg.call_method(method, &Environment::builder().build(), args)
    }

    #[test]
    fn set_and_remove_mutate_every_copy() {
        let d = Value::string_dict([("a", "1")]);
        let alias = d.clone();

        call("set", &[d.clone(), Value::str("b"), Value::Int(2)]).unwrap();
        assert_eq!(call("len", &[alias.clone()]).unwrap(), Value::Int(2));
        assert_eq!(
            call("get", &[alias.clone(), Value::str("b")]).unwrap(),
            Value::some(Value::Int(2))
        );

        assert_eq!(
            call("remove", &[d.clone(), Value::str("a")]).unwrap(),
            Value::some(Value::str("1"))
        );
        assert_eq!(
            call("has", &[alias.clone(), Value::str("a")]).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            call("remove", &[d, Value::str("a")]).unwrap(),
            Value::none()
        );
        assert_eq!(
            call("keys", &[alias]).unwrap(),
            Value::List(vec![Value::str("b")])
        );
    }
}
