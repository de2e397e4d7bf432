//! Methods on `list`. Every operation returns a new list; the receiver is
//! never modified.

use crate::args;
use crate::registry::{BuiltinId, BuiltinMeta, BuiltinRegistry};
use brisk_core::{TypeDesc, Value};
use brisk_runtime::HostError;

pub const LEN: BuiltinId = BuiltinId(1200);
pub const GET: BuiltinId = BuiltinId(1201);
pub const APPEND: BuiltinId = BuiltinId(1202);
pub const REVERSE: BuiltinId = BuiltinId(1203);
pub const MAP: BuiltinId = BuiltinId(1204);
pub const FILTER: BuiltinId = BuiltinId(1205);

fn method(id: BuiltinId, name: &str) -> BuiltinMeta {
    BuiltinMeta::method(id, TypeDesc::list(TypeDesc::Any), name)
}

pub(crate) fn register(registry: &BuiltinRegistry) {
    registry.define(method(LEN, "len").returns(TypeDesc::Int), |_, args| {
        Ok(Value::Int(args::list(args, 0)?.len() as i64))
    });

    // Out-of-range indices yield `none` rather than an error.
    registry.define(
        method(GET, "get")
            .param("index", TypeDesc::Int)
            .returns(TypeDesc::optional(TypeDesc::Any)),
        |_, args| {
            let items = args::list(args, 0)?;
            let item = usize::try_from(args::int(args, 1)?)
                .ok()
                .and_then(|i| items.get(i));
            Ok(item.map_or_else(Value::none, |v| Value::some(v.clone())))
        },
    );

    registry.define(
        method(APPEND, "append")
            .param("value", TypeDesc::Any)
            .returns(TypeDesc::list(TypeDesc::Any)),
        |_, args| {
            let mut items = args::list(args, 0)?.to_vec();
            items.push(args::any(args, 1)?.clone());
            Ok(Value::List(items))
        },
    );

    registry.define(
        method(REVERSE, "reverse").returns(TypeDesc::list(TypeDesc::Any)),
        |_, args| {
            let mut items = args::list(args, 0)?.to_vec();
            items.reverse();
            Ok(Value::List(items))
        },
    );

    registry.define(
        method(MAP, "map")
            .param("f", TypeDesc::function(vec![TypeDesc::Any], TypeDesc::Any))
            .returns(TypeDesc::list(TypeDesc::Any)),
        |env, args| {
            let items = args::list(args, 0)?;
            let f = args::closure(args, 1)?;
            let mapped = items
                .iter()
                .map(|item| env.invoke(f, vec![item.clone()]))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(mapped))
        },
    );

    registry.define(
        method(FILTER, "filter")
            .param(
                "predicate",
                TypeDesc::function(vec![TypeDesc::Any], TypeDesc::Bool),
            )
            .returns(TypeDesc::list(TypeDesc::Any)),
        |env, args| {
            let items = args::list(args, 0)?;
            let f = args::closure(args, 1)?;
            let mut kept = Vec::new();
            for item in items {
                match env.invoke(f, vec![item.clone()])? {
                    Value::Bool(true) => kept.push(item.clone()),
                    Value::Bool(false) => {}
                    other => {
                        return Err(HostError::Callback(format!(
                            "filter predicate returned {}, expected bool",
                            other.type_name()
                        ))
                        .into())
                    }
                }
            }
            Ok(Value::List(kept))
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuiltinError;
    use brisk_core::Closure;
    use brisk_runtime::Environment;
    use std::sync::Arc;

    fn ints(values: &[i64]) -> Value {
        Value::List(values.iter().copied().map(Value::Int).collect())
    }

    /// Closure 0 doubles an int, closure 1 tests evenness, closure 2 returns
    /// a string.
    fn env() -> Environment {
        Environment::builder()
            .invoker(Arc::new(
                |c: &Closure, args: Vec<Value>| -> Result<Value, HostError> {
                    let n = args[0].as_int().unwrap_or_default();
                    Ok(match c.function {
                        0 => Value::Int(n * 2),
                        1 => Value::Bool(n % 2 == 0),
                        _ => Value::str("nope"),
                    })
                },
            ))
            .build()
    }

    fn closure(function: u32) -> Value {
        Value::Closure(Arc::new(Closure {
            function,
            captures: vec![],
        }))
    }

    fn call(method: &str, args: &[Value]) -> Result<Value, BuiltinError> {
        let reg = BuiltinRegistry::new();
        register(&reg);
        reg.call_method(method, &env(), args)
    }

    #[test]
    fn append_and_reverse_leave_receiver_untouched() {
        let original = ints(&[1, 2]);
        let appended = call("append", &[original.clone(), Value::Int(3)]).unwrap();
        assert_eq!(appended, ints(&[1, 2, 3]));
        assert_eq!(original, ints(&[1, 2]));
        assert_eq!(call("reverse", &[appended]).unwrap(), ints(&[3, 2, 1]));
    }

    #[test]
    fn get_out_of_range_is_none() {
        let list = ints(&[10]);
        assert_eq!(
            call("get", &[list.clone(), Value::Int(0)]).unwrap(),
            Value::some(Value::Int(10))
        );
        assert_eq!(call("get", &[list.clone(), Value::Int(1)]).unwrap(), Value::none());
        assert_eq!(call("get", &[list, Value::Int(-1)]).unwrap(), Value::none());
    }

    #[test]
    fn map_and_filter_run_closures() {
        assert_eq!(
            call("map", &[ints(&[1, 2, 3]), closure(0)]).unwrap(),
            ints(&[2, 4, 6])
        );
        assert_eq!(
            call("filter", &[ints(&[1, 2, 3, 4]), closure(1)]).unwrap(),
            ints(&[2, 4])
        );
        let err = call("filter", &[ints(&[1]), closure(2)]).unwrap_err();
        assert!(matches!(err, BuiltinError::Host(HostError::Callback(_))));
    }

    #[test]
    fn closures_need_an_invoker() {
        let reg = BuiltinRegistry::new();
        register(&reg);
        let err = reg
            .call_method("map", &Environment::builder().build(), &[ints(&[1]), closure(0)])
            .unwrap_err();
        assert!(matches!(
            err,
            BuiltinError::Host(HostError::MissingService(_))
        ));
        // An empty list never calls the closure.
        assert_eq!(
            reg.call_method("map", &Environment::builder().build(), &[ints(&[]), closure(0)])
                .unwrap(),
            ints(&[])
        );
    }
}
