//! Methods on optionals.

use crate::args;
use crate::registry::{BuiltinId, BuiltinMeta, BuiltinRegistry};
use brisk_core::{TypeDesc, Value};

pub const IS_SOME: BuiltinId = BuiltinId(1400);
pub const UNWRAP_OR: BuiltinId = BuiltinId(1401);

fn method(id: BuiltinId, name: &str) -> BuiltinMeta {
    BuiltinMeta::method(id, TypeDesc::optional(TypeDesc::Any), name)
}

pub(crate) fn register(registry: &BuiltinRegistry) {
    registry.define(method(IS_SOME, "isSome").returns(TypeDesc::Bool), |_, args| {
        Ok(Value::Bool(args::optional(args, 0)?.is_some()))
    });

    registry.define(
        method(UNWRAP_OR, "unwrapOr")
            .param("default", TypeDesc::Any)
            .returns(TypeDesc::Any),
        |_, args| {
            let inner = args::optional(args, 0)?;
            Ok(inner.unwrap_or(args::any(args, 1)?).clone())
        },
    );
}
