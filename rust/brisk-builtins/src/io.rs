//! `io.*` builtins over the environment's IO channel.

use crate::args;
use crate::registry::{BuiltinId, BuiltinMeta, BuiltinRegistry};
use brisk_core::{TypeDesc, Value};
use brisk_runtime::HostError;

pub const PRINT: BuiltinId = BuiltinId(500);
pub const PRINTLN: BuiltinId = BuiltinId(501);
pub const EPRINTLN: BuiltinId = BuiltinId(502);
pub const READ_LINE: BuiltinId = BuiltinId(503);

pub(crate) fn register(registry: &BuiltinRegistry) {
    registry.define(
        BuiltinMeta::function(PRINT, "io.print").param("value", TypeDesc::Any),
        |env, args| {
            env.io()?
                .write_out(&args::any(args, 0)?.display_pretty())
                .map_err(|e| HostError::io("print", e))?;
            Ok(Value::Unit)
        },
    );

    registry.define(
        BuiltinMeta::function(PRINTLN, "io.println").param("value", TypeDesc::Any),
        |env, args| {
            let line = format!("{}\n", args::any(args, 0)?.display_pretty());
            env.io()?
                .write_out(&line)
                .map_err(|e| HostError::io("print", e))?;
            Ok(Value::Unit)
        },
    );

    registry.define(
        BuiltinMeta::function(EPRINTLN, "io.eprintln").param("value", TypeDesc::Any),
        |env, args| {
            let line = format!("{}\n", args::any(args, 0)?.display_pretty());
            env.io()?
                .write_err(&line)
                .map_err(|e| HostError::io("print", e))?;
            Ok(Value::Unit)
        },
    );

    registry.define(
        BuiltinMeta::function(READ_LINE, "io.readLine").returns(TypeDesc::optional(TypeDesc::Str)),
        |env, _| {
            let line = env
                .io()?
                .read_line()
                .map_err(|e| HostError::io("read line", e))?;
            Ok(line.map_or_else(Value::none, |l| Value::some(Value::Str(l))))
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use brisk_runtime::io::BufferedIo;
    use brisk_runtime::Environment;
    use std::sync::Arc;

    #[test]
    fn output_goes_through_the_channel() {
        let io = Arc::new(BufferedIo::with_input(["typed"]));
        let env = Environment::builder().io(io.clone()).build();
        let reg = BuiltinRegistry::new();
        register(&reg);

        reg.call(PRINT, &env, &[Value::str("a")]).unwrap();
        reg.call(PRINTLN, &env, &[Value::Int(7)]).unwrap();
        reg.call(EPRINTLN, &env, &[Value::List(vec![Value::Bool(true)])])
            .unwrap();
        assert_eq!(io.stdout(), "a7\n");
        assert_eq!(io.stderr(), "[true]\n");

        assert_eq!(
            reg.call(READ_LINE, &env, &[]).unwrap(),
            Value::some(Value::str("typed"))
        );
        assert_eq!(reg.call(READ_LINE, &env, &[]).unwrap(), Value::none());
    }
}
