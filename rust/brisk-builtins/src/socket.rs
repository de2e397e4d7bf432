//! `socket.*` builtins over the TCP service.

use crate::args;
use crate::registry::{BuiltinId, BuiltinMeta, BuiltinRegistry};
use brisk_core::{TypeDesc, Value};

pub const CONNECT: BuiltinId = BuiltinId(200);
pub const LISTEN: BuiltinId = BuiltinId(201);
pub const ACCEPT: BuiltinId = BuiltinId(202);
pub const READ: BuiltinId = BuiltinId(203);
pub const WRITE: BuiltinId = BuiltinId(204);
pub const CLOSE: BuiltinId = BuiltinId(205);
pub const LOCAL_PORT: BuiltinId = BuiltinId(206);

pub(crate) fn register(registry: &BuiltinRegistry) {
    registry.define(
        BuiltinMeta::function(CONNECT, "socket.connect")
            .param("host", TypeDesc::Str)
            .param("port", TypeDesc::Int)
            .returns(TypeDesc::Handle),
        |env, args| {
            let (host, port) = (args::string(args, 0)?, args::int(args, 1)?);
            Ok(Value::handle(env.net()?.connect(host, port)?))
        },
    );

    registry.define(
        BuiltinMeta::function(LISTEN, "socket.listen")
            .param("host", TypeDesc::Str)
            .param("port", TypeDesc::Int)
            .returns(TypeDesc::Handle),
        |env, args| {
            let (host, port) = (args::string(args, 0)?, args::int(args, 1)?);
            Ok(Value::handle(env.net()?.listen(host, port)?))
        },
    );

    registry.define(
        BuiltinMeta::function(ACCEPT, "socket.accept")
            .param("server", TypeDesc::Handle)
            .returns(TypeDesc::Handle),
        |env, args| {
            let server = args::handle(args, 0)?;
            Ok(Value::handle(env.net()?.accept(server)?))
        },
    );

    registry.define(
        BuiltinMeta::function(READ, "socket.read")
            .param("handle", TypeDesc::Handle)
            .param("n", TypeDesc::Int)
            .returns(TypeDesc::Bytes),
        |env, args| {
            let handle = args::handle(args, 0)?;
            Ok(Value::Bytes(env.net()?.read(handle, args::int(args, 1)?)?))
        },
    );

    registry.define(
        BuiltinMeta::function(WRITE, "socket.write")
            .param("handle", TypeDesc::Handle)
            .param("data", TypeDesc::Bytes)
            .returns(TypeDesc::Int),
        |env, args| {
            let handle = args::handle(args, 0)?;
            let written = env.net()?.write(handle, args::bytes(args, 1)?)?;
            Ok(Value::Int(written as i64))
        },
    );

    registry.define(
        BuiltinMeta::function(CLOSE, "socket.close").param("handle", TypeDesc::Handle),
        |env, args| {
            env.net()?.close(args::handle(args, 0)?)?;
            Ok(Value::Unit)
        },
    );

    registry.define(
        BuiltinMeta::function(LOCAL_PORT, "socket.localPort")
            .param("handle", TypeDesc::Handle)
            .returns(TypeDesc::Int),
        |env, args| {
            let addr = env.net()?.local_addr(args::handle(args, 0)?)?;
            Ok(Value::Int(i64::from(addr.port())))
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use brisk_runtime::net::NetService;
    use brisk_runtime::Environment;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn setup() -> (Arc<BuiltinRegistry>, Environment) {
        let env = Environment::builder()
            .net(Arc::new(NetService::new(Duration::from_millis(5))))
            .build();
        let registry = BuiltinRegistry::new();
        register(&registry);
        (Arc::new(registry), env)
    }

    #[test]
    fn echo_over_builtins() {
        let (reg, env) = setup();
        let server = reg
            .call(LISTEN, &env, &[Value::str("127.0.0.1"), Value::Int(0)])
            .unwrap();
        let port = reg.call(LOCAL_PORT, &env, &[server.clone()]).unwrap();

        let (client_reg, client_env) = (reg.clone(), env.clone());
        let client = thread::spawn(move || {
            let conn = client_reg
                .call(CONNECT, &client_env, &[Value::str("127.0.0.1"), port])
                .unwrap();
            client_reg
                .call(WRITE, &client_env, &[conn.clone(), Value::Bytes(b"hey".to_vec())])
                .unwrap();
            client_reg.call(CLOSE, &client_env, &[conn]).unwrap();
        });

        let conn = reg.call(ACCEPT, &env, &[server.clone()]).unwrap();
        client.join().unwrap();
        let mut got = Vec::new();
        loop {
            match reg.call(READ, &env, &[conn.clone(), Value::Int(16)]).unwrap() {
                Value::Bytes(b) if b.is_empty() => break,
                Value::Bytes(b) => got.extend(b),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(got, b"hey");

        reg.call(CLOSE, &env, &[conn]).unwrap();
        reg.call(CLOSE, &env, &[server]).unwrap();
    }

    #[test]
    fn bad_ports_and_lengths_are_contract_errors() {
        let (reg, env) = setup();
        let err = reg
            .call(CONNECT, &env, &[Value::str("127.0.0.1"), Value::Int(70_000)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Contract);

        let server = reg
            .call(LISTEN, &env, &[Value::str("127.0.0.1"), Value::Int(0)])
            .unwrap();
        let port = reg.call(LOCAL_PORT, &env, &[server.clone()]).unwrap();
        let conn = reg
            .call(CONNECT, &env, &[Value::str("127.0.0.1"), port])
            .unwrap();
        let err = reg
            .call(READ, &env, &[conn.clone(), Value::Int(-1)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Contract);

        reg.call(CLOSE, &env, &[conn]).unwrap();
        reg.call(CLOSE, &env, &[server]).unwrap();
    }
}
