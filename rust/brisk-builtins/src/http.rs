//! `http.*` builtins: the blocking client and the one-shot server.
//!
//! Structured results are anonymous records whose field order matches
//! [`response_shape`] and [`request_shape`].

use crate::args;
use crate::error::BuiltinError;
use crate::registry::{BuiltinId, BuiltinMeta, BuiltinRegistry};
use brisk_core::{TypeDesc, Value};

pub const REQUEST: BuiltinId = BuiltinId(300);
pub const LISTEN: BuiltinId = BuiltinId(301);
pub const ACCEPT: BuiltinId = BuiltinId(302);
pub const RESPOND: BuiltinId = BuiltinId(303);
pub const CLOSE: BuiltinId = BuiltinId(304);
pub const LOCAL_PORT: BuiltinId = BuiltinId(305);

/// `{status: int, headers: dict<string>, body: bytes}`
pub fn response_shape() -> TypeDesc {
    TypeDesc::shape([
        ("status", TypeDesc::Int),
        ("headers", TypeDesc::dict(TypeDesc::Str)),
        ("body", TypeDesc::Bytes),
    ])
}

/// `{handle: handle, method: string, path: string, headers: dict<string>, body: bytes}`
pub fn request_shape() -> TypeDesc {
    TypeDesc::shape([
        ("handle", TypeDesc::Handle),
        ("method", TypeDesc::Str),
        ("path", TypeDesc::Str),
        ("headers", TypeDesc::dict(TypeDesc::Str)),
        ("body", TypeDesc::Bytes),
    ])
}

pub(crate) fn register(registry: &BuiltinRegistry) {
    registry.define(
        BuiltinMeta::function(REQUEST, "http.request")
            .param("method", TypeDesc::Str)
            .param("url", TypeDesc::Str)
            .param("headers", TypeDesc::dict(TypeDesc::Str))
            .param("body", TypeDesc::optional(TypeDesc::Bytes))
            .returns(response_shape()),
        |env, args| {
            let method = args::string(args, 0)?;
            let url = args::string(args, 1)?;
            let headers = args::string_map(args, 2)?;
            let body = match args::optional(args, 3)? {
                Some(Value::Bytes(b)) => Some(b.as_slice()),
                Some(other) => {
                    return Err(BuiltinError::InvalidArgument(format!(
                        "body must be bytes, got {}",
                        other.type_name()
                    )))
                }
                None => None,
            };
            let response = env.http()?.request(method, url, &headers, body)?;
            Ok(Value::record(vec![
                Value::Int(i64::from(response.status)),
                Value::string_dict(response.headers),
                Value::Bytes(response.body),
            ]))
        },
    );

    registry.define(
        BuiltinMeta::function(LISTEN, "http.listen")
            .param("host", TypeDesc::Str)
            .param("port", TypeDesc::Int)
            .returns(TypeDesc::Handle),
        |env, args| {
            let (host, port) = (args::string(args, 0)?, args::int(args, 1)?);
            Ok(Value::handle(env.http()?.listen(host, port)?))
        },
    );

    registry.define(
        BuiltinMeta::function(ACCEPT, "http.accept")
            .param("server", TypeDesc::Handle)
            .returns(request_shape()),
        |env, args| {
            let server = args::handle(args, 0)?;
            let req = env.http()?.accept(server)?;
            Ok(Value::record(vec![
                Value::handle(req.handle),
                Value::Str(req.method),
                Value::Str(req.path),
                Value::string_dict(req.headers),
                Value::Bytes(req.body),
            ]))
        },
    );

    registry.define(
        BuiltinMeta::function(RESPOND, "http.respond")
            .param("request", TypeDesc::Handle)
            .param("status", TypeDesc::Int)
            .param("headers", TypeDesc::dict(TypeDesc::Str))
            .param("body", TypeDesc::Bytes),
        |env, args| {
            let request = args::handle(args, 0)?;
            let status = args::int(args, 1)?;
            let headers = args::string_map(args, 2)?;
            env.http()?
                .respond(request, status, &headers, args::bytes(args, 3)?)?;
            Ok(Value::Unit)
        },
    );

    registry.define(
        BuiltinMeta::function(CLOSE, "http.close").param("handle", TypeDesc::Handle),
        |env, args| {
            env.http()?.close(args::handle(args, 0)?)?;
            Ok(Value::Unit)
        },
    );

    registry.define(
        BuiltinMeta::function(LOCAL_PORT, "http.localPort")
            .param("server", TypeDesc::Handle)
            .returns(TypeDesc::Int),
        |env, args| {
            let addr = env.http()?.local_addr(args::handle(args, 0)?)?;
            Ok(Value::Int(i64::from(addr.port())))
        },
    );
}
