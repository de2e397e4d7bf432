//! `fs.*` builtins over the filesystem service.
//!
//! Relative paths resolve against the environment's exec root.

use crate::args;
use crate::registry::{BuiltinId, BuiltinMeta, BuiltinRegistry};
use brisk_core::{TypeDesc, Value};

pub const OPEN: BuiltinId = BuiltinId(100);
pub const READ: BuiltinId = BuiltinId(101);
pub const WRITE: BuiltinId = BuiltinId(102);
pub const CLOSE: BuiltinId = BuiltinId(103);
pub const EXISTS: BuiltinId = BuiltinId(104);
pub const REMOVE: BuiltinId = BuiltinId(105);
pub const MKDIR: BuiltinId = BuiltinId(106);
pub const EXEC_ROOT: BuiltinId = BuiltinId(107);

pub(crate) fn register(registry: &BuiltinRegistry) {
    registry.define(
        BuiltinMeta::function(OPEN, "fs.open")
            .param("path", TypeDesc::Str)
            .param("mode", TypeDesc::Str)
            .returns(TypeDesc::Handle),
        |env, args| {
            let path = env.resolve_path(args::string(args, 0)?);
            let handle = env.fs()?.open(&path, args::string(args, 1)?)?;
            Ok(Value::handle(handle))
        },
    );

    registry.define(
        BuiltinMeta::function(READ, "fs.read")
            .param("handle", TypeDesc::Handle)
            .param("n", TypeDesc::Int)
            .returns(TypeDesc::Bytes),
        |env, args| {
            let handle = args::handle(args, 0)?;
            Ok(Value::Bytes(env.fs()?.read(handle, args::int(args, 1)?)?))
        },
    );

    registry.define(
        BuiltinMeta::function(WRITE, "fs.write")
            .param("handle", TypeDesc::Handle)
            .param("data", TypeDesc::Bytes)
            .returns(TypeDesc::Int),
        |env, args| {
            let handle = args::handle(args, 0)?;
            let written = env.fs()?.write(handle, args::bytes(args, 1)?)?;
            Ok(Value::Int(written as i64))
        },
    );

    registry.define(
        BuiltinMeta::function(CLOSE, "fs.close").param("handle", TypeDesc::Handle),
        |env, args| {
            env.fs()?.close(args::handle(args, 0)?)?;
            Ok(Value::Unit)
        },
    );

    registry.define(
        BuiltinMeta::function(EXISTS, "fs.exists")
            .param("path", TypeDesc::Str)
            .returns(TypeDesc::Bool),
        |env, args| {
            let path = env.resolve_path(args::string(args, 0)?);
            Ok(Value::Bool(env.fs()?.exists(&path)?))
        },
    );

    registry.define(
        BuiltinMeta::function(REMOVE, "fs.remove").param("path", TypeDesc::Str),
        |env, args| {
            let path = env.resolve_path(args::string(args, 0)?);
            env.fs()?.remove(&path)?;
            Ok(Value::Unit)
        },
    );

    registry.define(
        BuiltinMeta::function(MKDIR, "fs.mkdir").param("path", TypeDesc::Str),
        |env, args| {
            let path = env.resolve_path(args::string(args, 0)?);
            env.fs()?.mkdir(&path)?;
            Ok(Value::Unit)
        },
    );

    registry.define(
        BuiltinMeta::function(EXEC_ROOT, "fs.execRoot").returns(TypeDesc::Str),
        |env, _| Ok(Value::str(env.exec_root().to_string_lossy())),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BuiltinError, ErrorKind};
    use brisk_runtime::fs::FsService;
    use brisk_runtime::{Environment, HostError};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn setup() -> (BuiltinRegistry, Environment, PathBuf) {
        let root = std::env::temp_dir()
            .join(format!("brisk_fs_builtins_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root).unwrap();
        let env = Environment::builder()
            .fs(Arc::new(FsService::new()))
            .exec_root(&root)
            .build();
        let registry = BuiltinRegistry::new();
        register(&registry);
        (registry, env, root)
    }

    #[test]
    fn relative_paths_land_under_exec_root() {
        let (reg, env, root) = setup();

        let h = reg
            .call(OPEN, &env, &[Value::str("note.txt"), Value::str("w")])
            .unwrap();
        assert_eq!(h.as_bytes().map(<[u8]>::len), Some(8));
        let written = reg
            .call(WRITE, &env, &[h.clone(), Value::Bytes(b"hi".to_vec())])
            .unwrap();
        assert_eq!(written, Value::Int(2));
        reg.call(CLOSE, &env, &[h]).unwrap();

        assert_eq!(std::fs::read(root.join("note.txt")).unwrap(), b"hi");
        assert_eq!(
            reg.call(EXISTS, &env, &[Value::str("note.txt")]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            reg.call(EXEC_ROOT, &env, &[]).unwrap(),
            Value::str(root.to_string_lossy())
        );

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn read_after_close_is_a_resource_error() {
        let (reg, env, root) = setup();
        std::fs::write(root.join("r.txt"), b"abc").unwrap();

        let h = reg
            .call(OPEN, &env, &[Value::str("r.txt"), Value::str("r")])
            .unwrap();
        assert_eq!(
            reg.call(READ, &env, &[h.clone(), Value::Int(10)]).unwrap(),
            Value::Bytes(b"abc".to_vec())
        );
        reg.call(CLOSE, &env, &[h.clone()]).unwrap();

        let err = reg.call(READ, &env, &[h.clone(), Value::Int(1)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
        let err = reg.call(CLOSE, &env, &[h]).unwrap_err();
        assert!(matches!(
            err,
            BuiltinError::Host(HostError::ResourceNotFound { .. })
        ));

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn contract_errors_precede_io() {
        let (reg, env, root) = setup();
        let err = reg
            .call(OPEN, &env, &[Value::str("x.txt"), Value::str("rwx")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Contract);
        assert!(!root.join("x.txt").exists());

        let err = reg
            .call(READ, &env, &[Value::Bytes(vec![]), Value::Int(1)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn mkdir_and_remove() {
        let (reg, env, root) = setup();
        reg.call(MKDIR, &env, &[Value::str("d")]).unwrap();
        assert!(root.join("d").is_dir());
        assert!(reg.call(MKDIR, &env, &[Value::str("d")]).is_err());
        reg.call(REMOVE, &env, &[Value::str("d")]).unwrap();
        assert_eq!(
            reg.call(EXISTS, &env, &[Value::str("d")]).unwrap(),
            Value::Bool(false)
        );
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn missing_service_is_reported() {
        let reg = BuiltinRegistry::new();
        register(&reg);
        let env = Environment::builder().build();
        let err = reg.call(EXISTS, &env, &[Value::str("x")]).unwrap_err();
        assert!(matches!(
            err,
            BuiltinError::Host(HostError::MissingService("filesystem"))
        ));
    }
}
