//! Call-time and registration-time errors.

use crate::registry::BuiltinId;
use brisk_core::{TypeDesc, TypeKind};
use brisk_runtime::HostError;
use thiserror::Error;

/// Why a builtin call failed.
#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("{name} expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("{name}: argument {index} ('{param}') expects {expected}, got {got}")]
    TypeMismatch {
        name: String,
        index: usize,
        param: String,
        expected: TypeDesc,
        got: &'static str,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unknown builtin {0}")]
    UnknownBuiltin(String),
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Coarse classification the interpreter uses to decide between catching
/// an error and aborting the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad argument count, tag, or value. Detected before any OS call.
    Contract,
    /// Unknown, stale, or closed handle, or a missing service.
    Resource,
    /// Failure reported by the OS or the remote peer.
    Io,
}

impl BuiltinError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuiltinError::Arity { .. }
            | BuiltinError::TypeMismatch { .. }
            | BuiltinError::InvalidArgument(_)
            | BuiltinError::UnknownBuiltin(_) => ErrorKind::Contract,
            BuiltinError::Host(HostError::InvalidArgument(_)) => ErrorKind::Contract,
            BuiltinError::Host(e) if e.is_resource_error() => ErrorKind::Resource,
            BuiltinError::Host(_) => ErrorKind::Io,
        }
    }
}

/// Metadata that violates a registry invariant. Never occurs at run time:
/// the standard registry is built once at startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    #[error("{name}: {names} parameter name(s) for arity {arity}")]
    ParamNames {
        name: String,
        arity: usize,
        names: usize,
    },
    #[error("{name}: {types} parameter type(s) for arity {arity}")]
    ParamTypes {
        name: String,
        arity: usize,
        types: usize,
    },
    #[error("{name}: first parameter must have receiver type {receiver}")]
    ReceiverMismatch { name: String, receiver: TypeDesc },
    #[error("{name}: a receiver type requires a method name and vice versa")]
    IncompleteMethod { name: String },
    #[error("builtin id {id} already registered as {existing}")]
    DuplicateId { id: BuiltinId, existing: String },
    #[error("builtin name {0} already registered")]
    DuplicateName(String),
    #[error("method {receiver}.{method} already registered")]
    DuplicateMethod { receiver: TypeKind, method: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_taxonomy() {
        assert_eq!(
            BuiltinError::InvalidArgument("x".into()).kind(),
            ErrorKind::Contract
        );
        assert_eq!(
            BuiltinError::Host(HostError::InvalidArgument("port".into())).kind(),
            ErrorKind::Contract
        );
        assert_eq!(
            BuiltinError::Host(HostError::MissingService("fs")).kind(),
            ErrorKind::Resource
        );
        assert_eq!(
            BuiltinError::Host(HostError::io("read", std::io::Error::other("boom"))).kind(),
            ErrorKind::Io
        );
    }

    #[test]
    fn host_errors_display_transparently() {
        let err = BuiltinError::from(HostError::Http("refused".into()));
        assert_eq!(err.to_string(), "http request failed: refused");
    }
}
