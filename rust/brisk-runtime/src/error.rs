//! Errors returned by the host services.

use brisk_core::HandleError;
use std::fmt;
use thiserror::Error;

/// The resource domain a handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    File,
    Socket,
    Listener,
    HttpListener,
    HttpRequest,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::File => "file",
            ResourceKind::Socket => "socket",
            ResourceKind::Listener => "listener",
            ResourceKind::HttpListener => "http listener",
            ResourceKind::HttpRequest => "http request",
        };
        f.write_str(s)
    }
}

/// Every failure a host service can report.
///
/// Unknown, stale, and already-closed handles all surface as
/// [`HostError::ResourceNotFound`]; a table never distinguishes "never
/// existed" from "already closed".
#[derive(Debug, Error)]
pub enum HostError {
    /// A contract violation detected before any OS interaction.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid handle: {0}")]
    InvalidHandle(#[from] HandleError),
    #[error("{kind} handle {id} not found")]
    ResourceNotFound { kind: ResourceKind, id: u64 },
    /// The handle was closed by another caller while this call was blocked on it.
    #[error("{kind} handle {id} was closed during the call")]
    ResourceClosed { kind: ResourceKind, id: u64 },
    #[error("{0} service is not available")]
    MissingService(&'static str),
    #[error("{op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("http request failed: {0}")]
    Http(String),
    #[error("malformed http request: {0}")]
    MalformedRequest(String),
    #[error("closure call failed: {0}")]
    Callback(String),
}

impl HostError {
    /// Wrap an OS error with the name of the operation that produced it.
    pub fn io(op: &'static str, source: std::io::Error) -> Self {
        HostError::Io { op, source }
    }

    /// `true` for errors about the handle itself rather than the operation.
    pub fn is_resource_error(&self) -> bool {
        matches!(
            self,
            HostError::InvalidHandle(_)
                | HostError::ResourceNotFound { .. }
                | HostError::ResourceClosed { .. }
                | HostError::MissingService(_)
        )
    }
}
