//! HTTP service: a blocking client and a one-request-per-connection server.
//!
//! The two roles share one service object but no state. Server listeners and
//! accepted-but-unanswered requests live in two tables that draw identifiers
//! from one allocator, so `close` can take either kind of handle.
//!
//! Every accepted connection moves through `accepted -> parsed -> responded`.
//! `respond` writes the reply and closes the connection; there is no
//! keep-alive and no way back from the responded state.

mod client;
mod server;
pub mod wire;

use crate::config::HttpConfig;
use crate::error::ResourceKind;
use crate::table::{HandleAllocator, ResourceTable};
use brisk_core::Handle;
use std::collections::BTreeMap;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;
use wire::{HttpVersion, WireLimits};

/// A fully buffered response received by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Canonicalized names; multi-valued headers joined with `", "`.
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

/// One request taken off an accepted connection, with the handle that
/// `respond` answers it through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingRequest {
    pub handle: Handle,
    pub method: String,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

/// What `respond` needs to answer an accepted request.
#[derive(Debug)]
struct RequestContext {
    stream: TcpStream,
    version: HttpVersion,
    head_only: bool,
}

#[derive(Debug)]
pub struct HttpService {
    client_timeout: Duration,
    limits: WireLimits,
    accept_poll: Duration,
    request_timeout: Duration,
    proxy_from_env: bool,
    listeners: ResourceTable<TcpListener>,
    requests: ResourceTable<RequestContext>,
}

impl Default for HttpService {
    fn default() -> Self {
        Self::new(&HttpConfig::default())
    }
}

impl HttpService {
    pub fn new(config: &HttpConfig) -> Self {
        let ids = Arc::new(HandleAllocator::new());
        Self {
            client_timeout: Duration::from_millis(config.client_timeout_ms),
            limits: WireLimits {
                max_header_bytes: config.max_header_bytes,
                max_body_bytes: config.max_body_bytes,
            },
            accept_poll: Duration::from_millis(config.accept_poll_ms),
            request_timeout: Duration::from_millis(config.request_read_timeout_ms),
            proxy_from_env: config.proxy_from_env,
            listeners: ResourceTable::with_allocator(ResourceKind::HttpListener, ids.clone()),
            requests: ResourceTable::with_allocator(ResourceKind::HttpRequest, ids),
        }
    }

    /// Number of accepted requests still waiting for `respond`.
    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }
}
