//! Handle-based TCP socket service.
//!
//! Connections and listeners live in two tables that draw identifiers from
//! one allocator, so a handle is valid in at most one of them and `close`
//! can look in both.
//!
//! Blocking calls run on the caller's thread. A blocked call is released by
//! closing its handle from another thread: `close` shuts a connection down,
//! which wakes a pending `read`, and listeners are polled in non-blocking
//! mode so a pending `accept` notices its handle disappearing. Either way the
//! blocked call reports [`HostError::ResourceClosed`].

use crate::error::{HostError, ResourceKind};
use crate::fs::read_limit;
use crate::table::{HandleAllocator, ResourceTable};
use brisk_core::Handle;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Largest buffer a single socket read allocates, whatever `n` asks for.
const MAX_READ_CHUNK: u64 = 1024 * 1024;

/// Validate a script-supplied port before any network call.
pub fn validate_port(port: i64) -> Result<u16, HostError> {
    u16::try_from(port).map_err(|_| {
        HostError::InvalidArgument(format!("port must be in [0, 65535], got {}", port))
    })
}

/// Bind a listener and switch it to non-blocking mode for interruptible accepts.
pub(crate) fn bind_listener(host: &str, port: u16) -> Result<TcpListener, HostError> {
    let listener = TcpListener::bind((host, port)).map_err(|e| HostError::io("listen", e))?;
    listener
        .set_nonblocking(true)
        .map_err(|e| HostError::io("listen", e))?;
    Ok(listener)
}

/// Wait for a peer on a non-blocking listener, giving up with
/// [`HostError::ResourceClosed`] once `still_open` reports the handle gone.
pub(crate) fn accept_interruptible(
    listener: &TcpListener,
    poll: Duration,
    still_open: impl Fn() -> bool,
    closed: impl Fn() -> HostError,
) -> Result<(TcpStream, SocketAddr), HostError> {
    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                // Some platforms hand out sockets inheriting the listener's
                // non-blocking flag.
                stream
                    .set_nonblocking(false)
                    .map_err(|e| HostError::io("accept", e))?;
                return Ok((stream, peer));
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                if !still_open() {
                    return Err(closed());
                }
                std::thread::sleep(poll);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                if !still_open() {
                    return Err(closed());
                }
                return Err(HostError::io("accept", e));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// NetService
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct NetService {
    streams: ResourceTable<TcpStream>,
    listeners: ResourceTable<TcpListener>,
    accept_poll: Duration,
}

impl Default for NetService {
    fn default() -> Self {
        Self::new(Duration::from_millis(10))
    }
}

impl NetService {
    pub fn new(accept_poll: Duration) -> Self {
        let ids = Arc::new(HandleAllocator::new());
        Self {
            streams: ResourceTable::with_allocator(ResourceKind::Socket, ids.clone()),
            listeners: ResourceTable::with_allocator(ResourceKind::Listener, ids),
            accept_poll,
        }
    }

    /// Dial `host:port` and register the connection.
    pub fn connect(&self, host: &str, port: i64) -> Result<Handle, HostError> {
        let port = validate_port(port)?;
        let stream = TcpStream::connect((host, port)).map_err(|e| HostError::io("connect", e))?;
        let handle = self.streams.insert(stream);
        debug!(%handle, host, port, "socket connected");
        Ok(handle)
    }

    /// Bind a listener on `host:port` (port 0 picks a free port).
    pub fn listen(&self, host: &str, port: i64) -> Result<Handle, HostError> {
        let port = validate_port(port)?;
        let listener = bind_listener(host, port)?;
        let handle = self.listeners.insert(listener);
        debug!(%handle, host, port, "socket listening");
        Ok(handle)
    }

    /// Block until a peer connects; the connection gets its own handle.
    pub fn accept(&self, server: Handle) -> Result<Handle, HostError> {
        let listener = self.listeners.get(server)?;
        let (stream, peer) = accept_interruptible(
            &listener,
            self.accept_poll,
            || self.listeners.contains(server),
            || self.listeners.closed(server),
        )?;
        let handle = self.streams.insert(stream);
        debug!(%handle, %server, %peer, "socket accepted");
        Ok(handle)
    }

    /// One OS read of at most `n` bytes. An empty result means the peer
    /// closed its side.
    pub fn read(&self, handle: Handle, n: i64) -> Result<Vec<u8>, HostError> {
        let limit = read_limit(n)?;
        let stream = self.streams.get(handle)?;
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut buf = vec![0u8; limit.min(MAX_READ_CHUNK) as usize];
        let result = (&*stream).read(&mut buf);
        let closed_meanwhile = !self.streams.contains(handle);
        match result {
            Ok(0) if closed_meanwhile => Err(self.streams.closed(handle)),
            Ok(read) => {
                buf.truncate(read);
                trace!(%handle, requested = limit, read, "socket read");
                Ok(buf)
            }
            Err(_) if closed_meanwhile => Err(self.streams.closed(handle)),
            Err(e) => Err(HostError::io("read", e)),
        }
    }

    /// Issue one write; short writes are reported, not retried.
    pub fn write(&self, handle: Handle, data: &[u8]) -> Result<usize, HostError> {
        let stream = self.streams.get(handle)?;
        let written = (&*stream)
            .write(data)
            .map_err(|e| HostError::io("write", e))?;
        trace!(%handle, requested = data.len(), written, "socket write");
        Ok(written)
    }

    /// Close a connection or a listener.
    pub fn close(&self, handle: Handle) -> Result<(), HostError> {
        if let Some(stream) = self.streams.take(handle) {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                trace!(%handle, error = %e, "shutdown on close failed");
            }
            debug!(%handle, "socket closed");
            return Ok(());
        }
        if self.listeners.take(handle).is_some() {
            debug!(%handle, "listener closed");
            return Ok(());
        }
        Err(self.streams.not_found(handle))
    }

    /// Local address of a connection or listener.
    pub fn local_addr(&self, handle: Handle) -> Result<SocketAddr, HostError> {
        if let Ok(stream) = self.streams.get(handle) {
            return stream
                .local_addr()
                .map_err(|e| HostError::io("local_addr", e));
        }
        let listener = self
            .listeners
            .get(handle)
            .map_err(|_| self.streams.not_found(handle))?;
        listener
            .local_addr()
            .map_err(|e| HostError::io("local_addr", e))
    }
}
