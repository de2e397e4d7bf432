use super::wire::{self, HttpVersion};
use super::{HttpService, IncomingRequest, RequestContext};
use crate::error::HostError;
use crate::net::{accept_interruptible, bind_listener, validate_port};
use brisk_core::Handle;
use std::collections::BTreeMap;
use std::io::{self, BufReader, ErrorKind, Read};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Validate a script-supplied status code.
pub fn validate_status(status: i64) -> Result<u16, HostError> {
    if (100..=999).contains(&status) {
        Ok(status as u16)
    } else {
        Err(HostError::InvalidArgument(format!(
            "status code must be in [100, 999], got {}",
            status
        )))
    }
}

impl HttpService {
    /// Bind an HTTP listener on `host:port` (port 0 picks a free port).
    pub fn listen(&self, host: &str, port: i64) -> Result<Handle, HostError> {
        let port = validate_port(port)?;
        let listener = bind_listener(host, port)?;
        let handle = self.listeners.insert(listener);
        debug!(%handle, host, port, "http listening");
        Ok(handle)
    }

    /// Block until a client connects, then parse exactly one request off the
    /// connection. The connection stays open until `respond` or `close`.
    ///
    /// A client that stalls mid-request is given `request_read_timeout_ms`;
    /// closing the listener releases the wait early with `ResourceClosed`.
    pub fn accept(&self, server: Handle) -> Result<IncomingRequest, HostError> {
        let listener = self.listeners.get(server)?;
        let (stream, peer) = accept_interruptible(
            &listener,
            self.accept_poll,
            || self.listeners.contains(server),
            || self.listeners.closed(server),
        )?;

        let tick = self.accept_poll.max(Duration::from_millis(1));
        stream
            .set_read_timeout(Some(tick))
            .map_err(|e| HostError::io("accept", e))?;
        let parsed = {
            let mut reader = BufReader::new(PatientReader {
                stream: &stream,
                deadline: Instant::now() + self.request_timeout,
                still_open: || self.listeners.contains(server),
            });
            wire::read_request(&mut reader, &self.limits)
        };
        let parsed = match parsed {
            Ok(parsed) => parsed,
            Err(_) if !self.listeners.contains(server) => {
                let _ = stream.shutdown(Shutdown::Both);
                return Err(self.listeners.closed(server));
            }
            Err(e) => {
                warn!(%server, %peer, error = %e, "rejecting unreadable request");
                reject(&stream, &e);
                return Err(e);
            }
        };

        let context = RequestContext {
            stream,
            version: parsed.version,
            head_only: parsed.method.eq_ignore_ascii_case("HEAD"),
        };
        let handle = self.requests.insert(context);
        debug!(
            %handle,
            %server,
            %peer,
            method = %parsed.method,
            target = %parsed.target,
            "http request accepted"
        );
        Ok(IncomingRequest {
            handle,
            method: parsed.method,
            path: parsed.path,
            headers: parsed.headers,
            body: parsed.body,
        })
    }

    /// Answer an accepted request and close its connection. The handle is
    /// consumed even when writing fails; a second `respond` is an error.
    pub fn respond(
        &self,
        request: Handle,
        status: i64,
        headers: &BTreeMap<String, String>,
        body: &[u8],
    ) -> Result<(), HostError> {
        let status = validate_status(status)?;
        wire::validate_response_headers(headers)?;
        let context = self.requests.remove(request)?;

        let written = wire::write_response(
            &mut &context.stream,
            context.version,
            status,
            headers,
            body,
            context.head_only,
        );
        if let Err(e) = context.stream.shutdown(Shutdown::Both) {
            warn!(%request, error = %e, "shutdown after respond failed");
        }
        written.map_err(|e| HostError::io("respond", e))?;
        debug!(%request, status, bytes = body.len(), "http response sent");
        Ok(())
    }

    /// Close a listener, or drop an accepted request without answering it.
    pub fn close(&self, handle: Handle) -> Result<(), HostError> {
        if self.listeners.take(handle).is_some() {
            debug!(%handle, "http listener closed");
            return Ok(());
        }
        let context = self.requests.remove(handle)?;
        if let Err(e) = context.stream.shutdown(Shutdown::Both) {
            warn!(%handle, error = %e, "shutdown of abandoned request failed");
        }
        debug!(%handle, "http request abandoned");
        Ok(())
    }

    /// Local address of a listener.
    pub fn local_addr(&self, server: Handle) -> Result<SocketAddr, HostError> {
        self.listeners
            .get(server)?
            .local_addr()
            .map_err(|e| HostError::io("local_addr", e))
    }
}

/// Reads from an accepted connection whose socket times out every poll
/// tick, retrying until data arrives, the listener goes away, or the
/// deadline passes.
struct PatientReader<'a, F> {
    stream: &'a TcpStream,
    deadline: Instant,
    still_open: F,
}

impl<F: Fn() -> bool> Read for PatientReader<'_, F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match (&*self.stream).read(buf) {
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    if !(self.still_open)() {
                        return Err(io::Error::new(
                            ErrorKind::ConnectionAborted,
                            "listener closed",
                        ));
                    }
                    if Instant::now() >= self.deadline {
                        return Err(io::Error::new(
                            ErrorKind::TimedOut,
                            "request not received in time",
                        ));
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                other => return other,
            }
        }
    }
}

/// Best-effort `400` for a request that could not be parsed.
fn reject(stream: &TcpStream, cause: &HostError) {
    let body = cause.to_string().into_bytes();
    let headers = BTreeMap::from([(
        "Content-Type".to_string(),
        "text/plain; charset=utf-8".to_string(),
    )]);
    let mut out = stream;
    let written =
        wire::write_response(&mut out, HttpVersion::Http11, 400, &headers, &body, false);
    if let Err(e) = written {
        debug!(error = %e, "could not send 400");
    }
    let _ = stream.shutdown(Shutdown::Both);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::error::ResourceKind;
    use std::io::{Read, Write};
    use std::sync::{mpsc, Arc};
    use std::thread;

    fn service() -> Arc<HttpService> {
        Arc::new(HttpService::new(&HttpConfig {
            accept_poll_ms: 5,
            ..HttpConfig::default()
        }))
    }

    fn raw_exchange(port: u16, request: &'static [u8]) -> thread::JoinHandle<String> {
        thread::spawn(move || {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
            stream.write_all(request).unwrap();
            let mut reply = String::new();
            stream.read_to_string(&mut reply).unwrap();
            reply
        })
    }

    #[test]
    fn status_range() {
        assert!(validate_status(99).is_err());
        assert_eq!(validate_status(100).unwrap(), 100);
        assert_eq!(validate_status(999).unwrap(), 999);
        assert!(validate_status(1000).is_err());
    }

    #[test]
    fn listen_rejects_bad_ports() {
        let http = service();
        assert!(matches!(
            http.listen("127.0.0.1", 70000),
            Err(HostError::InvalidArgument(_))
        ));
    }

    #[test]
    fn accept_parse_respond_cycle() {
        let http = service();
        let server = http.listen("127.0.0.1", 0).unwrap();
        let port = http.local_addr(server).unwrap().port();

        let client = raw_exchange(
            port,
            b"POST /items?id=3 HTTP/1.0\r\ncontent-length: 3\r\n\r\nabc",
        );
        let req = http.accept(server).unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/items");
        assert_eq!(req.headers.get("Content-Length").unwrap(), "3");
        assert_eq!(req.body, b"abc");
        assert_eq!(http.pending_requests(), 1);

        http.respond(req.handle, 201, &BTreeMap::new(), b"made").unwrap();
        let reply = client.join().unwrap();
        assert!(reply.starts_with("HTTP/1.0 201 Created\r\n"), "{}", reply);
        assert!(reply.ends_with("\r\n\r\nmade"));
        assert_eq!(http.pending_requests(), 0);

        http.close(server).unwrap();
    }

    #[test]
    fn respond_twice_is_a_resource_error() {
        let http = service();
        let server = http.listen("127.0.0.1", 0).unwrap();
        let port = http.local_addr(server).unwrap().port();

        let client = raw_exchange(port, b"GET / HTTP/1.1\r\n\r\n");
        let req = http.accept(server).unwrap();
        http.respond(req.handle, 200, &BTreeMap::new(), b"").unwrap();
        client.join().unwrap();

        assert!(matches!(
            http.respond(req.handle, 200, &BTreeMap::new(), b""),
            Err(HostError::ResourceNotFound {
                kind: ResourceKind::HttpRequest,
                ..
            })
        ));
        assert!(http.close(req.handle).is_err());
        http.close(server).unwrap();
    }

    #[test]
    fn bad_status_leaves_request_answerable() {
        let http = service();
        let server = http.listen("127.0.0.1", 0).unwrap();
        let port = http.local_addr(server).unwrap().port();

        let client = raw_exchange(port, b"GET / HTTP/1.1\r\n\r\n");
        let req = http.accept(server).unwrap();
        assert!(matches!(
            http.respond(req.handle, 42, &BTreeMap::new(), b""),
            Err(HostError::InvalidArgument(_))
        ));
        http.respond(req.handle, 204, &BTreeMap::new(), b"").unwrap();
        assert!(client.join().unwrap().starts_with("HTTP/1.1 204 No Content"));
        http.close(server).unwrap();
    }

    #[test]
    fn malformed_request_gets_400_and_no_handle() {
        let http = service();
        let server = http.listen("127.0.0.1", 0).unwrap();
        let port = http.local_addr(server).unwrap().port();

        let client = raw_exchange(port, b"NONSENSE\r\n\r\n");
        assert!(matches!(
            http.accept(server),
            Err(HostError::MalformedRequest(_))
        ));
        assert!(client.join().unwrap().starts_with("HTTP/1.1 400 Bad Request"));
        assert_eq!(http.pending_requests(), 0);
        http.close(server).unwrap();
    }

    #[test]
    fn closing_listener_releases_pending_accept() {
        let http = service();
        let server = http.listen("127.0.0.1", 0).unwrap();

        let waiter_http = http.clone();
        let waiter = thread::spawn(move || waiter_http.accept(server));
        thread::sleep(Duration::from_millis(50));
        http.close(server).unwrap();

        assert!(matches!(
            waiter.join().unwrap(),
            Err(HostError::ResourceClosed {
                kind: ResourceKind::HttpListener,
                ..
            })
        ));
    }

    #[test]
    fn closing_listener_releases_accept_stuck_on_idle_client() {
        let http = service();
        let server = http.listen("127.0.0.1", 0).unwrap();
        let port = http.local_addr(server).unwrap().port();
        let _idle = TcpStream::connect(("127.0.0.1", port)).unwrap();

        let (tx, rx) = mpsc::channel();
        let waiter_http = http.clone();
        thread::spawn(move || tx.send(waiter_http.accept(server)).unwrap());
        thread::sleep(Duration::from_millis(50));
        http.close(server).unwrap();

        let result = rx.recv_timeout(Duration::from_secs(2)).expect("accept still blocked");
        assert!(matches!(
            result,
            Err(HostError::ResourceClosed {
                kind: ResourceKind::HttpListener,
                ..
            })
        ));
        assert_eq!(http.pending_requests(), 0);
    }

    #[test]
    fn stalled_request_times_out_and_listener_survives() {
        let http = Arc::new(HttpService::new(&HttpConfig {
            accept_poll_ms: 5,
            request_read_timeout_ms: 100,
            ..HttpConfig::default()
        }));
        let server = http.listen("127.0.0.1", 0).unwrap();
        let port = http.local_addr(server).unwrap().port();

        let mut stalled = TcpStream::connect(("127.0.0.1", port)).unwrap();
        stalled.write_all(b"GET / HT").unwrap();
        let started = std::time::Instant::now();
        assert!(matches!(http.accept(server), Err(HostError::Io { .. })));
        assert!(started.elapsed() < Duration::from_secs(2));

        let client = raw_exchange(port, b"GET /next HTTP/1.1\r\n\r\n");
        let req = http.accept(server).unwrap();
        assert_eq!(req.path, "/next");
        http.respond(req.handle, 200, &BTreeMap::new(), b"ok").unwrap();
        assert!(client.join().unwrap().ends_with("ok"));
        http.close(server).unwrap();
    }

    #[test]
    fn abandoned_request_closes_connection() {
        let http = service();
        let server = http.listen("127.0.0.1", 0).unwrap();
        let port = http.local_addr(server).unwrap().port();

        let client = raw_exchange(port, b"GET /x HTTP/1.1\r\n\r\n");
        let req = http.accept(server).unwrap();
        http.close(req.handle).unwrap();
        assert_eq!(client.join().unwrap(), "");
        http.close(server).unwrap();
    }
}
