//! The environment builtins receive at call time.
//!
//! An [`Environment`] bundles the host services, the IO channel, the exec
//! root, a struct-name lookup, and a callback into the interpreter for
//! running closures. Every dependency is optional: a builtin that needs a
//! missing one gets [`HostError::MissingService`] instead of a panic.

use crate::config::RuntimeConfig;
use crate::error::HostError;
use crate::fs::FsService;
use crate::http::HttpService;
use crate::io::{IoChannel, StdIo};
use crate::net::NetService;
use brisk_core::{Closure, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Interpreter callback used by higher-order builtins such as `list.map`.
pub trait ClosureInvoker: Send + Sync {
    fn invoke(&self, closure: &Closure, args: Vec<Value>) -> Result<Value, HostError>;
}

impl<F> ClosureInvoker for F
where
    F: Fn(&Closure, Vec<Value>) -> Result<Value, HostError> + Send + Sync,
{
    fn invoke(&self, closure: &Closure, args: Vec<Value>) -> Result<Value, HostError> {
        self(closure, args)
    }
}

type StructNames = Arc<dyn Fn(u32) -> Option<String> + Send + Sync>;

#[derive(Clone)]
pub struct Environment {
    fs: Option<Arc<FsService>>,
    net: Option<Arc<NetService>>,
    http: Option<Arc<HttpService>>,
    io: Option<Arc<dyn IoChannel>>,
    exec_root: PathBuf,
    struct_names: Option<StructNames>,
    invoker: Option<Arc<dyn ClosureInvoker>>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("fs", &self.fs.is_some())
            .field("net", &self.net.is_some())
            .field("http", &self.http.is_some())
            .field("io", &self.io.is_some())
            .field("exec_root", &self.exec_root)
            .field("struct_names", &self.struct_names.is_some())
            .field("invoker", &self.invoker.is_some())
            .finish()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::from_config(&RuntimeConfig::default())
    }
}

impl Environment {
    /// Real OS-backed services configured from `config`, standard IO.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        EnvironmentBuilder::from_config(config).build()
    }

    /// An empty builder: no services, exec root `.`.
    pub fn builder() -> EnvironmentBuilder {
        EnvironmentBuilder::new()
    }

    pub fn fs(&self) -> Result<&FsService, HostError> {
        self.fs.as_deref().ok_or(HostError::MissingService("filesystem"))
    }

    pub fn net(&self) -> Result<&NetService, HostError> {
        self.net.as_deref().ok_or(HostError::MissingService("network"))
    }

    pub fn http(&self) -> Result<&HttpService, HostError> {
        self.http.as_deref().ok_or(HostError::MissingService("http"))
    }

    pub fn io(&self) -> Result<&dyn IoChannel, HostError> {
        self.io.as_deref().ok_or(HostError::MissingService("io"))
    }

    pub fn exec_root(&self) -> &Path {
        &self.exec_root
    }

    /// Resolve a script path: absolute paths are kept, relative ones are
    /// joined onto the exec root.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.exec_root.join(p)
        }
    }

    /// Declared name of the struct type at `index`, if known.
    pub fn struct_name(&self, index: u32) -> Option<String> {
        self.struct_names.as_ref().and_then(|lookup| lookup(index))
    }

    /// Run an interpreter closure.
    pub fn invoke(&self, closure: &Closure, args: Vec<Value>) -> Result<Value, HostError> {
        let invoker = self
            .invoker
            .as_deref()
            .ok_or(HostError::MissingService("closure invoker"))?;
        invoker.invoke(closure, args)
    }
}

// ---------------------------------------------------------------------------
// EnvironmentBuilder
// ---------------------------------------------------------------------------

/// Assembles an [`Environment`], injecting test doubles or omitting services.
#[derive(Clone)]
pub struct EnvironmentBuilder {
    env: Environment,
}

impl Default for EnvironmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentBuilder {
    pub fn new() -> Self {
        Self {
            env: Environment {
                fs: None,
                net: None,
                http: None,
                io: None,
                exec_root: PathBuf::from("."),
                struct_names: None,
                invoker: None,
            },
        }
    }

    /// Every service present, built from `config`.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new()
            .fs(Arc::new(FsService::new()))
            .net(Arc::new(NetService::new(Duration::from_millis(
                config.net.accept_poll_ms,
            ))))
            .http(Arc::new(HttpService::new(&config.http)))
            .io(Arc::new(StdIo))
            .exec_root(config.resolved_exec_root())
    }

    pub fn fs(mut self, fs: Arc<FsService>) -> Self {
        self.env.fs = Some(fs);
        self
    }

    pub fn net(mut self, net: Arc<NetService>) -> Self {
        self.env.net = Some(net);
        self
    }

    pub fn http(mut self, http: Arc<HttpService>) -> Self {
        self.env.http = Some(http);
        self
    }

    pub fn io(mut self, io: Arc<dyn IoChannel>) -> Self {
        self.env.io = Some(io);
        self
    }

    pub fn exec_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.env.exec_root = root.into();
        self
    }

    pub fn struct_names(
        mut self,
        lookup: impl Fn(u32) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.env.struct_names = Some(Arc::new(lookup));
        self
    }

    pub fn invoker(mut self, invoker: Arc<dyn ClosureInvoker>) -> Self {
        self.env.invoker = Some(invoker);
        self
    }

    pub fn build(self) -> Environment {
        self.env
    }
}
