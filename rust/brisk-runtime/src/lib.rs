//! Brisk Runtime
//!
//! Host resource services backing the builtin layer: handle-based filesystem,
//! TCP socket, and HTTP client/server services, the IO channel, runtime
//! configuration, and the [`Environment`](env::Environment) that bundles them
//! for builtins at call time.

pub mod config;
pub mod env;
pub mod error;
pub mod fs;
pub mod http;
pub mod io;
pub mod net;
pub mod table;

pub use config::RuntimeConfig;
pub use env::{ClosureInvoker, Environment, EnvironmentBuilder};
pub use error::{HostError, ResourceKind};
