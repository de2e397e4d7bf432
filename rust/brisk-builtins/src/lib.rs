//! Brisk Builtins
//!
//! The builtin registry and every builtin the language ships: host-backed
//! families (`fs`, `socket`, `http`, `time`, `io`), introspection, and the
//! leaf value methods on strings, bytes, lists, dicts, and optionals.
//!
//! Identifiers are grouped by family so compiled call sites stay stable as
//! families grow:
//!
//! | Range | Family |
//! |---|---|
//! | 100 | `fs` |
//! | 200 | `socket` |
//! | 300 | `http` |
//! | 400 | `time` |
//! | 500 | `io` |
//! | 600 | introspection and errors |
//! | 1000 | `string` methods |
//! | 1100 | `bytes` methods |
//! | 1200 | `list` methods |
//! | 1300 | `dict` methods |
//! | 1400 | `optional` methods |

mod args;
pub mod bytes;
pub mod dict;
pub mod error;
pub mod fs;
pub mod http;
pub mod introspect;
pub mod io;
pub mod list;
pub mod optional;
pub mod registry;
pub mod socket;
pub mod string;
pub mod time;

pub use error::{BuiltinError, ErrorKind, RegistrationError};
pub use registry::{Builtin, BuiltinFn, BuiltinId, BuiltinMeta, BuiltinRegistry};

/// A registry holding every standard builtin.
pub fn standard_registry() -> BuiltinRegistry {
    let registry = BuiltinRegistry::new();
    fs::register(&registry);
    socket::register(&registry);
    http::register(&registry);
    time::register(&registry);
    io::register(&registry);
    introspect::register(&registry);
    string::register(&registry);
    bytes::register(&registry);
    list::register(&registry);
    dict::register(&registry);
    optional::register(&registry);
    tracing::debug!(builtins = registry.len(), "standard registry built");
    registry
}
