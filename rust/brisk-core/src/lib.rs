//! Brisk Core
//!
//! Shared value, type-descriptor, and handle definitions used by the host
//! runtime services and the builtin registry.

pub mod handle;
pub mod types;
pub mod values;

pub use handle::{Handle, HandleError};
pub use types::{TypeDesc, TypeKind};
pub use values::{Closure, DictRef, ErrorValue, RecordValue, Value};
