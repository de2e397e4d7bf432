//! The builtin registry: metadata, implementations, and call dispatch.
//!
//! Every builtin is indexed three ways: by numeric [`BuiltinId`] (what
//! compiled call sites carry), by name (free functions only), and by
//! `(receiver kind, method name)` for method-style calls. Metadata is
//! checked when a builtin is registered, so a registry that finished
//! building is internally consistent.
//!
//! A call goes through [`BuiltinRegistry::call`], which checks the argument
//! count and the tag of every argument against the declared parameter types
//! before the implementation runs.

use crate::error::{BuiltinError, RegistrationError};
use brisk_core::{TypeDesc, TypeKind, Value};
use brisk_runtime::Environment;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

// ---------------------------------------------------------------------------
// BuiltinId
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuiltinId(pub u32);

impl fmt::Display for BuiltinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// BuiltinMeta
// ---------------------------------------------------------------------------

/// Signature and identity of one builtin, as exported to static checkers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltinMeta {
    pub id: BuiltinId,
    pub name: String,
    pub arity: usize,
    pub param_names: Vec<String>,
    pub param_types: Vec<TypeDesc>,
    pub result: TypeDesc,
    /// Set for methods; the first parameter is the receiver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<TypeDesc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl BuiltinMeta {
    /// A free function with no parameters returning `unit`.
    pub fn function(id: BuiltinId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            arity: 0,
            param_names: Vec::new(),
            param_types: Vec::new(),
            result: TypeDesc::Unit,
            receiver: None,
            method: None,
        }
    }

    /// A method on `receiver`, named `<receiver kind>.<method>`. The receiver
    /// becomes the first parameter, `self`.
    pub fn method(id: BuiltinId, receiver: TypeDesc, method: &str) -> Self {
        let name = format!("{}.{}", receiver.kind(), method);
        Self {
            receiver: Some(receiver.clone()),
            method: Some(method.to_string()),
            ..Self::function(id, &name)
        }
        .param("self", receiver)
    }

    pub fn param(mut self, name: &str, ty: TypeDesc) -> Self {
        self.param_names.push(name.to_string());
        self.param_types.push(ty);
        self.arity = self.param_names.len();
        self
    }

    pub fn returns(mut self, ty: TypeDesc) -> Self {
        self.result = ty;
        self
    }

    pub fn is_method(&self) -> bool {
        self.receiver.is_some()
    }

    /// `name(p: type, ...) -> result`
    pub fn signature(&self) -> String {
        let params = self
            .param_names
            .iter()
            .zip(&self.param_types)
            .map(|(n, t)| format!("{}: {}", n, t))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({}) -> {}", self.name, params, self.result)
    }

    fn validate(&self) -> Result<(), RegistrationError> {
        if self.param_names.len() != self.arity {
            return Err(RegistrationError::ParamNames {
                name: self.name.clone(),
                arity: self.arity,
                names: self.param_names.len(),
            });
        }
        if self.param_types.len() != self.arity {
            return Err(RegistrationError::ParamTypes {
                name: self.name.clone(),
                arity: self.arity,
                types: self.param_types.len(),
            });
        }
        match (&self.receiver, &self.method) {
            (Some(receiver), Some(_)) => {
                if self.param_types.first() != Some(receiver) {
                    return Err(RegistrationError::ReceiverMismatch {
                        name: self.name.clone(),
                        receiver: receiver.clone(),
                    });
                }
            }
            (None, None) => {}
            _ => {
                return Err(RegistrationError::IncompleteMethod {
                    name: self.name.clone(),
                })
            }
        }
        Ok(())
    }

    fn check_args(&self, args: &[Value]) -> Result<(), BuiltinError> {
        if args.len() != self.arity {
            return Err(BuiltinError::Arity {
                name: self.name.clone(),
                expected: self.arity,
                got: args.len(),
            });
        }
        for (index, (ty, value)) in self.param_types.iter().zip(args).enumerate() {
            if !ty.accepts(value) {
                return Err(BuiltinError::TypeMismatch {
                    name: self.name.clone(),
                    index,
                    param: self.param_names[index].clone(),
                    expected: ty.clone(),
                    got: value.type_name(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Builtin
// ---------------------------------------------------------------------------

/// Implementation signature shared by every builtin.
pub type BuiltinFn = dyn Fn(&Environment, &[Value]) -> Result<Value, BuiltinError> + Send + Sync;

#[derive(Clone)]
pub struct Builtin {
    meta: BuiltinMeta,
    func: Arc<BuiltinFn>,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin").field("meta", &self.meta).finish()
    }
}

impl Builtin {
    pub fn new<F>(meta: BuiltinMeta, func: F) -> Self
    where
        F: Fn(&Environment, &[Value]) -> Result<Value, BuiltinError> + Send + Sync + 'static,
    {
        Self {
            meta,
            func: Arc::new(func),
        }
    }

    pub fn meta(&self) -> &BuiltinMeta {
        &self.meta
    }

    /// Check `args` against the signature, then run the implementation.
    pub fn call(&self, env: &Environment, args: &[Value]) -> Result<Value, BuiltinError> {
        self.meta.check_args(args)?;
        trace!(id = %self.meta.id, name = %self.meta.name, "builtin call");
        (self.func)(env, args)
    }
}

// ---------------------------------------------------------------------------
// BuiltinRegistry
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Indexes {
    by_id: HashMap<BuiltinId, Arc<Builtin>>,
    by_name: HashMap<String, BuiltinId>,
    by_method: HashMap<(TypeKind, String), BuiltinId>,
}

/// Process-wide table of builtins. Build it once at startup and share it
/// (by reference or `Arc`) with the compile and run phases.
#[derive(Default)]
pub struct BuiltinRegistry {
    inner: RwLock<Indexes>,
}

impl fmt::Debug for BuiltinRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinRegistry")
            .field("builtins", &self.len())
            .finish()
    }
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builtin, reporting any invariant violation. Nothing is
    /// indexed when an error is returned.
    pub fn try_register(&self, builtin: Builtin) -> Result<(), RegistrationError> {
        let meta = &builtin.meta;
        meta.validate()?;

        let mut inner = self.inner.write();
        if let Some(existing) = inner.by_id.get(&meta.id) {
            return Err(RegistrationError::DuplicateId {
                id: meta.id,
                existing: existing.meta.name.clone(),
            });
        }
        let method_key = match (&meta.receiver, &meta.method) {
            (Some(receiver), Some(method)) => {
                let key = (receiver.kind(), method.clone());
                if inner.by_method.contains_key(&key) {
                    return Err(RegistrationError::DuplicateMethod {
                        receiver: key.0,
                        method: key.1,
                    });
                }
                Some(key)
            }
            _ => {
                if inner.by_name.contains_key(&meta.name) {
                    return Err(RegistrationError::DuplicateName(meta.name.clone()));
                }
                None
            }
        };

        let id = meta.id;
        match method_key {
            Some(key) => {
                inner.by_method.insert(key, id);
            }
            None => {
                inner.by_name.insert(meta.name.clone(), id);
            }
        }
        inner.by_id.insert(id, Arc::new(builtin));
        Ok(())
    }

    /// Register a builtin whose metadata is known to be valid.
    ///
    /// # Panics
    ///
    /// Panics on any [`RegistrationError`]; registration happens at startup
    /// and bad metadata is a programming error.
    pub fn register(&self, builtin: Builtin) {
        if let Err(e) = self.try_register(builtin) {
            panic!("builtin registration failed: {}", e);
        }
    }

    /// Shorthand for `register(Builtin::new(meta, func))`.
    pub fn define<F>(&self, meta: BuiltinMeta, func: F)
    where
        F: Fn(&Environment, &[Value]) -> Result<Value, BuiltinError> + Send + Sync + 'static,
    {
        self.register(Builtin::new(meta, func));
    }

    pub fn lookup_by_id(&self, id: BuiltinId) -> Option<Arc<Builtin>> {
        self.inner.read().by_id.get(&id).cloned()
    }

    /// Free functions only; methods are found through [`Self::lookup_by_method`].
    pub fn lookup_by_name(&self, name: &str) -> Option<Arc<Builtin>> {
        let inner = self.inner.read();
        let id = inner.by_name.get(name)?;
        inner.by_id.get(id).cloned()
    }

    pub fn lookup_by_method(&self, receiver: TypeKind, method: &str) -> Option<Arc<Builtin>> {
        let inner = self.inner.read();
        let id = inner.by_method.get(&(receiver, method.to_string()))?;
        inner.by_id.get(id).cloned()
    }

    /// Metadata of every builtin, ordered by id.
    pub fn list_all(&self) -> Vec<BuiltinMeta> {
        let mut all: Vec<BuiltinMeta> = self
            .inner
            .read()
            .by_id
            .values()
            .map(|b| b.meta.clone())
            .collect();
        all.sort_by_key(|m| m.id);
        all
    }

    /// The metadata listing as pretty-printed JSON.
    pub fn metadata_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.list_all())
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dispatch a compiled call site.
    pub fn call(
        &self,
        id: BuiltinId,
        env: &Environment,
        args: &[Value],
    ) -> Result<Value, BuiltinError> {
        let builtin = self
            .lookup_by_id(id)
            .ok_or_else(|| BuiltinError::UnknownBuiltin(id.to_string()))?;
        builtin.call(env, args)
    }

    pub fn call_by_name(
        &self,
        name: &str,
        env: &Environment,
        args: &[Value],
    ) -> Result<Value, BuiltinError> {
        let builtin = self
            .lookup_by_name(name)
            .ok_or_else(|| BuiltinError::UnknownBuiltin(name.to_string()))?;
        builtin.call(env, args)
    }

    /// Call `method` on `args[0]`, dispatching on the receiver's kind.
    pub fn call_method(
        &self,
        method: &str,
        env: &Environment,
        args: &[Value],
    ) -> Result<Value, BuiltinError> {
        let receiver = args.first().ok_or_else(|| BuiltinError::Arity {
            name: method.to_string(),
            expected: 1,
            got: 0,
        })?;
        let builtin = self
            .lookup_by_method(receiver.kind(), method)
            .ok_or_else(|| {
                BuiltinError::UnknownBuiltin(format!("{}.{}", receiver.kind(), method))
            })?;
        builtin.call(env, args)
    }
}
