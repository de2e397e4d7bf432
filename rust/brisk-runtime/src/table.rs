//! Resource tables: concurrency-safe maps from handle identifier to a live
//! OS resource.
//!
//! Entries are stored behind `Arc` so the table lock is held only long enough
//! to look up or mutate an entry; the OS call itself runs on a cloned `Arc`
//! without the lock. Identifiers come from a [`HandleAllocator`] that a
//! service may share between several tables, which keeps identifiers unique
//! across, say, a service's connections and listeners.

use crate::error::{HostError, ResourceKind};
use brisk_core::Handle;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// HandleAllocator
// ---------------------------------------------------------------------------

/// Monotonic identifier source. The first identifier issued is 1; identifiers
/// are never reused.
#[derive(Debug)]
pub struct HandleAllocator {
    next: AtomicU64,
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next(&self) -> Handle {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and would need 2^64 allocations to wrap.
        Handle::new(id).unwrap_or_else(|| unreachable!("handle counter wrapped"))
    }
}

// ---------------------------------------------------------------------------
// ResourceTable
// ---------------------------------------------------------------------------

/// A table of live resources of one kind.
#[derive(Debug)]
pub struct ResourceTable<T> {
    kind: ResourceKind,
    ids: Arc<HandleAllocator>,
    entries: Mutex<HashMap<u64, Arc<T>>>,
}

impl<T> ResourceTable<T> {
    /// Create a table with its own identifier space.
    pub fn new(kind: ResourceKind) -> Self {
        Self::with_allocator(kind, Arc::new(HandleAllocator::new()))
    }

    /// Create a table drawing identifiers from a shared allocator.
    pub fn with_allocator(kind: ResourceKind, ids: Arc<HandleAllocator>) -> Self {
        Self {
            kind,
            ids,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Store a live resource under a fresh handle.
    pub fn insert(&self, resource: T) -> Handle {
        let handle = self.ids.next();
        self.entries.lock().insert(handle.id(), Arc::new(resource));
        handle
    }

    /// Fetch the resource for `handle` without removing it.
    pub fn get(&self, handle: Handle) -> Result<Arc<T>, HostError> {
        self.entries
            .lock()
            .get(&handle.id())
            .cloned()
            .ok_or_else(|| self.not_found(handle))
    }

    /// Remove and return the resource; later lookups of `handle` fail.
    pub fn remove(&self, handle: Handle) -> Result<Arc<T>, HostError> {
        self.entries
            .lock()
            .remove(&handle.id())
            .ok_or_else(|| self.not_found(handle))
    }

    /// Remove the entry if present, without reporting a miss.
    pub fn take(&self, handle: Handle) -> Option<Arc<T>> {
        self.entries.lock().remove(&handle.id())
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.entries.lock().contains_key(&handle.id())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub(crate) fn not_found(&self, handle: Handle) -> HostError {
        HostError::ResourceNotFound {
            kind: self.kind,
            id: handle.id(),
        }
    }

    pub(crate) fn closed(&self, handle: Handle) -> HostError {
        HostError::ResourceClosed {
            kind: self.kind,
            id: handle.id(),
        }
    }
}
