//! In-memory entity store with soft-delete semantics.
//!
//! One [`Store`] per entity type, cheaply cloneable — all clones share
//! the same map. Normal lookups (`find_active`, `list_active`) see only
//! records whose `active` flag is set; `soft_delete` clears the flag and
//! keeps the record resident. Nothing is ever removed.
//!
//! Mutations go through closures executed under a single write lock so a
//! check-then-update sequence on one record cannot interleave with
//! another writer. Cross-record coordination is out of scope here — one
//! request performs one sequential read-check-persist pass.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

/// Contract every stored record satisfies.
pub trait Entity {
    fn id(&self) -> Uuid;
    fn is_active(&self) -> bool;
    fn deactivate(&mut self);
}

/// Shared in-memory store for one entity type.
#[derive(Debug)]
pub struct Store<T> {
    inner: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Store<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of resident records, active or not.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl<T: Entity + Clone> Store<T> {
    /// Insert or replace a record under its own id.
    pub fn insert(&self, record: T) {
        self.inner.write().insert(record.id(), record);
    }

    /// Fetch a record regardless of its active flag. Persistence and
    /// audit paths only; request handling goes through [`find_active`].
    ///
    /// [`find_active`]: Store::find_active
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.inner.read().get(id).cloned()
    }

    /// Fetch an active record by id.
    pub fn find_active(&self, id: &Uuid) -> Option<T> {
        self.inner
            .read()
            .get(id)
            .filter(|r| r.is_active())
            .cloned()
    }

    /// List active records matching `predicate`, applying pagination
    /// after filtering. No ordering contract.
    pub fn list_active<F>(&self, offset: usize, limit: usize, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.inner
            .read()
            .values()
            .filter(|r| r.is_active() && predicate(r))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Mutate an active record in place under the write lock. Returns the
    /// updated record, or `None` when absent or inactive.
    pub fn update<F>(&self, id: &Uuid, f: F) -> Option<T>
    where
        F: FnOnce(&mut T),
    {
        let mut guard = self.inner.write();
        let record = guard.get_mut(id).filter(|r| r.is_active())?;
        f(record);
        Some(record.clone())
    }

    /// Atomically check-and-mutate an active record. The closure decides
    /// whether the mutation is legal; its error is handed back untouched.
    /// Outer `None` means absent or inactive.
    pub fn try_update<F, E>(&self, id: &Uuid, f: F) -> Option<Result<T, E>>
    where
        F: FnOnce(&mut T) -> Result<(), E>,
    {
        let mut guard = self.inner.write();
        let record = guard.get_mut(id).filter(|r| r.is_active())?;
        match f(record) {
            Ok(()) => Some(Ok(record.clone())),
            Err(e) => Some(Err(e)),
        }
    }

    /// Soft-delete: clear the active flag, keep the record. Returns the
    /// deactivated record, or `None` when absent or already inactive.
    pub fn soft_delete(&self, id: &Uuid) -> Option<T> {
        let mut guard = self.inner.write();
        let record = guard.get_mut(id).filter(|r| r.is_active())?;
        record.deactivate();
        Some(record.clone())
    }
}
