//! services/api/src/adapters/store.rs
//!
//! A single keyed entity collection guarded by its own reader/writer lock.
//! Reads take the shared lock, writes the exclusive lock of this collection
//! only; nothing here ever touches a second collection.

use std::collections::HashMap;

use tokio::sync::{RwLock, RwLockWriteGuard};
use travels_core::{Entity, EntityId, PortError, PortResult, ValidationError};

pub struct EntityStore<T> {
    kind: &'static str,
    items: RwLock<HashMap<EntityId, T>>,
}

impl<T: Entity> EntityStore<T> {
    /// `kind` names the entity in error messages ("User", "Visit", ...).
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            items: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, id: EntityId) -> Option<T> {
        self.items.read().await.get(&id).cloned()
    }

    /// Like [`get`](Self::get), with a `NotFound` error for unknown ids.
    pub async fn fetch(&self, id: EntityId) -> PortResult<T> {
        self.get(id).await.ok_or_else(|| self.not_found(id))
    }

    /// Current values for `ids`, in order, skipping ids that are not stored.
    pub async fn get_many(&self, ids: &[EntityId]) -> Vec<T> {
        let items = self.items.read().await;
        ids.iter().filter_map(|id| items.get(id).cloned()).collect()
    }

    /// Stores `entity` under its id and returns the value it replaced.
    pub async fn upsert(&self, entity: T) -> Option<T> {
        self.items.write().await.insert(entity.id(), entity)
    }

    /// Stores `entity` unless its id is already taken.
    pub async fn insert_new(&self, entity: T) -> PortResult<()> {
        let mut items = self.items.write().await;
        if items.contains_key(&entity.id()) {
            return Err(self.already_exists(entity.id()));
        }
        items.insert(entity.id(), entity);
        Ok(())
    }

    /// Replaces the entity under `id` with `change(current)` while holding the
    /// write lock, so concurrent updates of one entity never lose a field.
    pub async fn update<F>(&self, id: EntityId, change: F) -> PortResult<T>
    where
        F: FnOnce(&T) -> Result<T, ValidationError>,
    {
        let mut items = self.items.write().await;
        let current = items.get(&id).ok_or_else(|| self.not_found(id))?;
        let next = change(current)?;
        items.insert(id, next.clone());
        Ok(next)
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// Exclusive access for mutations that must also update the visit index
    /// before the lock is released.
    pub(super) async fn lock_exclusive(&self) -> RwLockWriteGuard<'_, HashMap<EntityId, T>> {
        self.items.write().await
    }

    pub(super) fn not_found(&self, id: EntityId) -> PortError {
        PortError::NotFound(format!("{} {} not found", self.kind, id))
    }

    pub(super) fn already_exists(&self, id: EntityId) -> PortError {
        PortError::AlreadyExists(format!("{} {} already exists", self.kind, id))
    }
}
