//! services/api/src/adapters/memory.rs
//!
//! The in-memory adapter: the concrete implementation of the `TravelStore`
//! port. Three entity collections and two visit indexes, each behind its own
//! lock. A visit mutation holds the visit lock while it updates the index, in
//! the order visits -> by-user -> by-location; readers never hold two locks.

use async_trait::async_trait;
use tracing::debug;
use travels_core::{
    EntityId, Location, LocationPatch, PortResult, TravelReader, TravelStore, User, UserPatch,
    Visit, VisitPatch,
};

use super::index::VisitIndex;
use super::store::EntityStore;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

pub struct MemoryAdapter {
    users: EntityStore<User>,
    locations: EntityStore<Location>,
    visits: EntityStore<Visit>,
    index: VisitIndex,
}

/// Entity counts, as reported after a bulk load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub users: usize,
    pub locations: usize,
    pub visits: usize,
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self {
            users: EntityStore::new("User"),
            locations: EntityStore::new("Location"),
            visits: EntityStore::new("Visit"),
            index: VisitIndex::new(),
        }
    }

    // --- Unchecked upserts, used by the bulk loader ---

    pub async fn upsert_user(&self, user: User) {
        self.users.upsert(user).await;
    }

    pub async fn upsert_location(&self, location: Location) {
        self.locations.upsert(location).await;
    }

    /// Stores `visit`, adding it to the indexes or moving it between lists
    /// when it replaces a visit with the same id.
    pub async fn upsert_visit(&self, visit: Visit) {
        let mut visits = self.visits.lock_exclusive().await;
        match visits.insert(visit.id, visit.clone()) {
            Some(previous) => self.index.reindex(&previous, &visit).await,
            None => self.index.add(&visit).await,
        }
    }

    pub async fn counts(&self) -> StoreCounts {
        StoreCounts {
            users: self.users.len().await,
            locations: self.locations.len().await,
            visits: self.visits.len().await,
        }
    }
}

//=========================================================================================
// Port Implementations
//=========================================================================================

#[async_trait]
impl TravelReader for MemoryAdapter {
    async fn get_user(&self, id: EntityId) -> PortResult<User> {
        self.users.fetch(id).await
    }

    async fn get_location(&self, id: EntityId) -> PortResult<Location> {
        self.locations.fetch(id).await
    }

    async fn get_visit(&self, id: EntityId) -> PortResult<Visit> {
        self.visits.fetch(id).await
    }

    async fn visits_by_user(&self, user_id: EntityId) -> PortResult<Vec<Visit>> {
        let ids = self.index.visits_of_user(user_id).await;
        Ok(self.visits.get_many(&ids).await)
    }

    async fn visits_by_location(&self, location_id: EntityId) -> PortResult<Vec<Visit>> {
        let ids = self.index.visits_of_location(location_id).await;
        Ok(self.visits.get_many(&ids).await)
    }
}

#[async_trait]
impl TravelStore for MemoryAdapter {
    async fn create_user(&self, user: User) -> PortResult<()> {
        user.validate()?;
        self.users.insert_new(user).await
    }

    async fn update_user(&self, id: EntityId, patch: UserPatch) -> PortResult<User> {
        self.users.update(id, |current| current.patched(&patch)).await
    }

    async fn create_location(&self, location: Location) -> PortResult<()> {
        location.validate()?;
        self.locations.insert_new(location).await
    }

    async fn update_location(&self, id: EntityId, patch: LocationPatch) -> PortResult<Location> {
        self.locations.update(id, |current| current.patched(&patch)).await
    }

    async fn create_visit(&self, visit: Visit) -> PortResult<()> {
        visit.validate()?;
        let mut visits = self.visits.lock_exclusive().await;
        if visits.contains_key(&visit.id) {
            return Err(self.visits.already_exists(visit.id));
        }
        self.index.add(&visit).await;
        visits.insert(visit.id, visit);
        Ok(())
    }

    async fn update_visit(&self, id: EntityId, patch: VisitPatch) -> PortResult<Visit> {
        let mut visits = self.visits.lock_exclusive().await;
        let current = visits
            .get(&id)
            .cloned()
            .ok_or_else(|| self.visits.not_found(id))?;
        let updated = current.patched(&patch)?;

        if current.user != updated.user || current.location != updated.location {
            debug!(
                "Reindexing visit {}: user {} -> {}, location {} -> {}",
                id, current.user, updated.user, current.location, updated.location
            );
        }
        self.index.reindex(&current, &updated).await;
        visits.insert(id, updated.clone());
        Ok(updated)
    }
}
