//! services/api/src/adapters/index.rs
//!
//! Secondary indexes from a user id and from a location id to the visits
//! referencing them. Lists hold visit ids, never visit values, so an entry is
//! removed by identity and always resolves to the current visit.

use std::collections::HashMap;

use tokio::sync::RwLock;
use travels_core::{EntityId, Visit};

type AdjacencyList = HashMap<EntityId, Vec<EntityId>>;

#[derive(Default)]
pub struct VisitIndex {
    by_user: RwLock<AdjacencyList>,
    by_location: RwLock<AdjacencyList>,
}

impl VisitIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a newly stored visit to both lists.
    pub async fn add(&self, visit: &Visit) {
        self.by_user
            .write()
            .await
            .entry(visit.user)
            .or_default()
            .push(visit.id);
        self.by_location
            .write()
            .await
            .entry(visit.location)
            .or_default()
            .push(visit.id);
    }

    /// Moves `new` between lists for every foreign key that differs from `old`.
    /// Lists are left alone when neither key changed.
    pub async fn reindex(&self, old: &Visit, new: &Visit) {
        debug_assert_eq!(old.id, new.id);
        if old.user != new.user {
            let mut by_user = self.by_user.write().await;
            move_entry(&mut by_user, new.id, old.user, new.user);
        }
        if old.location != new.location {
            let mut by_location = self.by_location.write().await;
            move_entry(&mut by_location, new.id, old.location, new.location);
        }
    }

    pub async fn visits_of_user(&self, user_id: EntityId) -> Vec<EntityId> {
        self.by_user
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn visits_of_location(&self, location_id: EntityId) -> Vec<EntityId> {
        self.by_location
            .read()
            .await
            .get(&location_id)
            .cloned()
            .unwrap_or_default()
    }
}

fn move_entry(lists: &mut AdjacencyList, visit_id: EntityId, from: EntityId, to: EntityId) {
    if let Some(list) = lists.get_mut(&from) {
        if let Some(position) = list.iter().position(|&id| id == visit_id) {
            list.remove(position);
        }
        if list.is_empty() {
            lists.remove(&from);
        }
    }
    lists.entry(to).or_default().push(visit_id);
}
