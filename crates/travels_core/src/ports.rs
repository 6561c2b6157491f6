//! crates/travels_core/src/ports.rs
//!
//! Defines the storage contracts (traits) for the application's core logic.
//! The query layer only sees these traits, so it stays independent of how
//! entities and indexes are actually held.

use async_trait::async_trait;
use crate::domain::{
    EntityId, Location, LocationPatch, User, UserPatch, ValidationError, Visit, VisitPatch,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Item already exists: {0}")]
    AlreadyExists(String),
    #[error("Validation failed: {0}")]
    Invalid(#[from] ValidationError),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Read access to the entity collections and the two visit indexes.
#[async_trait]
pub trait TravelReader: Send + Sync {
    async fn get_user(&self, id: EntityId) -> PortResult<User>;

    async fn get_location(&self, id: EntityId) -> PortResult<Location>;

    async fn get_visit(&self, id: EntityId) -> PortResult<Visit>;

    /// Current values of every visit indexed under `user_id`, in index order.
    /// An unknown user simply has no visits.
    async fn visits_by_user(&self, user_id: EntityId) -> PortResult<Vec<Visit>>;

    /// Current values of every visit indexed under `location_id`, in index order.
    async fn visits_by_location(&self, location_id: EntityId) -> PortResult<Vec<Visit>>;
}

/// Full read/write access. Creates fail with `AlreadyExists` on a taken id,
/// updates fail with `NotFound` on an unknown one.
#[async_trait]
pub trait TravelStore: TravelReader {
    // --- Users ---
    async fn create_user(&self, user: User) -> PortResult<()>;

    async fn update_user(&self, id: EntityId, patch: UserPatch) -> PortResult<User>;

    // --- Locations ---
    async fn create_location(&self, location: Location) -> PortResult<()>;

    async fn update_location(&self, id: EntityId, patch: LocationPatch) -> PortResult<Location>;

    // --- Visits ---
    async fn create_visit(&self, visit: Visit) -> PortResult<()>;

    /// Applies `patch` and moves the visit between index lists when its
    /// user or location changed.
    async fn update_visit(&self, id: EntityId, patch: VisitPatch) -> PortResult<Visit>;
}
