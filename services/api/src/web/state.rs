//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use chrono::Utc;
use std::sync::Arc;
use travels_core::TravelStore;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TravelStore>,
    /// Fixed "now" for age filters, taken from the data directory. The wall
    /// clock is used when it is absent.
    pub reference_time: Option<i64>,
}

impl AppState {
    /// The timestamp age filters are measured from.
    pub fn now(&self) -> i64 {
        self.reference_time.unwrap_or_else(|| Utc::now().timestamp())
    }
}
