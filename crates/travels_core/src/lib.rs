pub mod domain;
pub mod ports;
pub mod query;

pub use domain::{
    Entity, EntityId, Gender, Location, LocationPatch, User, UserPatch, ValidationError, Visit,
    VisitPatch, MAX_MARK,
};
pub use ports::{PortError, PortResult, TravelReader, TravelStore};
pub use query::{location_average, user_visits, AverageFilter, DateRange, VisitEntry, VisitsFilter};
