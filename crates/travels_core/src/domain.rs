//! crates/travels_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any storage or serialization format.

/// Primary key shared by every entity type.
pub type EntityId = u32;

/// Highest mark a visit can carry.
pub const MAX_MARK: u8 = 5;

/// A validation failure on an entity or a partial update.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Field `{0}` must be a positive id")]
    ZeroId(&'static str),
    #[error("Field `{0}` must not be empty")]
    EmptyField(&'static str),
    #[error("Field `{0}` must not be null")]
    NullField(&'static str),
    #[error("Mark {0} is out of range 0..=5")]
    MarkOutOfRange(u8),
}

/// Anything stored under a primary id.
pub trait Entity: Clone + Send + Sync + 'static {
    fn id(&self) -> EntityId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Parses the one-letter code used on the wire (`m` / `f`).
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "m" => Some(Gender::Male),
            "f" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Gender::Male => "m",
            Gender::Female => "f",
        }
    }
}

/// A registered traveller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: EntityId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    /// Unix timestamp, seconds.
    pub birth_date: i64,
}

/// A place that can be visited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub id: EntityId,
    pub place: String,
    pub country: String,
    pub city: String,
    pub distance: u32,
}

/// A single visit of a user to a location. `location` and `user` are
/// foreign keys and are not checked against the other collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub id: EntityId,
    pub location: EntityId,
    pub user: EntityId,
    /// Unix timestamp, seconds.
    pub visited_at: i64,
    pub mark: u8,
}

impl Entity for User {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Entity for Location {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Entity for Visit {
    fn id(&self) -> EntityId {
        self.id
    }
}

//=========================================================================================
// Partial Updates
//=========================================================================================

/// A partial update of a user. `None` leaves the attribute untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<Gender>,
    pub birth_date: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationPatch {
    pub place: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub distance: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitPatch {
    pub location: Option<EntityId>,
    pub user: Option<EntityId>,
    pub visited_at: Option<i64>,
    pub mark: Option<u8>,
}

fn require_id(field: &'static str, id: EntityId) -> Result<(), ValidationError> {
    if id == 0 {
        return Err(ValidationError::ZeroId(field));
    }
    Ok(())
}

fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

impl User {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_id("id", self.id)?;
        require_text("first_name", &self.first_name)?;
        require_text("last_name", &self.last_name)
    }

    /// Returns a copy with `patch` applied, or the first constraint it breaks.
    pub fn patched(&self, patch: &UserPatch) -> Result<User, ValidationError> {
        let mut next = self.clone();
        if let Some(email) = &patch.email {
            next.email = email.clone();
        }
        if let Some(first_name) = &patch.first_name {
            next.first_name = first_name.clone();
        }
        if let Some(last_name) = &patch.last_name {
            next.last_name = last_name.clone();
        }
        if let Some(gender) = patch.gender {
            next.gender = gender;
        }
        if let Some(birth_date) = patch.birth_date {
            next.birth_date = birth_date;
        }
        next.validate()?;
        Ok(next)
    }
}

impl Location {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_id("id", self.id)?;
        require_text("place", &self.place)?;
        require_text("country", &self.country)?;
        require_text("city", &self.city)
    }

    pub fn patched(&self, patch: &LocationPatch) -> Result<Location, ValidationError> {
        let mut next = self.clone();
        if let Some(place) = &patch.place {
            next.place = place.clone();
        }
        if let Some(country) = &patch.country {
            next.country = country.clone();
        }
        if let Some(city) = &patch.city {
            next.city = city.clone();
        }
        if let Some(distance) = patch.distance {
            next.distance = distance;
        }
        next.validate()?;
        Ok(next)
    }
}

impl Visit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_id("id", self.id)?;
        require_id("location", self.location)?;
        require_id("user", self.user)?;
        if self.mark > MAX_MARK {
            return Err(ValidationError::MarkOutOfRange(self.mark));
        }
        Ok(())
    }

    pub fn patched(&self, patch: &VisitPatch) -> Result<Visit, ValidationError> {
        let mut next = self.clone();
        if let Some(location) = patch.location {
            next.location = location;
        }
        if let Some(user) = patch.user {
            next.user = user;
        }
        if let Some(visited_at) = patch.visited_at {
            next.visited_at = visited_at;
        }
        if let Some(mark) = patch.mark {
            next.mark = mark;
        }
        next.validate()?;
        Ok(next)
    }
}
