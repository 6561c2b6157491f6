//! crates/travels_core/src/query.rs
//!
//! The two aggregate queries: the average mark of a location and the list of
//! a user's visits. Both are read-only scans of one index list with a set of
//! optional predicates. All date and age bounds are inclusive; the distance
//! bound is strict.

use std::collections::BTreeMap;

use tracing::warn;

use crate::domain::{EntityId, Gender, User, Visit};
use crate::ports::{PortError, PortResult, TravelReader};

/// 365.25 days, in seconds.
pub const SECONDS_PER_YEAR: i64 = 31_557_600;

/// Decimal places kept in a location average.
pub const AVERAGE_PLACES: i32 = 5;

//=========================================================================================
// Filters
//=========================================================================================

/// An optional inclusive `[from, to]` window over `visited_at`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl DateRange {
    pub fn contains(&self, timestamp: i64) -> bool {
        self.from.map_or(true, |from| timestamp >= from)
            && self.to.map_or(true, |to| timestamp <= to)
    }
}

/// Predicates for [`location_average`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AverageFilter {
    pub dates: DateRange,
    /// Only users at least this many years old.
    pub from_age: Option<i64>,
    /// Only users at most this many years old.
    pub to_age: Option<i64>,
    pub gender: Option<Gender>,
}

impl AverageFilter {
    fn needs_user(&self) -> bool {
        self.from_age.is_some() || self.to_age.is_some() || self.gender.is_some()
    }

    fn accepts_user(&self, user: &User, now: i64) -> bool {
        if let Some(age) = self.from_age {
            if user.birth_date > birth_cutoff(now, age) {
                return false;
            }
        }
        if let Some(age) = self.to_age {
            if user.birth_date < birth_cutoff(now, age) {
                return false;
            }
        }
        self.gender.map_or(true, |gender| gender == user.gender)
    }
}

/// Predicates for [`user_visits`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitsFilter {
    pub dates: DateRange,
    pub country: Option<String>,
    /// Only locations strictly closer than this. A bound of zero or below
    /// matches nothing.
    pub to_distance: Option<i64>,
}

/// One row of a user's visit list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitEntry {
    pub mark: u8,
    pub visited_at: i64,
    pub place: String,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// The birth timestamp of someone exactly `age` years old at `now`.
pub fn birth_cutoff(now: i64, age: i64) -> i64 {
    now.saturating_sub(age.saturating_mul(SECONDS_PER_YEAR))
}

/// Rounds half away from zero to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

//=========================================================================================
// Queries
//=========================================================================================

/// Average mark over the visits of `location_id` that pass `filter`.
///
/// Returns `NotFound` for an unknown location and `0.0` when no visit
/// matches. `now` anchors the age bounds.
pub async fn location_average<S>(
    store: &S,
    location_id: EntityId,
    filter: &AverageFilter,
    now: i64,
) -> PortResult<f64>
where
    S: TravelReader + ?Sized,
{
    store.get_location(location_id).await?;
    let visits = store.visits_by_location(location_id).await?;

    let mut sum: u64 = 0;
    let mut count: u64 = 0;
    for visit in &visits {
        if !filter.dates.contains(visit.visited_at) {
            continue;
        }
        if filter.needs_user() {
            let Some(user) = resolve(store.get_user(visit.user).await, visit, "user")? else {
                continue;
            };
            if !filter.accepts_user(&user, now) {
                continue;
            }
        }
        sum += u64::from(visit.mark);
        count += 1;
    }

    if count == 0 {
        return Ok(0.0);
    }
    Ok(round_to(sum as f64 / count as f64, AVERAGE_PLACES))
}

/// The visits of `user_id` that pass `filter`, one per `visited_at`,
/// ascending by `visited_at`.
///
/// Visits sharing a timestamp collapse into one entry and the one scanned
/// last wins.
pub async fn user_visits<S>(
    store: &S,
    user_id: EntityId,
    filter: &VisitsFilter,
) -> PortResult<Vec<VisitEntry>>
where
    S: TravelReader + ?Sized,
{
    store.get_user(user_id).await?;
    let visits = store.visits_by_user(user_id).await?;

    let mut by_time = BTreeMap::new();
    for visit in &visits {
        if !filter.dates.contains(visit.visited_at) {
            continue;
        }
        let Some(location) = resolve(store.get_location(visit.location).await, visit, "location")?
        else {
            continue;
        };
        if let Some(country) = &filter.country {
            if &location.country != country {
                continue;
            }
        }
        if let Some(max) = filter.to_distance {
            if i64::from(location.distance) >= max {
                continue;
            }
        }
        by_time.insert(
            visit.visited_at,
            VisitEntry {
                mark: visit.mark,
                visited_at: visit.visited_at,
                place: location.place,
            },
        );
    }

    Ok(by_time.into_values().collect())
}

/// Turns a dangling foreign key into a skipped row instead of a failed query.
fn resolve<T>(
    lookup: PortResult<T>,
    visit: &Visit,
    target: &'static str,
) -> PortResult<Option<T>> {
    match lookup {
        Ok(found) => Ok(Some(found)),
        Err(PortError::NotFound(what)) => {
            warn!("Visit {} references a missing {}: {}", visit.id, target, what);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
