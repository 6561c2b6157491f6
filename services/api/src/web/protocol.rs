//! services/api/src/web/protocol.rs
//!
//! Defines the JSON shapes exchanged with clients and read from the data
//! files. Records convert to and from the core domain types, which carry no
//! serialization concerns of their own.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use travels_core::{
    EntityId, Gender, Location, LocationPatch, User, UserPatch, ValidationError, Visit,
    VisitEntry, VisitPatch,
};
use utoipa::ToSchema;

//=========================================================================================
// Entity Records
//=========================================================================================

/// Gender as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum GenderCode {
    #[serde(rename = "m")]
    M,
    #[serde(rename = "f")]
    F,
}

impl From<Gender> for GenderCode {
    fn from(gender: Gender) -> Self {
        match gender {
            Gender::Male => GenderCode::M,
            Gender::Female => GenderCode::F,
        }
    }
}

impl From<GenderCode> for Gender {
    fn from(code: GenderCode) -> Self {
        match code {
            GenderCode::M => Gender::Male,
            GenderCode::F => Gender::Female,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserRecord {
    pub id: u32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: GenderCode,
    pub birth_date: i64,
}

impl UserRecord {
    pub fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            gender: self.gender.into(),
            birth_date: self.birth_date,
        }
    }
}

impl From<User> for UserRecord {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            gender: user.gender.into(),
            birth_date: user.birth_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LocationRecord {
    pub id: u32,
    pub place: String,
    pub country: String,
    pub city: String,
    pub distance: u32,
}

impl LocationRecord {
    pub fn to_domain(self) -> Location {
        Location {
            id: self.id,
            place: self.place,
            country: self.country,
            city: self.city,
            distance: self.distance,
        }
    }
}

impl From<Location> for LocationRecord {
    fn from(location: Location) -> Self {
        Self {
            id: location.id,
            place: location.place,
            country: location.country,
            city: location.city,
            distance: location.distance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VisitRecord {
    pub id: u32,
    pub location: u32,
    pub user: u32,
    pub visited_at: i64,
    pub mark: u8,
}

impl VisitRecord {
    pub fn to_domain(self) -> Visit {
        Visit {
            id: self.id,
            location: self.location,
            user: self.user,
            visited_at: self.visited_at,
            mark: self.mark,
        }
    }
}

impl From<Visit> for VisitRecord {
    fn from(visit: Visit) -> Self {
        Self {
            id: visit.id,
            location: visit.location,
            user: visit.user,
            visited_at: visit.visited_at,
            mark: visit.mark,
        }
    }
}

//=========================================================================================
// Partial Update Bodies
//=========================================================================================

/// One attribute of a partial update body: absent, explicitly `null`, or a value.
/// Serde alone folds the first two together, and only the first is allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    Absent,
    Null,
    Present(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Absent
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Field::Present(value),
            None => Field::Null,
        })
    }
}

impl<T> Field<T> {
    fn into_change(self, name: &'static str) -> Result<Option<T>, ValidationError> {
        match self {
            Field::Absent => Ok(None),
            Field::Null => Err(ValidationError::NullField(name)),
            Field::Present(value) => Ok(Some(value)),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserPatchBody {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub email: Field<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub first_name: Field<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub last_name: Field<String>,
    #[serde(default)]
    #[schema(value_type = Option<GenderCode>)]
    pub gender: Field<GenderCode>,
    #[serde(default)]
    #[schema(value_type = Option<i64>)]
    pub birth_date: Field<i64>,
}

impl UserPatchBody {
    pub fn into_patch(self) -> Result<UserPatch, ValidationError> {
        Ok(UserPatch {
            email: self.email.into_change("email")?,
            first_name: self.first_name.into_change("first_name")?,
            last_name: self.last_name.into_change("last_name")?,
            gender: self.gender.into_change("gender")?.map(Gender::from),
            birth_date: self.birth_date.into_change("birth_date")?,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LocationPatchBody {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub place: Field<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub country: Field<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub city: Field<String>,
    #[serde(default)]
    #[schema(value_type = Option<u32>)]
    pub distance: Field<u32>,
}

impl LocationPatchBody {
    pub fn into_patch(self) -> Result<LocationPatch, ValidationError> {
        Ok(LocationPatch {
            place: self.place.into_change("place")?,
            country: self.country.into_change("country")?,
            city: self.city.into_change("city")?,
            distance: self.distance.into_change("distance")?,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VisitPatchBody {
    #[serde(default)]
    #[schema(value_type = Option<u32>)]
    pub location: Field<EntityId>,
    #[serde(default)]
    #[schema(value_type = Option<u32>)]
    pub user: Field<EntityId>,
    #[serde(default)]
    #[schema(value_type = Option<i64>)]
    pub visited_at: Field<i64>,
    #[serde(default)]
    #[schema(value_type = Option<u8>)]
    pub mark: Field<u8>,
}

impl VisitPatchBody {
    pub fn into_patch(self) -> Result<VisitPatch, ValidationError> {
        Ok(VisitPatch {
            location: self.location.into_change("location")?,
            user: self.user.into_change("user")?,
            visited_at: self.visited_at.into_change("visited_at")?,
            mark: self.mark.into_change("mark")?,
        })
    }
}

//=========================================================================================
// Request Bodies
//=========================================================================================

/// Decodes a request body that must be a JSON object. A top-level array is
/// rejected even when its items would line up with the fields by position.
pub fn decode_object<T: DeserializeOwned>(body: &[u8]) -> Result<T, serde_json::Error> {
    let object: Map<String, Value> = serde_json::from_slice(body)?;
    serde_json::from_value(Value::Object(object))
}

//=========================================================================================
// Responses
//=========================================================================================

/// The `{}` body sent for successful writes and for every error.
#[derive(Debug, Serialize, ToSchema)]
pub struct EmptyResponse {}

#[derive(Debug, Serialize, ToSchema)]
pub struct AverageResponse {
    pub avg: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VisitEntryRecord {
    pub mark: u8,
    pub visited_at: i64,
    pub place: String,
}

impl From<VisitEntry> for VisitEntryRecord {
    fn from(entry: VisitEntry) -> Self {
        Self {
            mark: entry.mark,
            visited_at: entry.visited_at,
            place: entry.place,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VisitsResponse {
    pub visits: Vec<VisitEntryRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_body_distinguishes_absent_and_null() {
        let body: VisitPatchBody = decode_object(br#"{"mark": 3}"#).unwrap();
        let patch = body.into_patch().unwrap();
        assert_eq!(
            patch,
            VisitPatch {
                mark: Some(3),
                ..Default::default()
            }
        );

        let body: VisitPatchBody = decode_object(br#"{"mark": null}"#).unwrap();
        assert_eq!(body.into_patch(), Err(ValidationError::NullField("mark")));
    }

    #[test]
    fn test_patch_body_rejects_wrong_types() {
        assert!(decode_object::<VisitPatchBody>(br#"{"mark": "3"}"#).is_err());
        assert!(decode_object::<VisitPatchBody>(br#"{"mark": -1}"#).is_err());
        assert!(decode_object::<UserPatchBody>(br#"{"gender": "x"}"#).is_err());
    }

    #[test]
    fn test_bodies_must_be_objects() {
        assert!(decode_object::<UserPatchBody>(b"[]").is_err());
        assert!(decode_object::<UserPatchBody>(br#"["evil@x"]"#).is_err());
        assert!(decode_object::<VisitRecord>(b"[5, 1, 1, 100, 3]").is_err());
        assert!(decode_object::<VisitPatchBody>(b"null").is_err());
        assert!(decode_object::<VisitPatchBody>(b"3").is_err());

        let empty: VisitPatchBody = decode_object(b"{}").unwrap();
        assert_eq!(empty.into_patch(), Ok(VisitPatch::default()));

        let record: VisitRecord =
            decode_object(br#"{"id":5,"location":1,"user":1,"visited_at":100,"mark":3}"#).unwrap();
        assert_eq!(record.mark, 3);
    }

    #[test]
    fn test_user_record_wire_format() {
        let raw = r#"{"id":1,"email":"a@b.c","first_name":"Ann","last_name":"Lee","gender":"f","birth_date":-5}"#;
        let record: UserRecord = serde_json::from_str(raw).unwrap();
        let user = record.clone().to_domain();
        assert_eq!(user.gender, Gender::Female);

        let back = serde_json::to_value(UserRecord::from(user)).unwrap();
        let original: serde_json::Value = serde_json::from_str(raw).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_empty_response_is_empty_object() {
        assert_eq!(serde_json::to_string(&EmptyResponse {}).unwrap(), "{}");
    }
}
