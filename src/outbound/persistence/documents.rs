//! Stored document shapes for the MongoDB collections.
//!
//! Field names stay camelCase and identifiers stay strings so the
//! collections remain readable alongside the documents the original data
//! set already contains. Timestamps are RFC 3339 strings; the original
//! schema stored `departureTime` as a string and indexed it, and RFC 3339
//! strings in UTC compare lexicographically, which the range filters rely
//! on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::auth::PasswordDigest;
use crate::domain::{
    AssistanceRequest, Carpool, GeoPoint, HousingOffer, User, VolunteerSkill,
};

/// A stored document failed to convert back into a domain aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed document: {0}")]
pub struct DocumentError(String);

impl DocumentError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, DocumentError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| DocumentError::new(format!("{field}: {err}")))
}

/// Carpool document in the `carpools` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarpoolDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub driver_id: String,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub departure_time: String,
    pub max_passengers: u32,
    #[serde(default)]
    pub current_passengers: Vec<String>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Carpool> for CarpoolDocument {
    fn from(carpool: &Carpool) -> Self {
        Self {
            id: carpool.id.to_string(),
            driver_id: carpool.driver_id.to_string(),
            origin: carpool.origin.clone(),
            destination: carpool.destination.clone(),
            departure_time: carpool.departure_time.to_rfc3339(),
            max_passengers: carpool.max_passengers,
            current_passengers: carpool
                .current_passengers
                .iter()
                .map(ToString::to_string)
                .collect(),
            status: carpool.status.as_str().to_owned(),
            description: carpool.description.clone(),
            created_at: carpool.created_at.to_rfc3339(),
            updated_at: carpool.updated_at.to_rfc3339(),
        }
    }
}

impl TryFrom<CarpoolDocument> for Carpool {
    type Error = DocumentError;

    fn try_from(doc: CarpoolDocument) -> Result<Self, Self::Error> {
        let passengers = doc
            .current_passengers
            .iter()
            .map(|raw| raw.parse().map_err(|_| {
                DocumentError::new(format!("currentPassengers: bad user id {raw}"))
            }))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: doc
                .id
                .parse()
                .map_err(|_| DocumentError::new(format!("_id: bad carpool id {}", doc.id)))?,
            driver_id: doc
                .driver_id
                .parse()
                .map_err(|_| DocumentError::new(format!("driverId: bad user id {}", doc.driver_id)))?,
            origin: doc.origin,
            destination: doc.destination,
            departure_time: parse_timestamp("departureTime", &doc.departure_time)?,
            max_passengers: doc.max_passengers,
            current_passengers: passengers,
            status: doc
                .status
                .parse()
                .map_err(|err: String| DocumentError::new(err))?,
            description: doc.description,
            created_at: parse_timestamp("createdAt", &doc.created_at)?,
            updated_at: parse_timestamp("updatedAt", &doc.updated_at)?,
        })
    }
}

/// User document in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    /// Salted digest, never a cleartext password.
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub skills: Vec<VolunteerSkill>,
    #[serde(default)]
    pub assistance_requests: Vec<AssistanceRequest>,
    #[serde(default)]
    pub temporary_housing: Vec<HousingOffer>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&User> for UserDocument {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            password: user.password_digest.as_str().to_owned(),
            phone: user.phone.clone(),
            roles: user.roles.iter().map(|role| role.as_str().to_owned()).collect(),
            location: user.location.clone(),
            skills: user.skills.clone(),
            assistance_requests: user.assistance_requests.clone(),
            temporary_housing: user.temporary_housing.clone(),
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

impl TryFrom<UserDocument> for User {
    type Error = DocumentError;

    fn try_from(doc: UserDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: doc
                .id
                .parse()
                .map_err(|_| DocumentError::new(format!("_id: bad user id {}", doc.id)))?,
            name: doc.name,
            email: doc.email,
            password_digest: PasswordDigest::from_stored(doc.password),
            phone: doc.phone,
            // The original schema was unvalidated; roles it never defined
            // are dropped rather than failing the whole document.
            roles: doc.roles.iter().filter_map(|raw| raw.parse().ok()).collect(),
            location: doc.location,
            skills: doc.skills,
            assistance_requests: doc.assistance_requests,
            temporary_housing: doc.temporary_housing,
            created_at: parse_timestamp("createdAt", &doc.created_at)?,
            updated_at: parse_timestamp("updatedAt", &doc.updated_at)?,
        })
    }
}
