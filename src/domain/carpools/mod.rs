//! Carpool aggregate and its lifecycle state machine.
//!
//! A carpool is a driver-offered ride with a fixed seat capacity. The state
//! machine here owns the capacity and membership invariants; the service in
//! [`service`] drives it through the persistence port.

pub mod service;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::geo::{GeoPoint, GeoValidationError};
use super::users::UserId;

/// Smallest seat capacity a carpool may offer.
pub const MIN_PASSENGERS: u32 = 1;
/// Largest seat capacity a carpool may offer.
pub const MAX_PASSENGERS: u32 = 8;

/// Stable carpool identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct CarpoolId(Uuid);

impl CarpoolId {
    /// Mint a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for CarpoolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CarpoolId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle states of a carpool offer.
///
/// `Active` is the initial state. `Full` is derived from seat occupancy.
/// `Cancelled` and `Completed` are set administratively and accept no
/// further joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CarpoolStatus {
    Active,
    Full,
    Cancelled,
    Completed,
}

impl CarpoolStatus {
    /// Stable string form used in stored documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Full => "full",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

impl std::str::FromStr for CarpoolStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "full" => Ok(Self::Full),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown carpool status: {other}")),
        }
    }
}

/// Reasons a join attempt is refused by the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinRejection {
    /// Every seat is taken.
    #[error("carpool is full")]
    Full,
    /// The caller already occupies a seat.
    #[error("user is already a passenger on this carpool")]
    AlreadyPassenger,
    /// The driver cannot take a seat on their own offer.
    #[error("the driver cannot join their own carpool")]
    DriverCannotJoin,
    /// Cancelled and completed carpools accept no further joins.
    #[error("carpool is {status} and no longer accepts passengers")]
    NotJoinable { status: &'static str },
}

/// Validation failures raised when creating a carpool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CarpoolValidationError {
    /// Seat capacity outside `[MIN_PASSENGERS, MAX_PASSENGERS]`.
    #[error("maxPassengers must be between {MIN_PASSENGERS} and {MAX_PASSENGERS}")]
    InvalidCapacity,
    /// Origin coordinates are not a point on the globe.
    #[error("origin: {0}")]
    InvalidOrigin(GeoValidationError),
    /// Destination coordinates are not a point on the globe.
    #[error("destination: {0}")]
    InvalidDestination(GeoValidationError),
}

/// Inputs for creating a carpool, before validation.
///
/// Geocoding of the endpoints happens in the inbound adapter; by the time a
/// draft reaches the domain both endpoints carry resolved coordinates.
#[derive(Debug, Clone)]
pub struct CarpoolDraft {
    pub driver_id: UserId,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub departure_time: DateTime<Utc>,
    pub max_passengers: u32,
    pub description: Option<String>,
}

impl CarpoolDraft {
    /// Validate the draft and mint the carpool aggregate.
    pub fn into_carpool(self) -> Result<Carpool, CarpoolValidationError> {
        if !(MIN_PASSENGERS..=MAX_PASSENGERS).contains(&self.max_passengers) {
            return Err(CarpoolValidationError::InvalidCapacity);
        }
        self.origin
            .validate()
            .map_err(CarpoolValidationError::InvalidOrigin)?;
        self.destination
            .validate()
            .map_err(CarpoolValidationError::InvalidDestination)?;

        let now = Utc::now();
        Ok(Carpool {
            id: CarpoolId::generate(),
            driver_id: self.driver_id,
            origin: self.origin,
            destination: self.destination,
            departure_time: self.departure_time,
            max_passengers: self.max_passengers,
            current_passengers: Vec::new(),
            status: CarpoolStatus::Active,
            description: self.description,
            created_at: now,
            updated_at: now,
        })
    }
}

/// A driver-offered ride with a fixed seat capacity.
///
/// ## Invariants
/// - `current_passengers.len() <= max_passengers` always.
/// - `status == Full` iff the passenger list is at capacity and the carpool
///   was not cancelled or completed.
/// - `driver_id` never appears in `current_passengers`.
#[derive(Debug, Clone, PartialEq)]
pub struct Carpool {
    pub id: CarpoolId,
    pub driver_id: UserId,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub departure_time: DateTime<Utc>,
    pub max_passengers: u32,
    pub current_passengers: Vec<UserId>,
    pub status: CarpoolStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Carpool {
    /// Whether every seat is taken.
    pub fn is_at_capacity(&self) -> bool {
        self.current_passengers.len() as u32 >= self.max_passengers
    }

    /// Whether the user currently occupies a seat.
    pub fn has_passenger(&self, user: &UserId) -> bool {
        self.current_passengers.contains(user)
    }

    /// Check a join attempt against the state machine without mutating.
    ///
    /// Rejections are checked in the order a caller can act on them:
    /// terminal state first, then identity, then capacity.
    pub fn check_joinable(&self, user: &UserId) -> Result<(), JoinRejection> {
        match self.status {
            CarpoolStatus::Cancelled | CarpoolStatus::Completed => {
                return Err(JoinRejection::NotJoinable {
                    status: self.status.as_str(),
                });
            }
            CarpoolStatus::Active | CarpoolStatus::Full => {}
        }
        if *user == self.driver_id {
            return Err(JoinRejection::DriverCannotJoin);
        }
        if self.has_passenger(user) {
            return Err(JoinRejection::AlreadyPassenger);
        }
        if self.is_at_capacity() {
            return Err(JoinRejection::Full);
        }
        Ok(())
    }

    /// Seat the user, flipping the status to `Full` when the last seat goes.
    pub fn join(&mut self, user: UserId) -> Result<(), JoinRejection> {
        self.check_joinable(&user)?;
        self.current_passengers.push(user);
        if self.is_at_capacity() {
            self.status = CarpoolStatus::Full;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Remove the user's seat if held (no-op otherwise) and reset the
    /// status to `Active`.
    ///
    /// The reset is unconditional, even from `Cancelled` or `Completed`.
    /// That reproduces the behaviour of the system this replaces and is
    /// flagged as a pending product decision; do not "fix" it here.
    pub fn leave(&mut self, user: &UserId) {
        self.current_passengers.retain(|p| p != user);
        self.status = CarpoolStatus::Active;
        self.updated_at = Utc::now();
    }
}

/// Optional narrowing criteria for carpool listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarpoolFilter {
    pub status: Option<CarpoolStatus>,
    pub departing_after: Option<DateTime<Utc>>,
    pub departing_before: Option<DateTime<Utc>>,
}

impl CarpoolFilter {
    /// Whether the carpool satisfies every present criterion.
    pub fn matches(&self, carpool: &Carpool) -> bool {
        if let Some(status) = self.status {
            if carpool.status != status {
                return false;
            }
        }
        if let Some(after) = self.departing_after {
            if carpool.departure_time < after {
                return false;
            }
        }
        if let Some(before) = self.departing_before {
            if carpool.departure_time > before {
                return false;
            }
        }
        true
    }
}
