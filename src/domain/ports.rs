//! Domain ports defining the edges of the hexagon.
//!
//! Ports describe how the domain expects to interact with driven adapters
//! (the document store and the geocoding service). Each trait exposes
//! strongly typed errors so adapters map their failures into predictable
//! variants instead of returning `anyhow::Result`.

use async_trait::async_trait;
use thiserror::Error;

use super::carpools::{Carpool, CarpoolFilter, CarpoolId};
use super::geo::GeoPoint;
use super::users::{User, UserId};

/// Errors surfaced by carpool store adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CarpoolStoreError {
    /// Store connectivity failure.
    #[error("carpool store connection failed: {message}")]
    Connection { message: String },
    /// Query or mutation failed during execution.
    #[error("carpool store query failed: {message}")]
    Query { message: String },
    /// No carpool document carries this identifier.
    #[error("carpool {carpool_id} not found")]
    NotFound { carpool_id: CarpoolId },
    /// The conditional seat append found no free seat.
    #[error("carpool {carpool_id} has no free seats")]
    CapacityExhausted { carpool_id: CarpoolId },
    /// The conditional seat append found the user already seated.
    #[error("user is already a passenger of carpool {carpool_id}")]
    DuplicatePassenger { carpool_id: CarpoolId },
}

impl CarpoolStoreError {
    /// Helper for connection oriented failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for query failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Errors surfaced by user store adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserStoreError {
    /// Store connectivity failure.
    #[error("user store connection failed: {message}")]
    Connection { message: String },
    /// Query or mutation failed during execution.
    #[error("user store query failed: {message}")]
    Query { message: String },
    /// The unique email index refused an insert.
    #[error("email {email} is already registered")]
    DuplicateEmail { email: String },
}

impl UserStoreError {
    /// Helper for connection oriented failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for query failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Errors surfaced by the geocoding adapter.
///
/// An address that simply has no match is not an error; the port returns
/// `Ok(None)` for that case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodingError {
    /// The upstream geocoder failed or was unreachable after retries.
    #[error("geocoding failed: {message}")]
    Upstream { message: String },
}

impl GeocodingError {
    /// Helper for upstream failures.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }
}

/// Persistence port for carpool documents.
///
/// `append_passenger` and `remove_passenger` are whole transitions, not
/// bare writes: the append must be conditional at the store ("seat the user
/// only if a seat is free and they are not already seated") so that
/// concurrent joins against a near-full carpool cannot race past the
/// capacity check.
#[async_trait]
pub trait CarpoolStore: Send + Sync {
    /// Persist a freshly created carpool.
    async fn insert(&self, carpool: &Carpool) -> Result<(), CarpoolStoreError>;

    /// Fetch a carpool by identifier.
    async fn find_by_id(&self, id: &CarpoolId) -> Result<Option<Carpool>, CarpoolStoreError>;

    /// List carpools matching the filter, ordered by departure time.
    async fn list(&self, filter: &CarpoolFilter) -> Result<Vec<Carpool>, CarpoolStoreError>;

    /// Atomically seat the user, flipping status to `full` when the last
    /// seat goes. Returns the updated carpool.
    async fn append_passenger(
        &self,
        id: &CarpoolId,
        user: &UserId,
    ) -> Result<Carpool, CarpoolStoreError>;

    /// Remove the user's seat (no-op when absent) and reset status to
    /// `active`. Returns the updated carpool.
    async fn remove_passenger(
        &self,
        id: &CarpoolId,
        user: &UserId,
    ) -> Result<Carpool, CarpoolStoreError>;

    /// Hard-delete the carpool. Returns whether a document was removed.
    async fn delete(&self, id: &CarpoolId) -> Result<bool, CarpoolStoreError>;
}

/// Persistence port for user documents.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a freshly registered user.
    async fn insert(&self, user: &User) -> Result<(), UserStoreError>;

    /// Fetch a user by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserStoreError>;

    /// Fetch a user by normalised email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserStoreError>;

    /// Replace the stored document with the given aggregate state.
    async fn update(&self, user: &User) -> Result<(), UserStoreError>;

    /// List every user record.
    async fn list(&self) -> Result<Vec<User>, UserStoreError>;
}

/// Address resolution port, called by inbound adapters before carpool
/// creation reaches the domain.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve free-text into a geocoded point, `None` when nothing
    /// matches.
    async fn resolve_address(&self, address: &str) -> Result<Option<GeoPoint>, GeocodingError>;
}
