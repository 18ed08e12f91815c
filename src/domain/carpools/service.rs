//! Carpool lifecycle service: drives the state machine through the store
//! port and maps port failures into domain errors.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{CarpoolStore, CarpoolStoreError};
use crate::domain::{Carpool, CarpoolDraft, CarpoolFilter, CarpoolId, DomainError, JoinRejection, UserId};

/// Service implementing the carpool lifecycle operations.
///
/// All operations are fail-fast with a typed error; the service never
/// retries and never swallows a failure. Retry decisions belong to callers.
#[derive(Clone)]
pub struct CarpoolService {
    store: Arc<dyn CarpoolStore>,
}

impl CarpoolService {
    /// Create a service over the given store adapter.
    pub fn new(store: Arc<dyn CarpoolStore>) -> Self {
        Self { store }
    }

    fn map_store_error(error: CarpoolStoreError) -> DomainError {
        match error {
            CarpoolStoreError::Connection { message } => {
                DomainError::internal(format!("carpool store unavailable: {message}"))
            }
            CarpoolStoreError::Query { message } => {
                DomainError::internal(format!("carpool store error: {message}"))
            }
            CarpoolStoreError::NotFound { carpool_id } => DomainError::not_found("carpool not found")
                .with_details(json!({ "carpoolId": carpool_id })),
            CarpoolStoreError::CapacityExhausted { carpool_id } => {
                DomainError::conflict("carpool is full")
                    .with_details(json!({ "carpoolId": carpool_id }))
            }
            CarpoolStoreError::DuplicatePassenger { carpool_id } => {
                DomainError::invalid_request("user is already a passenger on this carpool")
                    .with_details(json!({ "carpoolId": carpool_id }))
            }
        }
    }

    fn map_rejection(rejection: JoinRejection) -> DomainError {
        match rejection {
            JoinRejection::Full => DomainError::conflict("carpool is full"),
            other => DomainError::invalid_request(other.to_string()),
        }
    }

    /// Validate and persist a new carpool offer.
    pub async fn create(&self, draft: CarpoolDraft) -> Result<Carpool, DomainError> {
        let carpool = draft
            .into_carpool()
            .map_err(|err| DomainError::invalid_request(err.to_string()))?;
        self.store
            .insert(&carpool)
            .await
            .map_err(Self::map_store_error)?;
        info!(
            carpool_id = %carpool.id,
            driver_id = %carpool.driver_id,
            max_passengers = carpool.max_passengers,
            "carpool created"
        );
        Ok(carpool)
    }

    /// Fetch a carpool by identifier.
    pub async fn get(&self, id: &CarpoolId) -> Result<Carpool, DomainError> {
        self.store
            .find_by_id(id)
            .await
            .map_err(Self::map_store_error)?
            .ok_or_else(|| {
                DomainError::not_found("carpool not found").with_details(json!({ "carpoolId": id }))
            })
    }

    /// List carpools matching the filter, ordered by departure time.
    pub async fn list(&self, filter: &CarpoolFilter) -> Result<Vec<Carpool>, DomainError> {
        self.store.list(filter).await.map_err(Self::map_store_error)
    }

    /// Seat the user on the carpool.
    ///
    /// The state machine is consulted first for a precise rejection; the
    /// seat append itself is conditional at the store so a concurrent join
    /// cannot race past the capacity check between read and write.
    pub async fn join(&self, id: &CarpoolId, user: &UserId) -> Result<Carpool, DomainError> {
        let current = self.get(id).await?;
        if let Err(rejection) = current.check_joinable(user) {
            warn!(carpool_id = %id, user_id = %user, %rejection, "join rejected");
            return Err(Self::map_rejection(rejection));
        }

        let updated = self
            .store
            .append_passenger(id, user)
            .await
            .map_err(Self::map_store_error)?;
        info!(
            carpool_id = %id,
            user_id = %user,
            occupancy = updated.current_passengers.len(),
            status = updated.status.as_str(),
            "passenger joined"
        );
        Ok(updated)
    }

    /// Remove the user's seat; a no-op when the user holds none. Resets the
    /// status to `active` unconditionally (see [`Carpool::leave`]).
    pub async fn leave(&self, id: &CarpoolId, user: &UserId) -> Result<Carpool, DomainError> {
        let updated = self
            .store
            .remove_passenger(id, user)
            .await
            .map_err(Self::map_store_error)?;
        info!(
            carpool_id = %id,
            user_id = %user,
            occupancy = updated.current_passengers.len(),
            "passenger left"
        );
        Ok(updated)
    }

    /// Hard-delete the carpool; only its driver may do so.
    pub async fn delete(&self, id: &CarpoolId, requester: &UserId) -> Result<(), DomainError> {
        let carpool = self.get(id).await?;
        if carpool.driver_id != *requester {
            warn!(carpool_id = %id, requester = %requester, "delete refused: not the driver");
            return Err(DomainError::forbidden("only the driver may delete a carpool"));
        }
        let removed = self.store.delete(id).await.map_err(Self::map_store_error)?;
        if !removed {
            return Err(
                DomainError::not_found("carpool not found").with_details(json!({ "carpoolId": id }))
            );
        }
        info!(carpool_id = %id, "carpool deleted");
        Ok(())
    }
}
