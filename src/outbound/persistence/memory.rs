//! In-memory adapters for integration tests and local development.
//!
//! The carpool store enforces the same conditional-append contract as the
//! MongoDB adapter, under a single mutex guard per operation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::ports::{
    CarpoolStore, CarpoolStoreError, Geocoder, GeocodingError, UserStore, UserStoreError,
};
use crate::domain::{Carpool, CarpoolFilter, CarpoolId, CarpoolStatus, GeoPoint, User, UserId};

/// Carpool store holding documents in a mutex-guarded map.
#[derive(Default)]
pub struct InMemoryCarpoolStore {
    carpools: Mutex<HashMap<String, Carpool>>,
}

#[async_trait]
impl CarpoolStore for InMemoryCarpoolStore {
    async fn insert(&self, carpool: &Carpool) -> Result<(), CarpoolStoreError> {
        let mut guard = self.carpools.lock().expect("store poisoned");
        guard.insert(carpool.id.to_string(), carpool.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &CarpoolId) -> Result<Option<Carpool>, CarpoolStoreError> {
        let guard = self.carpools.lock().expect("store poisoned");
        Ok(guard.get(&id.to_string()).cloned())
    }

    async fn list(&self, filter: &CarpoolFilter) -> Result<Vec<Carpool>, CarpoolStoreError> {
        let guard = self.carpools.lock().expect("store poisoned");
        let mut matching: Vec<Carpool> =
            guard.values().filter(|c| filter.matches(c)).cloned().collect();
        matching.sort_by_key(|c| c.departure_time);
        Ok(matching)
    }

    async fn append_passenger(
        &self,
        id: &CarpoolId,
        user: &UserId,
    ) -> Result<Carpool, CarpoolStoreError> {
        let mut guard = self.carpools.lock().expect("store poisoned");
        let carpool = guard
            .get_mut(&id.to_string())
            .ok_or(CarpoolStoreError::NotFound { carpool_id: *id })?;
        if carpool.has_passenger(user) {
            return Err(CarpoolStoreError::DuplicatePassenger { carpool_id: *id });
        }
        if carpool.is_at_capacity() {
            return Err(CarpoolStoreError::CapacityExhausted { carpool_id: *id });
        }
        carpool.current_passengers.push(*user);
        if carpool.is_at_capacity() {
            carpool.status = CarpoolStatus::Full;
        }
        carpool.updated_at = Utc::now();
        Ok(carpool.clone())
    }

    async fn remove_passenger(
        &self,
        id: &CarpoolId,
        user: &UserId,
    ) -> Result<Carpool, CarpoolStoreError> {
        let mut guard = self.carpools.lock().expect("store poisoned");
        let carpool = guard
            .get_mut(&id.to_string())
            .ok_or(CarpoolStoreError::NotFound { carpool_id: *id })?;
        carpool.leave(user);
        Ok(carpool.clone())
    }

    async fn delete(&self, id: &CarpoolId) -> Result<bool, CarpoolStoreError> {
        let mut guard = self.carpools.lock().expect("store poisoned");
        Ok(guard.remove(&id.to_string()).is_some())
    }
}

/// User store holding documents in a mutex-guarded map, with the same
/// unique-email behaviour as the real collection.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<String, User>>,
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: &User) -> Result<(), UserStoreError> {
        let mut guard = self.users.lock().expect("store poisoned");
        if guard.values().any(|existing| existing.email == user.email) {
            return Err(UserStoreError::DuplicateEmail {
                email: user.email.clone(),
            });
        }
        guard.insert(user.id.to_string(), user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserStoreError> {
        let guard = self.users.lock().expect("store poisoned");
        Ok(guard.get(&id.to_string()).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserStoreError> {
        let guard = self.users.lock().expect("store poisoned");
        Ok(guard.values().find(|user| user.email == email).cloned())
    }

    async fn update(&self, user: &User) -> Result<(), UserStoreError> {
        let mut guard = self.users.lock().expect("store poisoned");
        guard.insert(user.id.to_string(), user.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>, UserStoreError> {
        let guard = self.users.lock().expect("store poisoned");
        let mut users: Vec<User> = guard.values().cloned().collect();
        users.sort_by_key(|user| user.created_at);
        Ok(users)
    }
}

/// Geocoder resolving from a fixed address table.
#[derive(Default)]
pub struct StaticGeocoder {
    points: HashMap<String, GeoPoint>,
}

impl StaticGeocoder {
    /// Register an address the geocoder will resolve.
    pub fn with_point(mut self, address: impl Into<String>, point: GeoPoint) -> Self {
        self.points.insert(address.into(), point);
        self
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn resolve_address(&self, address: &str) -> Result<Option<GeoPoint>, GeocodingError> {
        Ok(self.points.get(address).cloned())
    }
}
