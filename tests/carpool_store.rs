//! Store-level contract tests for the carpool adapters.
//!
//! The seat append must be conditional at the store: when several joins
//! race for the last seats, only as many may succeed as seats exist, and
//! the rest must bounce with a capacity rejection.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use futures_util::future::join_all;

use riada_backend::domain::ports::{CarpoolStore, CarpoolStoreError};
use riada_backend::domain::{Carpool, CarpoolDraft, CarpoolStatus, GeoPoint, UserId};
use riada_backend::outbound::persistence::memory::InMemoryCarpoolStore;

fn geo(address: &str) -> GeoPoint {
    GeoPoint {
        latitude: 39.47,
        longitude: -0.38,
        address: address.into(),
    }
}

fn carpool_with_seats(seats: u32) -> Carpool {
    CarpoolDraft {
        driver_id: UserId::generate(),
        origin: geo("Valencia"),
        destination: geo("Paiporta"),
        departure_time: Utc.with_ymd_and_hms(2026, 9, 1, 8, 0, 0).unwrap(),
        max_passengers: seats,
        description: None,
    }
    .into_carpool()
    .expect("valid carpool")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_never_exceed_capacity() {
    let store = Arc::new(InMemoryCarpoolStore::default());
    let carpool = carpool_with_seats(2);
    store.insert(&carpool).await.expect("insert");

    let attempts = (0..8).map(|_| {
        let store = Arc::clone(&store);
        let id = carpool.id;
        tokio::spawn(async move { store.append_passenger(&id, &UserId::generate()).await })
    });

    let mut seated = 0;
    let mut refused = 0;
    for outcome in join_all(attempts).await {
        match outcome.expect("join task") {
            Ok(_) => seated += 1,
            Err(CarpoolStoreError::CapacityExhausted { .. }) => refused += 1,
            Err(other) => panic!("unexpected rejection: {other}"),
        }
    }
    assert_eq!(seated, 2);
    assert_eq!(refused, 6);

    let stored = store
        .find_by_id(&carpool.id)
        .await
        .expect("query")
        .expect("carpool present");
    assert_eq!(stored.current_passengers.len(), 2);
    assert_eq!(stored.status, CarpoolStatus::Full);
}

#[tokio::test]
async fn concurrent_duplicate_joins_grant_one_seat() {
    let store = Arc::new(InMemoryCarpoolStore::default());
    let carpool = carpool_with_seats(4);
    store.insert(&carpool).await.expect("insert");
    let user = UserId::generate();

    let attempts = (0..4).map(|_| {
        let store = Arc::clone(&store);
        let id = carpool.id;
        tokio::spawn(async move { store.append_passenger(&id, &user).await })
    });

    let mut seated = 0;
    for outcome in join_all(attempts).await {
        match outcome.expect("join task") {
            Ok(_) => seated += 1,
            Err(CarpoolStoreError::DuplicatePassenger { .. }) => {}
            Err(other) => panic!("unexpected rejection: {other}"),
        }
    }
    assert_eq!(seated, 1);

    let stored = store
        .find_by_id(&carpool.id)
        .await
        .expect("query")
        .expect("carpool present");
    assert_eq!(stored.current_passengers, vec![user]);
}

#[tokio::test]
async fn appending_a_passenger_refreshes_the_update_timestamp() {
    let store = InMemoryCarpoolStore::default();
    let carpool = carpool_with_seats(2);
    store.insert(&carpool).await.expect("insert");

    tokio::time::sleep(Duration::from_millis(5)).await;
    let updated = store
        .append_passenger(&carpool.id, &UserId::generate())
        .await
        .expect("join");
    assert!(updated.updated_at > carpool.updated_at);
}
