//! Persistence adapters for the document store.
//!
//! The stores keep the same collections, field names, and index shapes the
//! original deployment already has, so the service can point at an
//! existing database.

pub mod documents;
#[cfg(feature = "test-support")]
pub mod memory;
pub mod mongo_carpools;
pub mod mongo_users;

use std::time::Duration;

use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client, Database, IndexModel};
use tracing::{info, warn};

pub use mongo_carpools::MongoCarpoolStore;
pub use mongo_users::MongoUserStore;

/// Connection attempts made before startup gives up on the store.
const CONNECT_ATTEMPTS: u32 = 5;
/// Pause between connection attempts.
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Shared mapping from driver errors onto a port's connection/query split.
pub(crate) fn map_mongo_error<E>(
    error: mongodb::error::Error,
    connection: impl FnOnce(String) -> E,
    query: impl FnOnce(String) -> E,
) -> E {
    match *error.kind {
        mongodb::error::ErrorKind::ServerSelection { ref message, .. } => {
            connection(message.clone())
        }
        _ => query(error.to_string()),
    }
}

/// Connect to MongoDB, retrying a bounded number of times before failing
/// startup. Each attempt is verified with a `ping` so a half-open
/// connection does not pass as ready.
pub async fn connect_with_retry(
    uri: &str,
    database: &str,
) -> Result<Database, mongodb::error::Error> {
    let mut last_error = None;
    for attempt in 1..=CONNECT_ATTEMPTS {
        match Client::with_uri_str(uri).await {
            Ok(client) => {
                let db = client.database(database);
                match db.run_command(doc! { "ping": 1 }).await {
                    Ok(_) => {
                        info!(attempt, database, "connected to MongoDB");
                        return Ok(db);
                    }
                    Err(error) => {
                        warn!(attempt, error = %error, "MongoDB ping failed");
                        last_error = Some(error);
                    }
                }
            }
            Err(error) => {
                warn!(attempt, error = %error, "MongoDB connection attempt failed");
                last_error = Some(error);
            }
        }
        if attempt < CONNECT_ATTEMPTS {
            tokio::time::sleep(CONNECT_RETRY_DELAY).await;
        }
    }
    Err(last_error
        .unwrap_or_else(|| mongodb::error::Error::custom("no connection attempts were made")))
}

/// Create the indexes the queries rely on: the unique email index backing
/// duplicate-registration detection, and the status/departure-time
/// compound index backing carpool listings.
pub async fn ensure_indexes(database: &Database) -> Result<(), mongodb::error::Error> {
    let users = database.collection::<documents::UserDocument>("users");
    users
        .create_index(
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        )
        .await?;

    let carpools = database.collection::<documents::CarpoolDocument>("carpools");
    carpools
        .create_index(
            IndexModel::builder()
                .keys(doc! { "status": 1, "departureTime": 1 })
                .build(),
        )
        .await?;
    Ok(())
}
