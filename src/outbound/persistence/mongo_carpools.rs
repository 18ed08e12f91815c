//! MongoDB adapter for the carpool store port.
//!
//! The seat append is a single conditional `findOneAndUpdate`: the filter
//! admits only documents with a free seat that do not already list the
//! user, and the aggregation-pipeline update seats the user and derives
//! the `full` status in the same document write. Two concurrent joins
//! against the last seat therefore cannot both succeed.

use async_trait::async_trait;
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};

use crate::domain::ports::{CarpoolStore, CarpoolStoreError};
use crate::domain::{Carpool, CarpoolFilter, CarpoolId, UserId};

use super::documents::CarpoolDocument;
use super::map_mongo_error;

const COLLECTION: &str = "carpools";

/// Carpool store backed by the `carpools` collection.
#[derive(Clone)]
pub struct MongoCarpoolStore {
    carpools: Collection<CarpoolDocument>,
}

impl MongoCarpoolStore {
    /// Bind the adapter to its collection.
    pub fn new(database: &Database) -> Self {
        Self {
            carpools: database.collection(COLLECTION),
        }
    }

    fn map_error(error: mongodb::error::Error) -> CarpoolStoreError {
        map_mongo_error(
            error,
            CarpoolStoreError::connection,
            CarpoolStoreError::query,
        )
    }

    fn into_carpool(doc: CarpoolDocument) -> Result<Carpool, CarpoolStoreError> {
        doc.try_into()
            .map_err(|err: super::documents::DocumentError| CarpoolStoreError::query(err.to_string()))
    }

    fn list_filter(filter: &CarpoolFilter) -> Document {
        let mut query = Document::new();
        if let Some(status) = filter.status {
            query.insert("status", status.as_str());
        }
        let mut window = Document::new();
        if let Some(after) = filter.departing_after {
            window.insert("$gte", after.to_rfc3339());
        }
        if let Some(before) = filter.departing_before {
            window.insert("$lte", before.to_rfc3339());
        }
        if !window.is_empty() {
            query.insert("departureTime", window);
        }
        query
    }
}

#[async_trait]
impl CarpoolStore for MongoCarpoolStore {
    async fn insert(&self, carpool: &Carpool) -> Result<(), CarpoolStoreError> {
        self.carpools
            .insert_one(CarpoolDocument::from(carpool))
            .await
            .map(|_| ())
            .map_err(Self::map_error)
    }

    async fn find_by_id(&self, id: &CarpoolId) -> Result<Option<Carpool>, CarpoolStoreError> {
        self.carpools
            .find_one(doc! { "_id": id.to_string() })
            .await
            .map_err(Self::map_error)?
            .map(Self::into_carpool)
            .transpose()
    }

    async fn list(&self, filter: &CarpoolFilter) -> Result<Vec<Carpool>, CarpoolStoreError> {
        let cursor = self
            .carpools
            .find(Self::list_filter(filter))
            .sort(doc! { "departureTime": 1 })
            .await
            .map_err(Self::map_error)?;
        let documents: Vec<CarpoolDocument> =
            cursor.try_collect().await.map_err(Self::map_error)?;
        documents.into_iter().map(Self::into_carpool).collect()
    }

    async fn append_passenger(
        &self,
        id: &CarpoolId,
        user: &UserId,
    ) -> Result<Carpool, CarpoolStoreError> {
        let filter = doc! {
            "_id": id.to_string(),
            "currentPassengers": { "$ne": user.to_string() },
            "$expr": { "$lt": [ { "$size": "$currentPassengers" }, "$maxPassengers" ] },
        };
        let update = vec![
            doc! { "$set": {
                "currentPassengers": {
                    "$concatArrays": [ "$currentPassengers", [ user.to_string() ] ]
                },
                "updatedAt": Utc::now().to_rfc3339(),
            } },
            doc! { "$set": {
                "status": { "$cond": [
                    { "$gte": [ { "$size": "$currentPassengers" }, "$maxPassengers" ] },
                    "full",
                    "$status",
                ] },
            } },
        ];

        let updated = self
            .carpools
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(Self::map_error)?;
        match updated {
            Some(document) => Self::into_carpool(document),
            // The guard refused; read the document once to say why.
            None => match self.find_by_id(id).await? {
                None => Err(CarpoolStoreError::NotFound { carpool_id: *id }),
                Some(carpool) if carpool.has_passenger(user) => {
                    Err(CarpoolStoreError::DuplicatePassenger { carpool_id: *id })
                }
                Some(_) => Err(CarpoolStoreError::CapacityExhausted { carpool_id: *id }),
            },
        }
    }

    async fn remove_passenger(
        &self,
        id: &CarpoolId,
        user: &UserId,
    ) -> Result<Carpool, CarpoolStoreError> {
        let update = doc! {
            "$pull": { "currentPassengers": user.to_string() },
            "$set": { "status": "active", "updatedAt": Utc::now().to_rfc3339() },
        };
        self.carpools
            .find_one_and_update(doc! { "_id": id.to_string() }, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(Self::map_error)?
            .ok_or(CarpoolStoreError::NotFound { carpool_id: *id })
            .and_then(Self::into_carpool)
    }

    async fn delete(&self, id: &CarpoolId) -> Result<bool, CarpoolStoreError> {
        self.carpools
            .delete_one(doc! { "_id": id.to_string() })
            .await
            .map(|result| result.deleted_count > 0)
            .map_err(Self::map_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CarpoolStatus;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    fn list_filter_is_empty_without_criteria() {
        assert_eq!(
            MongoCarpoolStore::list_filter(&CarpoolFilter::default()),
            Document::new()
        );
    }

    #[rstest]
    fn list_filter_combines_status_and_window() {
        let after = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2026, 9, 30, 0, 0, 0).unwrap();
        let filter = CarpoolFilter {
            status: Some(CarpoolStatus::Active),
            departing_after: Some(after),
            departing_before: Some(before),
        };

        let query = MongoCarpoolStore::list_filter(&filter);
        assert_eq!(query.get_str("status").expect("status"), "active");
        let window = query.get_document("departureTime").expect("window");
        assert_eq!(window.get_str("$gte").expect("gte"), after.to_rfc3339());
        assert_eq!(window.get_str("$lte").expect("lte"), before.to_rfc3339());
    }
}
