//! MongoDB adapter for the user store port.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::doc;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::{Collection, Database};

use crate::domain::ports::{UserStore, UserStoreError};
use crate::domain::{User, UserId};

use super::documents::UserDocument;
use super::map_mongo_error;

const COLLECTION: &str = "users";

/// Duplicate-key server error code raised by the unique email index.
const DUPLICATE_KEY: i32 = 11000;

/// User store backed by the `users` collection.
#[derive(Clone)]
pub struct MongoUserStore {
    users: Collection<UserDocument>,
}

impl MongoUserStore {
    /// Bind the adapter to its collection.
    pub fn new(database: &Database) -> Self {
        Self {
            users: database.collection(COLLECTION),
        }
    }

    fn map_error(error: mongodb::error::Error) -> UserStoreError {
        map_mongo_error(error, UserStoreError::connection, UserStoreError::query)
    }

    fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
        matches!(
            *error.kind,
            ErrorKind::Write(WriteFailure::WriteError(ref write_error))
                if write_error.code == DUPLICATE_KEY
        )
    }

    fn into_user(doc: UserDocument) -> Result<User, UserStoreError> {
        doc.try_into()
            .map_err(|err: super::documents::DocumentError| UserStoreError::query(err.to_string()))
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn insert(&self, user: &User) -> Result<(), UserStoreError> {
        self.users
            .insert_one(UserDocument::from(user))
            .await
            .map(|_| ())
            .map_err(|error| {
                if Self::is_duplicate_key(&error) {
                    UserStoreError::DuplicateEmail {
                        email: user.email.clone(),
                    }
                } else {
                    Self::map_error(error)
                }
            })
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserStoreError> {
        self.users
            .find_one(doc! { "_id": id.to_string() })
            .await
            .map_err(Self::map_error)?
            .map(Self::into_user)
            .transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserStoreError> {
        self.users
            .find_one(doc! { "email": email })
            .await
            .map_err(Self::map_error)?
            .map(Self::into_user)
            .transpose()
    }

    async fn update(&self, user: &User) -> Result<(), UserStoreError> {
        let result = self
            .users
            .replace_one(doc! { "_id": user.id.to_string() }, UserDocument::from(user))
            .await
            .map_err(Self::map_error)?;
        if result.matched_count == 0 {
            return Err(UserStoreError::query(format!(
                "user {} vanished during update",
                user.id
            )));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>, UserStoreError> {
        let cursor = self
            .users
            .find(doc! {})
            .sort(doc! { "createdAt": 1 })
            .await
            .map_err(Self::map_error)?;
        let documents: Vec<UserDocument> = cursor.try_collect().await.map_err(Self::map_error)?;
        documents.into_iter().map(Self::into_user).collect()
    }
}
