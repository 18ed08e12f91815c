//! Inbound HTTP adapter: request/response DTOs, session handling, and the
//! mapping from domain errors onto HTTP statuses.

pub mod carpools;
pub mod error;
pub mod health;
pub mod users;

use actix_session::Session;
use tracing::warn;

pub use error::{ApiError, ApiResult};

use crate::domain::{DomainError, UserId, Viewer};

/// Session key holding the authenticated user's identifier.
const SESSION_USER_KEY: &str = "user_id";

/// Resolve the viewer identity from the cookie session.
///
/// A corrupt session entry is treated as anonymous and purged rather than
/// failing the request.
pub(crate) fn viewer(session: &Session) -> Viewer {
    match session.get::<UserId>(SESSION_USER_KEY) {
        Ok(Some(id)) => Viewer::User(id),
        Ok(None) => Viewer::Anonymous,
        Err(err) => {
            warn!(error = %err, "unreadable session entry, treating as anonymous");
            session.purge();
            Viewer::Anonymous
        }
    }
}

/// The authenticated user's identifier, or `401` for anonymous viewers.
pub(crate) fn current_user_id(session: &Session) -> ApiResult<UserId> {
    viewer(session)
        .user_id()
        .copied()
        .ok_or_else(|| ApiError::from(DomainError::unauthorized("authentication required")))
}

/// Record the login in the session, rotating the cookie identifier.
pub(crate) fn establish_session(session: &Session, user: &UserId) -> ApiResult<()> {
    session.renew();
    session
        .insert(SESSION_USER_KEY, user)
        .map_err(|err| ApiError::from(DomainError::internal(format!("session write failed: {err}"))))
}
