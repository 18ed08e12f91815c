//! HTTP error payloads and mapping from domain errors.
//!
//! Keep the domain free of transport concerns by translating
//! [`DomainError`] into Actix responses here. Internal failures are logged
//! with their real message and redacted in the response body.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use tracing::error;

use crate::domain::{DomainError, ErrorCode};

/// HTTP wrapper around a [`DomainError`].
///
/// The serialised body is the domain payload itself:
/// `{ "code", "message", "details"? }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError(DomainError);

impl ApiError {
    /// The wrapped domain error.
    pub fn inner(&self) -> &DomainError {
        &self.0
    }

    fn to_status_code(&self) -> StatusCode {
        match self.0.code() {
            ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        Self(error)
    }
}

impl From<actix_web::Error> for ApiError {
    fn from(error: actix_web::Error) -> Self {
        error!(error = %error, "actix error promoted to API error");
        Self(DomainError::internal("internal server error"))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ApiError {}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.to_status_code()
    }

    fn error_response(&self) -> HttpResponse {
        if self.0.code() == ErrorCode::InternalError {
            error!(message = self.0.message(), "internal error surfaced to client");
            let redacted = DomainError::internal("internal server error");
            return HttpResponse::build(self.status_code()).json(redacted);
        }
        HttpResponse::build(self.status_code()).json(&self.0)
    }
}

/// Convenience alias for HTTP handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use rstest::rstest;

    #[rstest]
    #[case(DomainError::invalid_request("bad"), StatusCode::BAD_REQUEST)]
    #[case(DomainError::unauthorized("who"), StatusCode::UNAUTHORIZED)]
    #[case(DomainError::forbidden("no"), StatusCode::FORBIDDEN)]
    #[case(DomainError::not_found("gone"), StatusCode::NOT_FOUND)]
    #[case(DomainError::conflict("carpool is full"), StatusCode::CONFLICT)]
    #[case(DomainError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
    fn codes_map_onto_http_statuses(#[case] error: DomainError, #[case] expected: StatusCode) {
        assert_eq!(ApiError::from(error).status_code(), expected);
    }

    #[actix_web::test]
    async fn internal_messages_are_redacted() {
        let response = ApiError::from(DomainError::internal("password was hunter2"))
            .error_response();
        let body = to_bytes(response.into_body()).await.expect("body");
        let text = std::str::from_utf8(&body).expect("utf8");
        assert!(!text.contains("hunter2"));
        assert!(text.contains("internal server error"));
    }

    #[actix_web::test]
    async fn client_errors_keep_their_message() {
        let response = ApiError::from(DomainError::conflict("carpool is full")).error_response();
        let body = to_bytes(response.into_body()).await.expect("body");
        let text = std::str::from_utf8(&body).expect("utf8");
        assert!(text.contains("carpool is full"));
    }
}
