//! Crate-wide error type and result alias
//!
//! Every failure in the request path maps onto one of these variants; the
//! HTTP boundary converts them to a status code plus a JSON error body.

use hyper::StatusCode;
use thiserror::Error;

/// Errors surfaced by Leadhub services
#[derive(Error, Debug)]
pub enum LeadhubError {
    /// Missing or malformed request fields, rejected before persistence
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced entity (lead, service, location, user) does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Caller is not authorized for the attempted mutation
    #[error("{0}")]
    Forbidden(String),

    /// Well-formed transition request outside the legal transition table
    #[error("{0}")]
    InvalidTransition(String),

    /// The lead changed under the caller between read and commit
    #[error("{0}")]
    Conflict(String),

    /// Media storage or other upstream service failure
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// MongoDB failure
    #[error("Database error: {0}")]
    Database(String),

    /// Missing, invalid, or expired credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Body decode / protocol-level failure
    #[error("{0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LeadhubError {
    /// HTTP status the boundary should answer with
    pub fn status_code(&self) -> StatusCode {
        match self {
            LeadhubError::Validation(_) => StatusCode::BAD_REQUEST,
            LeadhubError::NotFound(_) => StatusCode::NOT_FOUND,
            LeadhubError::Forbidden(_) => StatusCode::FORBIDDEN,
            LeadhubError::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            LeadhubError::Conflict(_) => StatusCode::CONFLICT,
            LeadhubError::Upstream(_) => StatusCode::BAD_GATEWAY,
            LeadhubError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            LeadhubError::Auth(_) => StatusCode::UNAUTHORIZED,
            LeadhubError::Http(_) => StatusCode::BAD_REQUEST,
            LeadhubError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            LeadhubError::Validation(_) => "VALIDATION_ERROR",
            LeadhubError::NotFound(_) => "NOT_FOUND",
            LeadhubError::Forbidden(_) => "FORBIDDEN",
            LeadhubError::InvalidTransition(_) => "INVALID_TRANSITION",
            LeadhubError::Conflict(_) => "CONFLICT",
            LeadhubError::Upstream(_) => "UPSTREAM_FAILURE",
            LeadhubError::Database(_) => "DB_ERROR",
            LeadhubError::Auth(_) => "UNAUTHORIZED",
            LeadhubError::Http(_) => "BAD_REQUEST",
            LeadhubError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, LeadhubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            LeadhubError::NotFound("Lead".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LeadhubError::InvalidTransition("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LeadhubError::Conflict("raced".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            LeadhubError::Forbidden("nope".into()).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_not_found_message_names_entity() {
        let err = LeadhubError::NotFound("Service".into());
        assert_eq!(err.to_string(), "Service not found");
    }
}
