use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::handlers::shared::ApiResponse;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    State(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::State(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = self.to_string();

        log::error!(
            "Request failed with status {}: {}",
            status_code,
            error_message
        );

        let response_body = ApiResponse::<()>::error(&error_message);

        HttpResponse::build(status_code).json(response_body)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        log::error!("Database error: {}", error);

        // Unique violations surface as conflicts, not opaque storage
        // failures. The violated constraint decides the message: the
        // active-application index gets the duplicate-application wording,
        // a racing duplicate signup gets the email wording.
        if let sqlx::Error::Database(ref db_err) = error {
            if db_err.code().as_deref() == Some("23505") {
                return match db_err.constraint() {
                    Some("uniq_active_application") => AppError::Conflict(
                        "An active application already exists".to_string(),
                    ),
                    Some("users_email_key") => {
                        AppError::Conflict("Email already registered".to_string())
                    }
                    _ => AppError::Conflict(
                        "A conflicting record already exists".to_string(),
                    ),
                };
            }
        }

        AppError::Database(error)
    }
}

impl AppError {
    /// True for transient store failures worth retrying (serialization
    /// failure, deadlock detected).
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Database(sqlx::Error::Database(db_err)) => {
                matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[derive(Debug)]
    struct StubDbError {
        code: &'static str,
        constraint: Option<&'static str>,
    }

    impl std::fmt::Display for StubDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "database error {}", self.code)
        }
    }

    impl std::error::Error for StubDbError {}

    impl sqlx::error::DatabaseError for StubDbError {
        fn message(&self) -> &str {
            "database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(self.code.into())
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            match self.code {
                "23505" => sqlx::error::ErrorKind::UniqueViolation,
                _ => sqlx::error::ErrorKind::Other,
            }
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    fn db_error(code: &'static str, constraint: Option<&'static str>) -> sqlx::Error {
        sqlx::Error::Database(Box::new(StubDbError { code, constraint }))
    }

    #[test]
    fn active_application_index_violation_gets_the_application_message() {
        let err = AppError::from(db_error("23505", Some("uniq_active_application")));

        match err {
            AppError::Conflict(message) => {
                assert_eq!(message, "An active application already exists")
            }
            other => panic!("expected Conflict, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_email_violation_gets_the_email_message() {
        let err = AppError::from(db_error("23505", Some("users_email_key")));

        match err {
            AppError::Conflict(message) => assert_eq!(message, "Email already registered"),
            other => panic!("expected Conflict, got {:?}", other),
        }
    }

    #[test]
    fn other_unique_violations_get_a_generic_conflict() {
        let err = AppError::from(db_error("23505", Some("special_codes_pkey")));

        match err {
            AppError::Conflict(message) => {
                assert_eq!(message, "A conflicting record already exists")
            }
            other => panic!("expected Conflict, got {:?}", other),
        }
    }

    #[test]
    fn serialization_failures_and_deadlocks_are_retryable() {
        assert!(AppError::from(db_error("40001", None)).is_retryable());
        assert!(AppError::from(db_error("40P01", None)).is_retryable());
        assert!(!AppError::from(db_error("23503", None)).is_retryable());
    }
}
