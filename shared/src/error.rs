use lambda_http::http::StatusCode;
use thiserror::Error;

/// Failure reported by a `DocumentStore`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store could not be reached or timed out. Safe to retry.
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("document store error: {0}")]
    Backend(String),

    /// An item came back without the attributes we wrote.
    #[error("malformed item: {0}")]
    Malformed(String),
}

/// Error taxonomy surfaced to callers. The message is what ends up in the
/// `error` field of the response body, so keep it short.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Transient(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Transient(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn missing_field(field: &str) -> ApiError {
        ApiError::Validation(format!("Missing required field: {}", field))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!("store failure: {}", err);
        match err {
            StoreError::Unavailable(_) => {
                ApiError::Transient("Document store is temporarily unavailable.".to_string())
            }
            StoreError::Backend(_) | StoreError::Malformed(_) => {
                ApiError::Internal("Failed to access the document store.".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::missing_field("status").status_code(), 400);
        assert_eq!(ApiError::NotFound("x".into()).status_code(), 404);
        assert_eq!(ApiError::Transient("x".into()).status_code(), 500);
        assert_eq!(ApiError::Internal("x".into()).status_code(), 500);
    }

    #[test]
    fn test_store_errors_do_not_leak_details() {
        let err: ApiError = StoreError::Backend("ResourceNotFoundException: table coachlife".into()).into();
        assert!(matches!(err, ApiError::Internal(_)));
        assert!(!err.to_string().contains("coachlife"));

        let err: ApiError = StoreError::Unavailable("dispatch failure".into()).into();
        assert!(matches!(err, ApiError::Transient(_)));
    }
}
