use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde::{Deserialize, Serialize};
use shortnote_core::db::DbError;
use shortnote_core::{ConfigError, NoteServiceError, NoteValidationError};
use thiserror::Error;

/// Startup and serving failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("core configuration error: {0}")]
    CoreConfig(#[from] ConfigError),

    #[error("storage bootstrap failed: {0}")]
    Storage(#[from] DbError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// JSON error body returned for every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: String,
}

/// Request failure mapped onto an HTTP status and a stable error code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "invalid_input",
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "storage_unavailable",
            message: "Internal server error. Please try again later.".to_string(),
        }
    }
}

impl From<NoteServiceError> for ApiError {
    fn from(err: NoteServiceError) -> Self {
        let code = err.code();
        match err {
            NoteServiceError::InvalidInput(reason) => Self {
                status: StatusCode::BAD_REQUEST,
                code,
                message: invalid_input_message(&reason),
            },
            NoteServiceError::NotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                code,
                message: "Note not found.".to_string(),
            },
            NoteServiceError::DuplicateId(id) => Self {
                status: StatusCode::CONFLICT,
                code,
                message: format!("Note ID {id} is already taken."),
            },
            NoteServiceError::AllocationExhausted { .. } => Self {
                status: StatusCode::SERVICE_UNAVAILABLE,
                code,
                message: "Could not generate a unique ID. Please try again.".to_string(),
            },
            other => {
                error!(
                    "event=http_request module=server status=error error_code={} error={}",
                    other.code(),
                    other
                );
                Self::internal()
            }
        }
    }
}

fn invalid_input_message(reason: &NoteValidationError) -> String {
    match reason {
        NoteValidationError::IdLength { .. } | NoteValidationError::IdCharacter { .. } => {
            format!("Invalid or missing 6-character note ID: {reason}.")
        }
        _ => format!("Invalid note content: {reason}."),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: self.message,
            code: self.code.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortnote_core::RepoError;

    #[test]
    fn taxonomy_maps_to_distinct_statuses() {
        let invalid: ApiError =
            NoteServiceError::InvalidInput(NoteValidationError::EmptyContent).into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

        let missing: ApiError = NoteServiceError::NotFound("ZZZZZZ".into()).into();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let exhausted: ApiError = NoteServiceError::AllocationExhausted { attempts: 10 }.into();
        assert_eq!(exhausted.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(exhausted.code, "allocation_exhausted");
    }

    #[test]
    fn storage_errors_do_not_leak_driver_details() {
        let err: ApiError = NoteServiceError::StorageUnavailable(RepoError::InvalidData(
            "disk I/O error at page 7".into(),
        ))
        .into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("page 7"));
    }
}
