use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt::Display;

/// Setup-time failures. Each of these aborts a mock installation before any
/// request is answered from the new definitions.
#[derive(Debug, thiserror::Error)]
pub enum MockError {
    #[error("invalid duration format: {0:?} (expected e.g. \"1h30m\", \"7d\")")]
    InvalidDurationFormat(String),
    #[error("failed to parse fixture: {0}")]
    FixtureParse(String),
    #[error("fixture failed schema validation:\n{}", .0.join("\n"))]
    SchemaValidation(Vec<String>),
    #[error("incident at index {index} is missing required fields: {}", .fields.join(", "))]
    MissingIncidentFields { index: usize, fields: Vec<String> },
    #[error("invalid incident definitions: {0}")]
    InvalidDefinitions(String),
    #[error("unknown timezone {0:?}")]
    UnknownTimezone(String),
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }
}

impl From<MockError> for AppError {
    fn from(err: MockError) -> Self {
        tracing::warn!(error = %err, "mock setup rejected");
        Self::bad_request(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

pub fn internal_error(err: impl Display) -> AppError {
    tracing::error!(error = %err, "internal error");
    AppError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}
