use domains::DomainError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    /// `cause` is logged, never sent to the client.
    #[error("temporarily unavailable, retry later")]
    Unavailable { cause: String },
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::Unavailable { .. } => 503,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "invalid_argument",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "invalid_state",
            ApiError::Unavailable { .. } => "storage_unavailable",
        }
    }

    pub fn retryable(&self) -> bool {
        matches!(self, ApiError::Unavailable { .. })
    }

    /// Underlying failure for server-side logs.
    pub fn cause(&self) -> Option<&str> {
        match self {
            ApiError::Unavailable { cause } => Some(cause),
            _ => None,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                retryable: self.retryable(),
            },
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidArgument(msg) => ApiError::BadRequest(msg),
            DomainError::InvalidState(msg) => ApiError::Conflict(msg),
            err @ DomainError::NotFound(..) => ApiError::NotFound(err.to_string()),
            DomainError::Storage(cause) => ApiError::Unavailable { cause },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

#[cfg(feature = "web-axum")]
impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = axum::http::StatusCode::from_u16(self.status_code())
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        if let Some(cause) = self.cause() {
            tracing::error!(status = status.as_u16(), error = %cause, "request failed on storage");
        }
        (status, axum::Json(self.envelope())).into_response()
    }
}
