use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use didery_common::ValidationError;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(err) => validation_status(err),
            AppError::Config(_)
            | AppError::Io(_)
            | AppError::Store(_)
            | AppError::Serialization(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AppError::Validation(err) => err.title(),
            AppError::Store(_) => "Storage Error",
            _ => "Internal Error",
        }
    }
}

fn validation_status(err: &ValidationError) -> StatusCode {
    match err {
        ValidationError::NotFound(_) => StatusCode::NOT_FOUND,
        ValidationError::AlreadyExists(_) => StatusCode::CONFLICT,
        ValidationError::MissingSignatureHeader
        | ValidationError::MissingSignatureTag(_)
        | ValidationError::UnverifiableSignature(_)
        | ValidationError::HijackAttempt
        | ValidationError::ReplayedSignature => StatusCode::UNAUTHORIZED,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            warn!(status = %status.as_u16(), error = %self, "server error");
        } else {
            debug!(status = %status.as_u16(), error = %self, "client error");
        }

        let body = serde_json::json!({
            "title": self.title(),
            "description": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
