use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use contracts::shared::api_response::ApiResponse;
use thiserror::Error;

/// Ошибки сценария импорта, отображаемые в HTTP-статусы
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    /// A confirm for this upload is already running
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ImportError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        ImportError::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ImportError::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ImportError::Forbidden(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ImportError::NotFound(_) => StatusCode::NOT_FOUND,
            ImportError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ImportError::Forbidden(_) => StatusCode::FORBIDDEN,
            ImportError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ImportError::Conflict(_) => StatusCode::CONFLICT,
            ImportError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ImportError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ImportError::Internal(err) => {
                tracing::error!("Import request failed: {:#}", err);
                format!("Import failed: {}", err)
            }
            other => other.to_string(),
        };
        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ImportError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ImportError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ImportError::Conflict("busy".into()).status_code(),
            StatusCode::CONFLICT
        );
        let internal: ImportError = anyhow::anyhow!("db down").into();
        assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_message_is_plain() {
        let err = ImportError::bad_request("Import session is not ready.");
        assert_eq!(err.to_string(), "Import session is not ready.");
    }
}
