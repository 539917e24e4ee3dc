use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::oauth::{OAuthError, Provider};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("provider not enabled: {0}")]
    ProviderNotEnabled(Provider),

    #[error("missing authorization code")]
    MissingCode,

    #[error("unauthorized")]
    Unauthorized,

    #[error(transparent)]
    OAuth(OAuthError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<OAuthError> for AppError {
    fn from(e: OAuthError) -> Self {
        match e {
            OAuthError::UnknownProvider(name) => AppError::UnknownProvider(name),
            other => AppError::OAuth(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::UnknownProvider(_) => {
                (StatusCode::NOT_FOUND, "UNKNOWN_PROVIDER", self.to_string())
            }
            AppError::ProviderNotEnabled(_) => {
                (StatusCode::NOT_FOUND, "PROVIDER_NOT_ENABLED", self.to_string())
            }
            AppError::MissingCode => (StatusCode::BAD_REQUEST, "MISSING_CODE", self.to_string()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "not signed in".to_string(),
            ),
            AppError::OAuth(e) => {
                error!(error = %e, "oauth provider failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "internal server error".to_string(),
                )
            }
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { code, message })).into_response()
    }
}
