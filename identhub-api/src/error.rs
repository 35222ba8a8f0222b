use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use identhub_core::HubError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Hub(#[from] HubError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Hub(e) => hub_status(e),
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Hub(e) => e.code(),
            ApiError::NotFound(_) => "NotFound",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::Internal(_) => "Internal",
        }
    }
}

fn hub_status(err: &HubError) -> StatusCode {
    match err {
        HubError::NotInitialized(_) | HubError::DhtUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        HubError::IdentityNotFound(_) => StatusCode::NOT_FOUND,
        HubError::DirectoryRecordTampered(_) => StatusCode::CONFLICT,
        HubError::MalformedToken(_)
        | HubError::TokenExpired { .. }
        | HubError::SignatureInvalid
        | HubError::UntrustedIssuer(_) => StatusCode::UNAUTHORIZED,
        HubError::SamlDecodeError(_)
        | HubError::Saml(_)
        | HubError::Crypto(_)
        | HubError::Serialization(_) => StatusCode::BAD_REQUEST,
        HubError::Keystore(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }
        (status, Json(json!({ "error": self.to_string(), "code": self.code() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
