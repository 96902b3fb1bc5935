//! HTTP mapping of identity errors.
//!
//! Response bodies carry a fixed error code only. Provider messages, token
//! contents and store details stay in the logs.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cadence_identity_core::IdentityError;
use serde_json::json;
use tracing::{debug, error, warn};

#[derive(Debug)]
pub struct ApiError(pub IdentityError);

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            err if err.is_rejection() => StatusCode::UNAUTHORIZED,
            IdentityError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self.status() {
            StatusCode::UNAUTHORIZED => "unauthorized",
            StatusCode::SERVICE_UNAVAILABLE => "provider_unavailable",
            _ => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self.0 {
            IdentityError::UnauthenticatedAccess => debug!("Unauthenticated request"),
            err if err.is_rejection() => warn!(error = %err, "Authentication rejected"),
            err => error!(error = %err, "Identity service failure"),
        }

        (status, Json(json!({ "error": self.code() }))).into_response()
    }
}
