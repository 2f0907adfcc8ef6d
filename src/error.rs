use crate::geocode::GeocodeError;
use crate::location::LocationError;
use crate::prayer::PrayerError;
use crate::store::StoreError;
use crate::validation::ValidationError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Error returned by HTTP handlers, rendered as `{ "error", "code" }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Prayer(#[from] PrayerError),
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<LocationError> for ApiError {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::Validation(e) => ApiError::Validation(e),
            LocationError::Store(e) => ApiError::Store(e),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::Prayer(PrayerError::Validation(_))
            | ApiError::Geocode(GeocodeError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Prayer(PrayerError::Upstream(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Geocode(GeocodeError::MissingUsername) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Geocode(_) => StatusCode::BAD_GATEWAY,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self.status() {
            StatusCode::BAD_REQUEST => "VALIDATION_ERROR",
            StatusCode::BAD_GATEWAY => "UPSTREAM_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Internal error");
            match &self {
                ApiError::Geocode(e) => e.to_string(),
                _ => "An internal error occurred".to_string(),
            }
        } else {
            if status == StatusCode::BAD_GATEWAY {
                tracing::error!(error = %self, "Upstream provider failed");
            }
            self.to_string()
        };

        let body = json!({
            "error": message,
            "code": self.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}
