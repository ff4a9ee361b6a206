use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures of route acquisition. Cloneable so one shared in-flight request
/// can hand the same outcome to every waiter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouteError {
    #[error("Rate limited by routing provider, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("No route found between these locations")]
    NoRouteFound,

    #[error("Provider response could not be parsed: {0}")]
    Parse(String),

    #[error("Provider did not answer in time")]
    Timeout,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl RouteError {
    /// Stable machine-readable code for the UI layer.
    pub fn code(&self) -> &'static str {
        match self {
            RouteError::RateLimited { .. } => "RATE_LIMITED",
            RouteError::NoRouteFound => "NO_ROUTE_FOUND",
            RouteError::Parse(_) => "PARSE_ERROR",
            RouteError::Timeout => "TIMEOUT",
            RouteError::InvalidInput(_) => "INVALID_INPUT",
            RouteError::Network(_) => "NETWORK_ERROR",
        }
    }

    /// Whether the UI should offer an explicit retry affordance.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RouteError::RateLimited { .. } | RouteError::Timeout | RouteError::Network(_)
        )
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            RouteError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RouteError::Timeout
        } else if e.is_decode() {
            RouteError::Parse(e.to_string())
        } else {
            RouteError::Network(e.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

// Convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, retryable, retry_after) = match self {
            AppError::Route(ref e) => {
                let status = match e {
                    RouteError::RateLimited { .. } => {
                        tracing::warn!("Route request rate limited: {}", e);
                        StatusCode::TOO_MANY_REQUESTS
                    }
                    RouteError::NoRouteFound => {
                        tracing::info!("No route found");
                        StatusCode::NOT_FOUND
                    }
                    RouteError::Parse(_) => {
                        tracing::error!("Routing provider parse error: {}", e);
                        StatusCode::BAD_GATEWAY
                    }
                    RouteError::Timeout => {
                        tracing::warn!("Routing provider timeout");
                        StatusCode::GATEWAY_TIMEOUT
                    }
                    RouteError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                    RouteError::Network(_) => {
                        tracing::warn!("Routing provider network error: {}", e);
                        StatusCode::BAD_GATEWAY
                    }
                };
                (
                    status,
                    e.code(),
                    e.to_string(),
                    e.is_retryable(),
                    e.retry_after_secs(),
                )
            }
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Internal database error".to_string(),
                    false,
                    None,
                )
            }
            AppError::Cache(ref e) => {
                tracing::warn!("Cache error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CACHE_ERROR",
                    "Cache error".to_string(),
                    false,
                    None,
                )
            }
            AppError::InvalidRequest(e) => {
                (StatusCode::BAD_REQUEST, "INVALID_INPUT", e, false, None)
            }
            AppError::NotFound(e) => (StatusCode::NOT_FOUND, "NOT_FOUND", e, false, None),
            AppError::Unavailable(e) => {
                (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", e, false, None)
            }
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                    false,
                    None,
                )
            }
        };

        let mut body = json!({
            "error": status.canonical_reason().unwrap_or("Unknown error"),
            "code": code,
            "message": message,
            "retryable": retryable,
        });
        if let Some(secs) = retry_after {
            body["retry_after_secs"] = json!(secs);
        }

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_error_codes() {
        assert_eq!(
            RouteError::RateLimited { retry_after_secs: 2 }.code(),
            "RATE_LIMITED"
        );
        assert_eq!(RouteError::NoRouteFound.code(), "NO_ROUTE_FOUND");
        assert_eq!(RouteError::Parse("x".into()).code(), "PARSE_ERROR");
        assert_eq!(RouteError::Timeout.code(), "TIMEOUT");
        assert_eq!(RouteError::InvalidInput("x".into()).code(), "INVALID_INPUT");
        assert_eq!(RouteError::Network("x".into()).code(), "NETWORK_ERROR");
    }

    #[test]
    fn test_retry_affordance() {
        assert!(RouteError::Timeout.is_retryable());
        assert!(RouteError::Network("reset".into()).is_retryable());
        assert!(!RouteError::NoRouteFound.is_retryable());
        assert!(!RouteError::InvalidInput("lat".into()).is_retryable());
    }

    #[test]
    fn test_rate_limited_maps_to_429() {
        let response =
            AppError::from(RouteError::RateLimited { retry_after_secs: 5 }).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_invalid_input_maps_to_400() {
        let response = AppError::from(RouteError::InvalidInput("lat".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
