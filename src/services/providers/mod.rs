pub mod openroute;
pub mod tomtom;

use crate::error::RouteError;
use crate::models::{Coordinate, Route, RoutePreference};
use async_trait::async_trait;
use reqwest::{Response, StatusCode};

pub use openroute::{OpenRouteServiceClient, OrsResponse};
pub use tomtom::{TomTomResponse, TomTomRoutingClient};

/// Parameters shared by every routing provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteQuery {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub preference: RoutePreference,
    /// Ask the provider for alternative routes as well
    pub alternatives: bool,
}

/// Raw provider payload, tagged by origin so normalization never has to guess
/// the shape.
#[derive(Debug, Clone)]
pub enum ProviderResponse {
    OpenRouteService(OrsResponse),
    TomTom(TomTomResponse),
}

impl ProviderResponse {
    /// Maps the payload into canonical routes; the first is the primary route.
    pub fn normalize(self) -> Result<Vec<Route>, RouteError> {
        let routes = match self {
            ProviderResponse::OpenRouteService(response) => response.into_routes()?,
            ProviderResponse::TomTom(response) => response.into_routes()?,
        };
        if routes.is_empty() {
            return Err(RouteError::NoRouteFound);
        }
        Ok(routes)
    }
}

#[async_trait]
pub trait RoutingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_routes(&self, query: &RouteQuery) -> Result<ProviderResponse, RouteError>;
}

/// Turns a non-success HTTP status into the error taxonomy.
/// Returns the response untouched when it succeeded.
pub(crate) async fn check_status(
    provider: &'static str,
    response: Response,
) -> Result<Response, RouteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    tracing::warn!(
        provider,
        status = %status,
        "Routing provider HTTP error {}: {}",
        status,
        error_text
    );

    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => RouteError::RateLimited { retry_after_secs: 0 },
        StatusCode::NOT_FOUND => RouteError::NoRouteFound,
        _ => RouteError::Network(format!("HTTP {}: {}", status, error_text)),
    })
}
