use crate::constants::AUX_TRAFFIC_TIMEOUT;
use crate::error::RouteError;
use crate::models::{ProviderChoice, Route};
use crate::services::providers::{RouteQuery, RoutingProvider};
use crate::services::traffic::{LocalClock, TrafficAdjustment, TrafficFlowProvider};
use std::sync::Arc;

/// Fetches routes from exactly one provider per call, normalizes them and
/// applies one traffic adjustment. Never retries; gating lives in the
/// coordinator.
pub struct RouteAcquisitionService {
    primary: Arc<dyn RoutingProvider>,
    secondary: Option<Arc<dyn RoutingProvider>>,
    traffic: Option<Arc<dyn TrafficFlowProvider>>,
    clock: LocalClock,
}

impl RouteAcquisitionService {
    pub fn new(
        primary: Arc<dyn RoutingProvider>,
        secondary: Option<Arc<dyn RoutingProvider>>,
        traffic: Option<Arc<dyn TrafficFlowProvider>>,
        clock: LocalClock,
    ) -> Self {
        RouteAcquisitionService {
            primary,
            secondary,
            traffic,
            clock,
        }
    }

    pub async fn acquire(
        &self,
        query: &RouteQuery,
        include_traffic: bool,
        provider: ProviderChoice,
    ) -> Result<Vec<Route>, RouteError> {
        query
            .origin
            .validate()
            .map_err(|e| RouteError::InvalidInput(format!("origin: {}", e)))?;
        query
            .destination
            .validate()
            .map_err(|e| RouteError::InvalidInput(format!("destination: {}", e)))?;

        let provider = match provider {
            ProviderChoice::Primary => &self.primary,
            ProviderChoice::Secondary => self.secondary.as_ref().ok_or_else(|| {
                RouteError::InvalidInput("secondary routing provider is not configured".to_string())
            })?,
        };

        tracing::info!(
            provider = provider.name(),
            origin_lat = query.origin.lat,
            origin_lng = query.origin.lng,
            destination_lat = query.destination.lat,
            destination_lng = query.destination.lng,
            preference = %query.preference,
            "Acquiring routes"
        );

        let routes = provider.fetch_routes(query).await?.normalize()?;

        let adjustment = if include_traffic {
            self.traffic_adjustment(query).await
        } else {
            TrafficAdjustment::None
        };

        tracing::info!(
            provider = provider.name(),
            routes = routes.len(),
            multiplier = adjustment.multiplier(),
            live_traffic = adjustment.is_live(),
            "Routes acquired"
        );

        Ok(routes
            .into_iter()
            .map(|route| route.with_traffic(adjustment.multiplier(), adjustment.is_live()))
            .collect())
    }

    /// Live flow at the origin when available, otherwise the time-of-day
    /// heuristic.
    async fn traffic_adjustment(&self, query: &RouteQuery) -> TrafficAdjustment {
        if let Some(traffic) = &self.traffic {
            match tokio::time::timeout(AUX_TRAFFIC_TIMEOUT, traffic.flow_at(query.origin)).await {
                Ok(Ok(Some(sample))) => return TrafficAdjustment::from_flow(&sample),
                Ok(Ok(None)) => tracing::debug!("No traffic flow data at origin"),
                Ok(Err(e)) => tracing::warn!("Traffic flow lookup failed: {}", e),
                Err(_) => tracing::warn!("Traffic flow lookup timed out"),
            }
        }
        TrafficAdjustment::from_hour(self.clock.hour())
    }
}
