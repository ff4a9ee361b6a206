pub mod geocoding;
pub mod odometer;
pub mod providers;
pub mod route_acquisition;
pub mod traffic;

pub use geocoding::GeocodingService;
pub use providers::{ProviderResponse, RouteQuery, RoutingProvider};
pub use route_acquisition::RouteAcquisitionService;
pub use traffic::{
    LocalClock, TomTomFlowClient, TomTomIncidentClient, TrafficAdjustment, TrafficFlowProvider,
    TrafficIncidentProvider,
};
