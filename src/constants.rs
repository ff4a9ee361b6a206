//! Stable application-wide constants.
//!
//! Values here are protocol limits, algorithm coefficients, and default
//! fallbacks for env-var-based configuration. Tunables that operators adjust
//! at runtime live in [`Config`](crate::config::Config) instead.

use std::time::Duration;

// --- Server defaults (used when HOST / PORT env vars are absent) ---

/// Default bind address for the HTTP server.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default port for the HTTP server.
pub const DEFAULT_PORT: &str = "3000";

// --- Provider endpoints ---

pub const OPENROUTESERVICE_BASE_URL: &str = "https://api.openrouteservice.org";
pub const TOMTOM_BASE_URL: &str = "https://api.tomtom.com";
pub const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";

// --- Request budgets ---

/// Budget for a single routing call.
pub const ROUTE_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Budget for traffic-flow, incident and geocoding calls.
pub const LOOKUP_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
/// Budget for the flow sample taken while acquiring a route. The route call
/// follows it, so this stays short.
pub const AUX_TRAFFIC_TIMEOUT: Duration = Duration::from_secs(3);

// --- Client-side route cache + request gate ---

/// Route cache TTL: 3 minutes. Overridden by `ROUTE_CACHE_TTL_SECS`.
pub const DEFAULT_ROUTE_CACHE_TTL_SECONDS: u64 = 180;
/// FIFO capacity of the route cache. Overridden by `ROUTE_CACHE_MAX_ENTRIES`.
pub const DEFAULT_ROUTE_CACHE_MAX_ENTRIES: usize = 50;
/// Minimum spacing between two route requests that reach the network.
pub const DEFAULT_MIN_REQUEST_INTERVAL_MS: u64 = 1_200;
/// Cache key coordinate precision: 4 decimals, roughly 11 m.
pub const CACHE_KEY_DECIMALS: usize = 4;

/// Backoff after the first consecutive 429.
pub const BACKOFF_TIER_1: Duration = Duration::from_secs(2);
/// Backoff after the second consecutive 429.
pub const BACKOFF_TIER_2: Duration = Duration::from_secs(5);
/// Backoff after the third and every later consecutive 429.
pub const BACKOFF_TIER_3: Duration = Duration::from_secs(15);

// --- Navigation ---

/// Distance from the nearest polyline vertex beyond which the driver is off route.
pub const DEFAULT_OFF_ROUTE_THRESHOLD_METERS: f64 = 60.0;
/// Minimum spacing between two reroute attempts. Overridden by `REROUTE_THROTTLE_SECS`.
pub const DEFAULT_REROUTE_THROTTLE_SECONDS: u64 = 10;
/// Accepted range for `REROUTE_THROTTLE_SECS`.
pub const REROUTE_THROTTLE_RANGE_SECONDS: std::ops::RangeInclusive<u64> = 10..=15;
/// Hazard prompt radius. Overridden by `PROXIMITY_RADIUS_M` (validated 1..=1000).
pub const DEFAULT_PROXIMITY_RADIUS_METERS: f64 = 100.0;

// --- Traffic adjustment ---

/// Floor applied to the live current speed before dividing (km/h).
pub const TRAFFIC_MIN_CURRENT_SPEED_KMH: f64 = 10.0;
/// Upper clamp for any traffic multiplier.
pub const TRAFFIC_MAX_MULTIPLIER: f64 = 2.5;
/// Heuristic multiplier during the morning and evening rush (07-09, 17-19).
pub const TRAFFIC_RUSH_HOUR_MULTIPLIER: f64 = 1.3;
/// Heuristic multiplier during daytime (10-16).
pub const TRAFFIC_DAYTIME_MULTIPLIER: f64 = 1.1;
/// Default local UTC offset (hours) for the time-of-day heuristic (CET).
pub const DEFAULT_LOCAL_UTC_OFFSET_HOURS: i8 = 1;

// --- Server-side memo TTLs ---

/// Geocoding results memo.
pub const GEOCODE_MEMO_TTL: Duration = Duration::from_secs(300);
/// Traffic-flow samples memo.
pub const FLOW_MEMO_TTL: Duration = Duration::from_secs(60);
/// Traffic-incident lists memo.
pub const INCIDENT_MEMO_TTL: Duration = Duration::from_secs(60);
/// Upper bound on entries held by the in-memory memo.
pub const DEFAULT_MEMO_MAX_ENTRIES: u64 = 1_000;

// --- Traffic incidents ---

/// Incident boxes are grown outwards to this many decimals before lookup.
pub const INCIDENT_BBOX_DECIMALS: i32 = 2;
pub const INCIDENT_LANGUAGE: &str = "nl-NL";

// --- Geocoding ---

/// Queries shorter than this are answered with an empty list.
pub const GEOCODE_MIN_QUERY_CHARS: usize = 2;
pub const GEOCODE_RESULT_LIMIT: usize = 10;
pub const GEOCODE_COUNTRY_CODES: &str = "nl";
/// Half-width, in degrees, of the viewbox biasing results towards the user.
pub const GEOCODE_VIEWBOX_HALF_DEGREES: f64 = 1.0;
pub const GEOCODE_USER_AGENT: &str = "roadwatch/0.1";
/// Result labels come back in Dutch, matching `GEOCODE_COUNTRY_CODES`.
pub const GEOCODE_ACCEPT_LANGUAGE: &str = "nl";

// --- Driven distance bookkeeping ---

/// Position deltas at or below this (km) are GPS jitter and not recorded.
pub const ODOMETER_MIN_DELTA_KM: f64 = 0.005;
/// Position deltas at or above this (km) are jumps and not recorded.
pub const ODOMETER_MAX_DELTA_KM: f64 = 1.0;
