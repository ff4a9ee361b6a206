use crate::constants::*;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Hazard alerts and driver stats live in PostgreSQL when set; in memory otherwise
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub ors_api_key: String,
    /// Enables the secondary routing provider and live traffic flow
    pub tomtom_api_key: Option<String>,
    pub ors_base_url: String,
    pub tomtom_base_url: String,
    pub nominatim_base_url: String,
    /// Hours east of UTC used by the time-of-day traffic heuristic
    pub local_utc_offset_hours: i8,
    pub coordinator: CoordinatorConfig,
    pub navigation: NavigationConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
    /// Minimum spacing between two network route requests
    pub min_request_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_ROUTE_CACHE_TTL_SECONDS),
            cache_max_entries: DEFAULT_ROUTE_CACHE_MAX_ENTRIES,
            min_request_interval: Duration::from_millis(DEFAULT_MIN_REQUEST_INTERVAL_MS),
        }
    }
}

impl CoordinatorConfig {
    pub fn from_env() -> Result<Self, String> {
        let cache_ttl_secs: u64 = env::var("ROUTE_CACHE_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_ROUTE_CACHE_TTL_SECONDS.to_string())
            .parse()
            .map_err(|_| "Invalid ROUTE_CACHE_TTL_SECS")?;

        let cache_max_entries: usize = env::var("ROUTE_CACHE_MAX_ENTRIES")
            .unwrap_or_else(|_| DEFAULT_ROUTE_CACHE_MAX_ENTRIES.to_string())
            .parse()
            .map_err(|_| "Invalid ROUTE_CACHE_MAX_ENTRIES")?;
        if cache_max_entries == 0 {
            return Err("ROUTE_CACHE_MAX_ENTRIES must be at least 1".to_string());
        }

        let min_request_interval_ms: u64 = env::var("MIN_REQUEST_INTERVAL_MS")
            .unwrap_or_else(|_| DEFAULT_MIN_REQUEST_INTERVAL_MS.to_string())
            .parse()
            .map_err(|_| "Invalid MIN_REQUEST_INTERVAL_MS")?;

        Ok(Self {
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            cache_max_entries,
            min_request_interval: Duration::from_millis(min_request_interval_ms),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavigationConfig {
    /// Distance from the route beyond which the driver counts as off route
    pub off_route_threshold_m: f64,
    pub reroute_throttle: Duration,
    pub proximity_radius_m: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            off_route_threshold_m: DEFAULT_OFF_ROUTE_THRESHOLD_METERS,
            reroute_throttle: Duration::from_secs(DEFAULT_REROUTE_THROTTLE_SECONDS),
            proximity_radius_m: DEFAULT_PROXIMITY_RADIUS_METERS,
        }
    }
}

impl NavigationConfig {
    pub fn from_env() -> Result<Self, String> {
        let off_route_threshold_m: f64 = env::var("OFF_ROUTE_THRESHOLD_M")
            .unwrap_or_else(|_| DEFAULT_OFF_ROUTE_THRESHOLD_METERS.to_string())
            .parse()
            .map_err(|_| "Invalid OFF_ROUTE_THRESHOLD_M")?;
        if off_route_threshold_m <= 0.0 {
            return Err("OFF_ROUTE_THRESHOLD_M must be positive".to_string());
        }

        let reroute_throttle_secs: u64 = env::var("REROUTE_THROTTLE_SECS")
            .unwrap_or_else(|_| DEFAULT_REROUTE_THROTTLE_SECONDS.to_string())
            .parse()
            .map_err(|_| "Invalid REROUTE_THROTTLE_SECS")?;
        if !REROUTE_THROTTLE_RANGE_SECONDS.contains(&reroute_throttle_secs) {
            return Err("REROUTE_THROTTLE_SECS must be between 10 and 15 seconds".to_string());
        }

        let proximity_radius_m: f64 = env::var("PROXIMITY_RADIUS_M")
            .unwrap_or_else(|_| DEFAULT_PROXIMITY_RADIUS_METERS.to_string())
            .parse()
            .map_err(|_| "Invalid PROXIMITY_RADIUS_M")?;
        if !(1.0..=1000.0).contains(&proximity_radius_m) {
            return Err("PROXIMITY_RADIUS_M must be between 1 and 1000 meters".to_string());
        }

        Ok(Self {
            off_route_threshold_m,
            reroute_throttle: Duration::from_secs(reroute_throttle_secs),
            proximity_radius_m,
        })
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();

        let local_utc_offset_hours: i8 = env::var("LOCAL_UTC_OFFSET_HOURS")
            .unwrap_or_else(|_| DEFAULT_LOCAL_UTC_OFFSET_HOURS.to_string())
            .parse()
            .map_err(|_| "Invalid LOCAL_UTC_OFFSET_HOURS")?;
        if !(-12..=14).contains(&local_utc_offset_hours) {
            return Err("LOCAL_UTC_OFFSET_HOURS must be between -12 and 14".to_string());
        }

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| "Invalid PORT")?,
            database_url: non_empty_var("DATABASE_URL"),
            redis_url: non_empty_var("REDIS_URL"),
            ors_api_key: non_empty_var("ORS_API_KEY").ok_or("ORS_API_KEY must be set")?,
            tomtom_api_key: non_empty_var("TOMTOM_API_KEY"),
            ors_base_url: env::var("ORS_BASE_URL")
                .unwrap_or_else(|_| OPENROUTESERVICE_BASE_URL.to_string()),
            tomtom_base_url: env::var("TOMTOM_BASE_URL")
                .unwrap_or_else(|_| TOMTOM_BASE_URL.to_string()),
            nominatim_base_url: env::var("NOMINATIM_BASE_URL")
                .unwrap_or_else(|_| NOMINATIM_BASE_URL.to_string()),
            local_utc_offset_hours,
            coordinator: CoordinatorConfig::from_env()?,
            navigation: NavigationConfig::from_env()?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
