use crate::cache::{self, flow_memo_key, incident_memo_key, ResponseMemo};
use crate::constants::{
    AUX_TRAFFIC_TIMEOUT, FLOW_MEMO_TTL, INCIDENT_BBOX_DECIMALS, INCIDENT_LANGUAGE,
    INCIDENT_MEMO_TTL, LOOKUP_REQUEST_TIMEOUT, TOMTOM_BASE_URL, TRAFFIC_DAYTIME_MULTIPLIER,
    TRAFFIC_MIN_CURRENT_SPEED_KMH, TRAFFIC_RUSH_HOUR_MULTIPLIER,
};
use crate::error::RouteError;
use crate::models::{BoundingBox, Coordinate, FlowSample, IncidentCategory, TrafficIncident};
use crate::tasks::spawn_best_effort;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use time::{OffsetDateTime, UtcOffset};

/// Source of live traffic speed readings.
#[async_trait]
pub trait TrafficFlowProvider: Send + Sync {
    /// `Ok(None)` when the provider has no data for this point.
    async fn flow_at(&self, point: Coordinate) -> Result<Option<FlowSample>, RouteError>;
}

/// How a route's duration was adjusted for traffic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrafficAdjustment {
    /// Traffic not requested
    None,
    Live { multiplier: f64 },
    TimeOfDay { multiplier: f64, hour: u8 },
}

impl TrafficAdjustment {
    pub fn from_flow(sample: &FlowSample) -> Self {
        TrafficAdjustment::Live {
            multiplier: live_multiplier(sample),
        }
    }

    pub fn from_hour(hour: u8) -> Self {
        TrafficAdjustment::TimeOfDay {
            multiplier: time_of_day_multiplier(hour),
            hour,
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            TrafficAdjustment::None => 1.0,
            TrafficAdjustment::Live { multiplier } => *multiplier,
            TrafficAdjustment::TimeOfDay { multiplier, .. } => *multiplier,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, TrafficAdjustment::Live { .. })
    }
}

/// `free_flow / max(current, 10)`, never below 1.0. The upper clamp is applied
/// when the route is adjusted.
pub fn live_multiplier(sample: &FlowSample) -> f64 {
    let current = sample.current_speed_kmh.max(TRAFFIC_MIN_CURRENT_SPEED_KMH);
    (sample.free_flow_speed_kmh / current).max(1.0)
}

pub fn time_of_day_multiplier(hour: u8) -> f64 {
    match hour {
        7..=9 | 17..=19 => TRAFFIC_RUSH_HOUR_MULTIPLIER,
        10..=16 => TRAFFIC_DAYTIME_MULTIPLIER,
        _ => 1.0,
    }
}

/// Where the heuristic reads the local hour from.
#[derive(Debug, Clone, Copy)]
pub enum LocalClock {
    System(UtcOffset),
    /// Pinned hour, for tests
    Fixed(u8),
}

impl LocalClock {
    pub fn from_offset_hours(hours: i8) -> Self {
        let offset = UtcOffset::from_hms(hours, 0, 0).unwrap_or(UtcOffset::UTC);
        LocalClock::System(offset)
    }

    pub fn hour(&self) -> u8 {
        match self {
            LocalClock::System(offset) => OffsetDateTime::now_utc().to_offset(*offset).hour(),
            LocalClock::Fixed(hour) => *hour,
        }
    }
}

/// TomTom flow-segment client with a short-lived memo in front of it.
pub struct TomTomFlowClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
    memo: Option<Arc<dyn ResponseMemo>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowEnvelope {
    flow_segment_data: FlowSegmentData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowSegmentData {
    current_speed: f64,
    free_flow_speed: f64,
    #[serde(default = "full_confidence")]
    confidence: f64,
}

fn full_confidence() -> f64 {
    1.0
}

impl TomTomFlowClient {
    pub fn new(api_key: String, memo: Option<Arc<dyn ResponseMemo>>) -> Self {
        Self::with_base_url(api_key, TOMTOM_BASE_URL.to_string(), memo)
    }

    pub fn with_base_url(
        api_key: String,
        base_url: String,
        memo: Option<Arc<dyn ResponseMemo>>,
    ) -> Self {
        TomTomFlowClient {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: AUX_TRAFFIC_TIMEOUT,
            memo,
        }
    }

    async fn fetch(&self, point: Coordinate) -> Result<Option<FlowSample>, RouteError> {
        let url = format!(
            "{}/traffic/services/4/flowSegmentData/absolute/10/json",
            self.base_url
        );
        let response = self
            .client
            .get(&url)
            .query(&[
                ("point", format!("{},{}", point.lat, point.lng)),
                ("unit", "KMPH".to_string()),
                ("key", self.api_key.clone()),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(RouteError::from_reqwest)?;

        match response.status() {
            // No road segment near the point
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(RouteError::RateLimited { retry_after_secs: 0 })
            }
            s if !s.is_success() => return Err(RouteError::Network(format!("HTTP {}", s))),
            _ => {}
        }

        let envelope: FlowEnvelope = response.json().await.map_err(RouteError::from_reqwest)?;
        let data = envelope.flow_segment_data;
        Ok(Some(FlowSample {
            current_speed_kmh: data.current_speed,
            free_flow_speed_kmh: data.free_flow_speed,
            confidence: data.confidence,
        }))
    }
}

#[async_trait]
impl TrafficFlowProvider for TomTomFlowClient {
    #[tracing::instrument(skip(self))]
    async fn flow_at(&self, point: Coordinate) -> Result<Option<FlowSample>, RouteError> {
        let key = flow_memo_key(point);
        if let Some(memo) = &self.memo {
            if let Some(sample) = cache::get_json::<FlowSample>(memo.as_ref(), &key).await {
                return Ok(Some(sample));
            }
        }

        let sample = self.fetch(point).await?;

        if let (Some(memo), Some(sample)) = (&self.memo, sample) {
            let memo = Arc::clone(memo);
            spawn_best_effort("memoize traffic flow", async move {
                cache::put_json(memo.as_ref(), &key, &sample, FLOW_MEMO_TTL).await
            });
        }

        tracing::debug!(
            current = sample.map(|s| s.current_speed_kmh),
            free_flow = sample.map(|s| s.free_flow_speed_kmh),
            "Traffic flow sample"
        );
        Ok(sample)
    }
}

/// Source of road incidents inside a bounding box.
#[async_trait]
pub trait TrafficIncidentProvider: Send + Sync {
    async fn incidents_in(&self, bbox: BoundingBox) -> Result<Vec<TrafficIncident>, RouteError>;
}

const INCIDENT_FIELDS: &str = "{incidents{type,geometry{type,coordinates},properties{id,iconCategory,magnitudeOfDelay,events{description,code},startTime,endTime}}}";

/// TomTom incident-details client. Boxes are grown to two decimals before the
/// lookup so nearby map views share memo entries.
pub struct TomTomIncidentClient {
    client: Client,
    api_key: String,
    base_url: String,
    memo: Option<Arc<dyn ResponseMemo>>,
}

impl TomTomIncidentClient {
    pub fn new(api_key: String, memo: Option<Arc<dyn ResponseMemo>>) -> Self {
        Self::with_base_url(api_key, TOMTOM_BASE_URL.to_string(), memo)
    }

    pub fn with_base_url(
        api_key: String,
        base_url: String,
        memo: Option<Arc<dyn ResponseMemo>>,
    ) -> Self {
        TomTomIncidentClient {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            memo,
        }
    }

    async fn fetch(&self, bbox: BoundingBox) -> Result<Vec<TrafficIncident>, RouteError> {
        let url = format!("{}/traffic/services/5/incidentDetails", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("bbox", bbox.to_lng_lat_string().as_str()),
                ("fields", INCIDENT_FIELDS),
                ("language", INCIDENT_LANGUAGE),
            ])
            .timeout(LOOKUP_REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(RouteError::from_reqwest)?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(RouteError::RateLimited { retry_after_secs: 0 })
            }
            s if !s.is_success() => return Err(RouteError::Network(format!("HTTP {}", s))),
            _ => {}
        }

        let body = response.text().await.map_err(RouteError::from_reqwest)?;
        parse_incidents(&body)
    }
}

#[async_trait]
impl TrafficIncidentProvider for TomTomIncidentClient {
    #[tracing::instrument(skip(self))]
    async fn incidents_in(&self, bbox: BoundingBox) -> Result<Vec<TrafficIncident>, RouteError> {
        let bbox = bbox.rounded_out(INCIDENT_BBOX_DECIMALS);
        let key = incident_memo_key(&bbox);
        if let Some(memo) = &self.memo {
            if let Some(incidents) = cache::get_json::<Vec<TrafficIncident>>(memo.as_ref(), &key).await {
                return Ok(incidents);
            }
        }

        let incidents = self.fetch(bbox).await?;
        tracing::debug!(count = incidents.len(), "Traffic incidents loaded");

        if let Some(memo) = &self.memo {
            let memo = Arc::clone(memo);
            let to_store = incidents.clone();
            spawn_best_effort("memoize traffic incidents", async move {
                cache::put_json(memo.as_ref(), &key, &to_store, INCIDENT_MEMO_TTL).await
            });
        }
        Ok(incidents)
    }
}

#[derive(Debug, Deserialize)]
struct IncidentEnvelope {
    #[serde(default)]
    incidents: Vec<RawIncident>,
}

#[derive(Debug, Deserialize)]
struct RawIncident {
    #[serde(default)]
    geometry: Option<geojson::Geometry>,
    #[serde(default)]
    properties: RawIncidentProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIncidentProperties {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    icon_category: u8,
    #[serde(default)]
    magnitude_of_delay: u8,
    #[serde(default)]
    events: Vec<RawIncidentEvent>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawIncidentEvent {
    #[serde(default)]
    description: String,
}

/// First position of a Point or LineString geometry.
fn incident_location(geometry: &geojson::Geometry) -> Option<Coordinate> {
    let position = match &geometry.value {
        geojson::Value::Point(p) => p.as_slice(),
        geojson::Value::LineString(points) => points.first()?.as_slice(),
        _ => return None,
    };
    match position {
        [lng, lat, ..] => Coordinate::new(*lat, *lng).ok(),
        _ => None,
    }
}

/// Normalizes an incident-details body. Incidents without a usable location
/// are dropped.
pub fn parse_incidents(body: &str) -> Result<Vec<TrafficIncident>, RouteError> {
    let envelope: IncidentEnvelope =
        serde_json::from_str(body).map_err(|e| RouteError::Parse(e.to_string()))?;

    Ok(envelope
        .incidents
        .into_iter()
        .filter_map(|raw| {
            let location = raw.geometry.as_ref().and_then(incident_location)?;
            let props = raw.properties;
            let description = props
                .events
                .into_iter()
                .map(|e| e.description)
                .find(|d| !d.is_empty())
                .unwrap_or_else(|| "Incident".to_string());

            Some(TrafficIncident {
                id: props
                    .id
                    .unwrap_or_else(|| format!("{}-{}", location.lat, location.lng)),
                lat: location.lat,
                lng: location.lng,
                category: IncidentCategory::from_icon_category(props.icon_category),
                description,
                severity: props.magnitude_of_delay,
                start_time: props.start_time,
                end_time: props.end_time,
            })
        })
        .collect())
}
