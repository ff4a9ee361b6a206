use crate::cache::{self, geocode_memo_key, ResponseMemo};
use crate::constants::{
    GEOCODE_ACCEPT_LANGUAGE, GEOCODE_COUNTRY_CODES, GEOCODE_MEMO_TTL, GEOCODE_MIN_QUERY_CHARS,
    GEOCODE_RESULT_LIMIT, GEOCODE_USER_AGENT, GEOCODE_VIEWBOX_HALF_DEGREES, LOOKUP_REQUEST_TIMEOUT,
    NOMINATIM_BASE_URL,
};
use crate::error::RouteError;
use crate::models::{Coordinate, Place};
use crate::tasks::spawn_best_effort;
use reqwest::header::{ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::sync::Arc;

/// Free-text place search against Nominatim.
#[derive(Clone)]
pub struct GeocodingService {
    client: Client,
    base_url: String,
    memo: Arc<dyn ResponseMemo>,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    display_name: String,
    lat: String,
    lon: String,
    #[serde(rename = "type")]
    #[serde(default)]
    place_type: Option<String>,
}

impl GeocodingService {
    pub fn new(memo: Arc<dyn ResponseMemo>) -> Self {
        Self::with_base_url(NOMINATIM_BASE_URL.to_string(), memo)
    }

    pub fn with_base_url(base_url: String, memo: Arc<dyn ResponseMemo>) -> Self {
        GeocodingService {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            memo,
        }
    }

    /// Searches for places matching `query`, biased towards `near` when given.
    /// Queries shorter than two characters and provider failures both yield an
    /// empty list.
    pub async fn search(&self, query: &str, near: Option<Coordinate>) -> Vec<Place> {
        let query = query.trim();
        if query.chars().count() < GEOCODE_MIN_QUERY_CHARS {
            return Vec::new();
        }

        let key = geocode_memo_key(query, near);
        if let Some(places) = cache::get_json::<Vec<Place>>(self.memo.as_ref(), &key).await {
            return places;
        }

        let mut places = match self.fetch(query, near).await {
            Ok(places) => places,
            Err(e) => {
                tracing::warn!(query, "Geocoding failed: {}", e);
                return Vec::new();
            }
        };

        // The viewbox only biases; if nothing matched inside it, search the
        // whole country once.
        if places.is_empty() && near.is_some() {
            tracing::debug!(query, "No biased geocoding results, retrying unbiased");
            places = match self.fetch(query, None).await {
                Ok(places) => places,
                Err(e) => {
                    tracing::warn!(query, "Unbiased geocoding retry failed: {}", e);
                    return Vec::new();
                }
            };
        }

        let memo = Arc::clone(&self.memo);
        let to_store = places.clone();
        spawn_best_effort("memoize geocode", async move {
            cache::put_json(memo.as_ref(), &key, &to_store, GEOCODE_MEMO_TTL).await
        });

        places
    }

    fn search_url(&self, query: &str, near: Option<Coordinate>) -> String {
        let mut url = format!(
            "{}/search?q={}&format=json&limit={}&countrycodes={}",
            self.base_url,
            urlencoding::encode(query),
            GEOCODE_RESULT_LIMIT,
            GEOCODE_COUNTRY_CODES
        );
        if let Some(c) = near {
            let d = GEOCODE_VIEWBOX_HALF_DEGREES;
            // left,top,right,bottom
            url.push_str(&format!(
                "&viewbox={},{},{},{}&bounded=0",
                c.lng - d,
                c.lat + d,
                c.lng + d,
                c.lat - d
            ));
        }
        url
    }

    fn search_request(&self, query: &str, near: Option<Coordinate>) -> RequestBuilder {
        self.client
            .get(self.search_url(query, near))
            .header(USER_AGENT, GEOCODE_USER_AGENT)
            .header(ACCEPT_LANGUAGE, GEOCODE_ACCEPT_LANGUAGE)
            .timeout(LOOKUP_REQUEST_TIMEOUT)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch(&self, query: &str, near: Option<Coordinate>) -> Result<Vec<Place>, RouteError> {
        let response = self
            .search_request(query, near)
            .send()
            .await
            .map_err(RouteError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(RouteError::Network(format!("HTTP {}", response.status())));
        }

        let body = response.text().await.map_err(RouteError::from_reqwest)?;
        parse_places(&body)
    }
}

fn parse_places(body: &str) -> Result<Vec<Place>, RouteError> {
    let raw: Vec<NominatimPlace> =
        serde_json::from_str(body).map_err(|e| RouteError::Parse(e.to_string()))?;

    Ok(raw
        .into_iter()
        .filter_map(|p| {
            let (lat, lng) = match (p.lat.parse::<f64>(), p.lon.parse::<f64>()) {
                (Ok(lat), Ok(lng)) => (lat, lng),
                _ => {
                    tracing::warn!("Skipping geocoding result with bad coordinates: {}", p.display_name);
                    return None;
                }
            };
            let label = p
                .display_name
                .split(',')
                .next()
                .unwrap_or(&p.display_name)
                .trim()
                .to_string();
            Some(Place {
                label,
                address: p.display_name,
                lat,
                lng,
                kind: p.place_type,
            })
        })
        .collect())
}
