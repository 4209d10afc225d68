//! Nearby urgent-care search.

use grokdoc_types::LatLng;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{MapsError, MapsResult};

/// Keyword filter applied to every nearby search.
pub const FACILITY_KEYWORD: &str = "urgent care";

/// Place category applied to every nearby search.
pub const FACILITY_TYPE: &str = "hospital";

const GOOGLE_PLACES_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";

/// A place supplied by the places provider. Read-only to GrokDoc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityRecord {
    pub id: String,
    pub name: String,
    pub location: LatLng,
    pub address: Option<String>,
}

#[async_trait::async_trait]
pub trait PlacesSearch: Send + Sync {
    /// Urgent-care facilities within `radius_m` metres of `center`, in provider order.
    async fn nearby(&self, center: LatLng, radius_m: u32) -> MapsResult<Vec<FacilityRecord>>;
}

/// Google Places "nearby search" client.
pub struct GooglePlacesClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl GooglePlacesClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, GOOGLE_PLACES_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl PlacesSearch for GooglePlacesClient {
    async fn nearby(&self, center: LatLng, radius_m: u32) -> MapsResult<Vec<FacilityRecord>> {
        let url = format!("{}/nearbysearch/json", self.base_url);
        let location = center.to_string();
        let radius = radius_m.to_string();

        tracing::debug!(%location, radius_m, "places nearby search");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("location", location.as_str()),
                ("radius", radius.as_str()),
                ("type", FACILITY_TYPE),
                ("keyword", FACILITY_KEYWORD),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MapsError::StatusCode(
                status,
                response.text().await.unwrap_or_default(),
            ));
        }

        let body: NearbySearchResponse = response.json().await?;
        parse_nearby_response(body)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct NearbySearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    place_id: String,
    name: String,
    #[serde(default)]
    vicinity: Option<String>,
    #[serde(default)]
    formatted_address: Option<String>,
    geometry: PlaceGeometry,
}

#[derive(Debug, Deserialize)]
struct PlaceGeometry {
    location: PlaceLocation,
}

#[derive(Debug, Deserialize)]
struct PlaceLocation {
    lat: f64,
    lng: f64,
}

pub(crate) fn parse_nearby_response(body: NearbySearchResponse) -> MapsResult<Vec<FacilityRecord>> {
    match body.status.as_str() {
        "OK" | "ZERO_RESULTS" => {}
        _ => {
            return Err(MapsError::Provider {
                message: body.error_message.unwrap_or_default(),
                status: body.status,
            })
        }
    }

    let facilities = body
        .results
        .into_iter()
        .filter_map(|place| {
            match LatLng::new(place.geometry.location.lat, place.geometry.location.lng) {
                Ok(location) => Some(FacilityRecord {
                    id: place.place_id,
                    name: place.name,
                    location,
                    address: place.vicinity.or(place.formatted_address),
                }),
                Err(e) => {
                    tracing::warn!("skipping place {} with bad coordinates: {}", place.place_id, e);
                    None
                }
            }
        })
        .collect();

    Ok(facilities)
}

/// Fixed in-memory places provider for tests and offline runs.
pub struct StaticPlaces {
    result: Result<Vec<FacilityRecord>, String>,
}

impl StaticPlaces {
    pub fn new(facilities: Vec<FacilityRecord>) -> Self {
        Self {
            result: Ok(facilities),
        }
    }

    /// A provider whose every search fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            result: Err(message.into()),
        }
    }
}

#[async_trait::async_trait]
impl PlacesSearch for StaticPlaces {
    async fn nearby(&self, _center: LatLng, _radius_m: u32) -> MapsResult<Vec<FacilityRecord>> {
        match &self.result {
            Ok(facilities) => Ok(facilities.clone()),
            Err(message) => Err(MapsError::Provider {
                status: "UNAVAILABLE".into(),
                message: message.clone(),
            }),
        }
    }
}
