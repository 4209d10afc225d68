use std::sync::Arc;

use grokdoc_maps::{
    directions_url, haversine_km, spherical_distance_m, FacilityRecord, GooglePlacesClient,
    PlacesSearch,
};
use grokdoc_types::LatLng;
use serde::Serialize;

use crate::config::AppConfig;
use crate::CoreResult;

/// A nearby facility with everything the list and map views show.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facility {
    pub record: FacilityRecord,
    /// Haversine distance for the list.
    pub distance_km: f64,
    /// Spherical distance as the map provider computes it.
    pub map_distance_m: f64,
    pub directions_url: String,
}

impl Facility {
    fn from_record(origin: LatLng, record: FacilityRecord) -> Self {
        Self {
            distance_km: haversine_km(origin, record.location),
            map_distance_m: spherical_distance_m(origin, record.location),
            directions_url: directions_url(record.location),
            record,
        }
    }
}

#[derive(Clone)]
pub struct FacilityService {
    places: Arc<dyn PlacesSearch>,
    default_radius_m: u32,
}

impl FacilityService {
    pub fn new(places: Arc<dyn PlacesSearch>, default_radius_m: u32) -> Self {
        Self {
            places,
            default_radius_m,
        }
    }

    pub fn from_config(config: &AppConfig) -> CoreResult<Self> {
        let client = GooglePlacesClient::new(config.google_maps_api_key()?);
        Ok(Self::new(Arc::new(client), config.search_radius_m()))
    }

    pub fn default_radius_m(&self) -> u32 {
        self.default_radius_m
    }

    /// Urgent-care facilities around `origin`, in provider order.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Maps` if the places provider fails.
    pub async fn locate(&self, origin: LatLng, radius_m: Option<u32>) -> CoreResult<Vec<Facility>> {
        let radius_m = radius_m
            .filter(|radius| *radius > 0)
            .unwrap_or(self.default_radius_m);

        let records = self.places.nearby(origin, radius_m).await?;
        tracing::info!(count = records.len(), radius_m, "facilities found");

        Ok(records
            .into_iter()
            .map(|record| Facility::from_record(origin, record))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;
    use grokdoc_maps::StaticPlaces;

    fn record(id: &str, lat: f64, lng: f64) -> FacilityRecord {
        FacilityRecord {
            id: id.into(),
            name: format!("Clinic {id}"),
            location: LatLng::new(lat, lng).unwrap(),
            address: None,
        }
    }

    #[tokio::test]
    async fn facilities_carry_distances_and_directions() {
        let places = StaticPlaces::new(vec![record("a", 51.51, -0.12), record("b", 51.60, -0.10)]);
        let service = FacilityService::new(Arc::new(places), 5000);
        let origin = LatLng::new(51.50, -0.12).unwrap();

        let facilities = service.locate(origin, None).await.unwrap();

        assert_eq!(facilities.len(), 2);
        assert_eq!(facilities[0].record.id, "a");
        assert!((facilities[0].distance_km - 1.11).abs() < 0.01);
        assert!(facilities[0].map_distance_m > facilities[0].distance_km * 1000.0);
        assert_eq!(
            facilities[1].directions_url,
            "https://www.google.com/maps/dir/?api=1&destination=51.6,-0.1"
        );
    }

    #[tokio::test]
    async fn provider_failure_is_reported() {
        let service = FacilityService::new(Arc::new(StaticPlaces::failing("quota")), 5000);
        let origin = LatLng::new(0.0, 0.0).unwrap();

        let err = service.locate(origin, Some(1000)).await.expect_err("should fail");
        assert!(matches!(err, CoreError::Maps(_)));
    }
}
