//! User location acquisition.
//!
//! A [`LocationResolver`] walks a chain of [`Locator`]s, giving each a fixed short timeout, and
//! returns the first fix. The usual chain is precise device coordinates followed by an IP-based
//! estimate. The resolved [`UserLocation`] is captured once per session and not refreshed.

use std::time::Duration;

use grokdoc_types::LatLng;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{MapsError, MapsResult};

/// Default per-locator timeout.
pub const DEFAULT_LOCATE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Accuracy reported for IP-based estimates, in metres. City-level at best.
pub const IP_ESTIMATE_ACCURACY_M: f64 = 25_000.0;

const IPAPI_URL: &str = "https://ipapi.co/json/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Precise,
    IpEstimate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub position: LatLng,
    /// Radius of uncertainty in metres, when known.
    pub accuracy_m: Option<f64>,
    pub source: LocationSource,
}

#[async_trait::async_trait]
pub trait Locator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn locate(&self) -> MapsResult<UserLocation>;
}

/// Coordinates already known to the client (device GPS, browser geolocation, CLI flags).
pub struct FixedLocator {
    location: UserLocation,
}

impl FixedLocator {
    pub fn precise(lat: f64, lng: f64, accuracy_m: Option<f64>) -> MapsResult<Self> {
        Ok(Self {
            location: UserLocation {
                position: LatLng::new(lat, lng)?,
                accuracy_m,
                source: LocationSource::Precise,
            },
        })
    }
}

#[async_trait::async_trait]
impl Locator for FixedLocator {
    fn name(&self) -> &'static str {
        "precise"
    }

    async fn locate(&self) -> MapsResult<UserLocation> {
        Ok(self.location)
    }
}

/// Coarse location from the caller's public IP address.
pub struct IpLocator {
    url: String,
    client: Client,
}

impl Default for IpLocator {
    fn default() -> Self {
        Self::new(IPAPI_URL)
    }
}

impl IpLocator {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[async_trait::async_trait]
impl Locator for IpLocator {
    fn name(&self) -> &'static str {
        "ip"
    }

    async fn locate(&self) -> MapsResult<UserLocation> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MapsError::StatusCode(
                status,
                response.text().await.unwrap_or_default(),
            ));
        }

        let body: IpLookupResponse = response.json().await?;
        match (body.latitude, body.longitude) {
            (Some(lat), Some(lng)) => Ok(UserLocation {
                position: LatLng::new(lat, lng)?,
                accuracy_m: Some(IP_ESTIMATE_ACCURACY_M),
                source: LocationSource::IpEstimate,
            }),
            _ => Err(MapsError::LocationUnavailable),
        }
    }
}

/// Ordered fallback chain of locators.
pub struct LocationResolver {
    chain: Vec<Box<dyn Locator>>,
    timeout: Duration,
}

impl LocationResolver {
    pub fn new(timeout: Duration) -> Self {
        Self {
            chain: Vec::new(),
            timeout,
        }
    }

    #[must_use]
    pub fn then(mut self, locator: impl Locator + 'static) -> Self {
        self.chain.push(Box::new(locator));
        self
    }

    /// First successful fix along the chain.
    ///
    /// # Errors
    ///
    /// Returns `MapsError::LocationUnavailable` once every locator has failed or timed out.
    pub async fn resolve(&self) -> MapsResult<UserLocation> {
        for locator in &self.chain {
            match tokio::time::timeout(self.timeout, locator.locate()).await {
                Ok(Ok(location)) => {
                    tracing::info!("location resolved via {}", locator.name());
                    return Ok(location);
                }
                Ok(Err(e)) => {
                    tracing::warn!("locator {} failed: {}", locator.name(), e);
                }
                Err(_) => {
                    tracing::warn!(
                        "locator {} timed out after {:?}",
                        locator.name(),
                        self.timeout
                    );
                }
            }
        }

        Err(MapsError::LocationUnavailable)
    }
}

impl Default for LocationResolver {
    fn default() -> Self {
        Self::new(DEFAULT_LOCATE_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingLocator;

    #[async_trait::async_trait]
    impl Locator for FailingLocator {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn locate(&self) -> MapsResult<UserLocation> {
            Err(MapsError::LocationUnavailable)
        }
    }

    struct SlowLocator;

    #[async_trait::async_trait]
    impl Locator for SlowLocator {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn locate(&self) -> MapsResult<UserLocation> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            FixedLocator::precise(0.0, 0.0, None)?.locate().await
        }
    }

    #[tokio::test]
    async fn first_successful_locator_wins() {
        let resolver = LocationResolver::new(Duration::from_millis(200))
            .then(FixedLocator::precise(40.7, -74.0, Some(12.0)).unwrap())
            .then(FailingLocator);

        let location = resolver.resolve().await.unwrap();
        assert_eq!(location.source, LocationSource::Precise);
        assert_eq!(location.accuracy_m, Some(12.0));
    }

    #[tokio::test]
    async fn failures_and_timeouts_fall_through() {
        let resolver = LocationResolver::new(Duration::from_millis(20))
            .then(FailingLocator)
            .then(SlowLocator)
            .then(FixedLocator::precise(1.0, 2.0, None).unwrap());

        let location = resolver.resolve().await.unwrap();
        assert_eq!(location.position, LatLng::new(1.0, 2.0).unwrap());
    }

    #[tokio::test]
    async fn exhausted_chain_reports_unavailable() {
        let resolver = LocationResolver::new(Duration::from_millis(20))
            .then(FailingLocator)
            .then(SlowLocator);

        let err = resolver.resolve().await.expect_err("no locator succeeds");
        assert!(matches!(err, MapsError::LocationUnavailable));
        assert_eq!(err.to_string(), "could not determine location");
    }

    #[test]
    fn precise_locator_rejects_bad_coordinates() {
        assert!(matches!(
            FixedLocator::precise(-95.0, 0.0, None),
            Err(MapsError::InvalidCoordinates(_))
        ));
    }
}
