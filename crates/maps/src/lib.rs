//! # GrokDoc Maps
//!
//! Everything the facility finder needs from the outside world:
//! - [`PlacesSearch`]: nearby urgent-care search, with [`GooglePlacesClient`] as the live provider
//! - [`LocationResolver`]: a timed fallback chain of [`Locator`]s (precise coordinates, then an
//!   IP-based estimate)
//! - great-circle distance helpers for list and map display

pub mod distance;
mod errors;
pub mod location;
pub mod places;

pub use distance::{directions_url, haversine_km, spherical_distance_m};
pub use errors::{MapsError, MapsResult};
pub use location::{
    FixedLocator, IpLocator, LocationResolver, LocationSource, Locator, UserLocation,
};
pub use places::{FacilityRecord, GooglePlacesClient, PlacesSearch, StaticPlaces};
