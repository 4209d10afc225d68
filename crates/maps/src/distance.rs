//! Great-circle distances.
//!
//! The facility list shows haversine kilometres on a 6371 km sphere. Map markers use the same
//! spherical geometry as the map provider (radius 6378137 m). The two disagree by roughly 0.1%
//! and are not reconciled.

use grokdoc_types::LatLng;

/// Mean Earth radius used for list display.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Earth radius used by the map provider's spherical geometry library.
pub const MAP_EARTH_RADIUS_M: f64 = 6_378_137.0;

fn central_angle(from: LatLng, to: LatLng) -> f64 {
    let lat1 = from.lat().to_radians();
    let lat2 = to.lat().to_radians();
    let d_lat = (to.lat() - from.lat()).to_radians();
    let d_lng = (to.lng() - from.lng()).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Haversine distance in kilometres.
pub fn haversine_km(from: LatLng, to: LatLng) -> f64 {
    EARTH_RADIUS_KM * central_angle(from, to)
}

/// Distance in metres as the map provider computes it.
pub fn spherical_distance_m(from: LatLng, to: LatLng) -> f64 {
    MAP_EARTH_RADIUS_M * central_angle(from, to)
}

/// Turn-by-turn directions link for a destination.
pub fn directions_url(destination: LatLng) -> String {
    format!(
        "https://www.google.com/maps/dir/?api=1&destination={},{}",
        destination.lat(),
        destination.lng()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lng: f64) -> LatLng {
        LatLng::new(lat, lng).unwrap()
    }

    #[test]
    fn same_point_is_zero() {
        let p = point(40.0, -74.0);
        assert_eq!(haversine_km(p, p), 0.0);
        assert_eq!(spherical_distance_m(p, p), 0.0);
    }

    #[test]
    fn london_to_paris_is_about_344_km() {
        let london = point(51.5074, -0.1278);
        let paris = point(48.8566, 2.3522);
        let km = haversine_km(london, paris);
        assert!((km - 343.5).abs() < 1.0, "got {km}");
    }

    #[test]
    fn list_and_map_distances_differ_only_slightly() {
        let a = point(37.7749, -122.4194);
        let b = point(37.8044, -122.2712);
        let list_m = haversine_km(a, b) * 1000.0;
        let map_m = spherical_distance_m(a, b);
        let relative = (map_m - list_m).abs() / list_m;
        assert!(relative > 0.0 && relative < 0.01, "relative diff {relative}");
    }

    #[test]
    fn directions_url_embeds_destination() {
        let url = directions_url(point(12.5, -3.25));
        assert_eq!(
            url,
            "https://www.google.com/maps/dir/?api=1&destination=12.5,-3.25"
        );
    }
}
