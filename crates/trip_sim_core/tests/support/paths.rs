use trip_sim_core::geo::GeoPoint;
use trip_sim_core::spatial::EARTH_RADIUS_KM;

/// `points` waypoints along the equator, `spacing_km` apart.
///
/// Equatorial legs make the haversine distance exact, so step delays are
/// predictable: at 50 km/h, 0.02 km is 1440 ms, 0.002 km is 144 ms (floored
/// to 300) and anything from 0.03 km up hits the 2000 ms ceiling.
pub fn equator_line(points: usize, spacing_km: f64) -> Vec<GeoPoint> {
    (0..points)
        .map(|i| GeoPoint::new(0.0, (i as f64 * spacing_km / EARTH_RADIUS_KM).to_degrees()))
        .collect()
}

/// A short downtown-Berlin drive with uneven waypoint spacing.
pub fn berlin_drive() -> Vec<GeoPoint> {
    vec![
        GeoPoint::new(52.52000, 13.40500),
        GeoPoint::new(52.52004, 13.40510),
        GeoPoint::new(52.52020, 13.40560),
        GeoPoint::new(52.52100, 13.40700),
        GeoPoint::new(52.52105, 13.40712),
        GeoPoint::new(52.52300, 13.41000),
    ]
}
