//! Speed handling and step delays.
//!
//! The wait between two replay steps is the real travel time for the leg at
//! the current speed, clamped so clustered waypoints do not flood the
//! scheduler and sparse ones do not stall the marker.

use crate::config::SimulationConfig;
use crate::geo::{AsGeoPoint, GeoPoint};
use crate::spatial::haversine_km;

const MS_PER_HOUR: f64 = 60.0 * 60.0 * 1000.0;

/// Returns `requested` if it is a usable speed, otherwise `default_kmh`.
///
/// Missing, zero, negative and non-finite speeds are all unusable.
pub fn sanitize_speed_kmh(requested: Option<f64>, default_kmh: f64) -> f64 {
    match requested {
        Some(kmh) if kmh.is_finite() && kmh > 0.0 => kmh,
        _ => default_kmh,
    }
}

/// Unclamped travel time in milliseconds. `speed_kmh` must be positive.
pub fn travel_time_ms(distance_km: f64, speed_kmh: f64) -> f64 {
    distance_km / speed_kmh * MS_PER_HOUR
}

/// Clamp a raw travel time into the configured step delay bounds, in whole ms.
///
/// Inverted bounds collapse to the floor. NaN maps to the ceiling.
pub fn clamp_step_delay_ms(raw_ms: f64, config: &SimulationConfig) -> u64 {
    let min = config.min_step_delay_ms;
    let max = config.max_step_delay_ms.max(min);
    if raw_ms.is_nan() {
        return max;
    }
    raw_ms.max(min as f64).min(max as f64).round() as u64
}

/// Delay before moving from `from` to `to` at `speed_kmh`.
pub fn step_delay_ms(
    from: GeoPoint,
    to: GeoPoint,
    speed_kmh: f64,
    config: &SimulationConfig,
) -> u64 {
    clamp_step_delay_ms(travel_time_ms(haversine_km(from, to), speed_kmh), config)
}

/// Total of the delays a full replay of `path` would schedule at a fixed speed.
pub fn replay_duration_ms<P: AsGeoPoint>(
    path: &[P],
    speed_kmh: f64,
    config: &SimulationConfig,
) -> u64 {
    path.windows(2)
        .map(|leg| step_delay_ms(leg[0].geo_point(), leg[1].geo_point(), speed_kmh, config))
        .sum()
}
