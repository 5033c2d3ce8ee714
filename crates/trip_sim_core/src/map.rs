//! Capabilities the replay engine drives: a map view, a movable vehicle
//! marker and an optional navigation-step hook.
//!
//! Map and marker are owned by the host UI and shared with the engine, so
//! every method takes `&self`; implementations use interior mutability.

use std::sync::Arc;

use crate::config::SimulationConfig;
use crate::geo::GeoPoint;

/// A marker that can be moved across the map.
pub trait VehicleMarker: Send + Sync {
    fn set_position(&self, point: GeoPoint);

    /// Last position set on the marker, if the backend tracks it.
    fn position(&self) -> Option<GeoPoint> {
        None
    }
}

/// A map view that can be recentred and zoomed.
pub trait MapView: Send + Sync {
    fn set_center(&self, point: GeoPoint);

    fn zoom(&self) -> f64;

    fn set_zoom(&self, zoom: f64);

    /// Create a marker at `at` and attach it to this view.
    fn create_marker(&self, at: GeoPoint) -> Arc<dyn VehicleMarker>;
}

/// Called with the current point on every step, e.g. to refresh turn-by-turn
/// instructions.
pub type NavigationHook = Arc<dyn Fn(GeoPoint) + Send + Sync>;

/// Raise-only zoom rule applied while following a vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomPolicy {
    pub min_zoom: f64,
    pub follow_zoom: f64,
}

impl ZoomPolicy {
    /// Zoom to apply when the map currently sits at `current`, or `None` to
    /// leave it alone. Zoom is never lowered.
    pub fn follow_zoom(&self, current: f64) -> Option<f64> {
        (current < self.min_zoom).then_some(self.follow_zoom)
    }
}

impl From<&SimulationConfig> for ZoomPolicy {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            min_zoom: config.min_navigation_zoom,
            follow_zoom: config.navigation_zoom,
        }
    }
}

impl Default for ZoomPolicy {
    fn default() -> Self {
        Self::from(&SimulationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_is_raised_to_navigation_level_only_when_below_minimum() {
        let policy = ZoomPolicy::default();
        assert_eq!(policy.follow_zoom(12.0), Some(16.0));
        assert_eq!(policy.follow_zoom(14.9), Some(16.0));
        assert_eq!(policy.follow_zoom(15.0), None);
        assert_eq!(policy.follow_zoom(15.5), None);
        assert_eq!(policy.follow_zoom(17.0), None);
    }
}
