//! Geographic points and the boundary that normalizes them.
//!
//! Routes reach the replay engine from different producers: plain coordinate
//! structs and `(lat, lng)` pairs, or types that only expose accessors such as
//! [`h3o::LatLng`] and H3 cell centres. [`AsGeoPoint`] turns any of them into a
//! [`GeoPoint`] once per read, so the stepping code never branches on the
//! representation.

use std::rc::Rc;
use std::sync::Arc;

use h3o::{CellIndex, LatLng};
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when both coordinates are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Anything that can yield a latitude/longitude.
pub trait AsGeoPoint {
    fn geo_point(&self) -> GeoPoint;
}

impl AsGeoPoint for GeoPoint {
    fn geo_point(&self) -> GeoPoint {
        *self
    }
}

impl AsGeoPoint for (f64, f64) {
    fn geo_point(&self) -> GeoPoint {
        GeoPoint::new(self.0, self.1)
    }
}

impl AsGeoPoint for LatLng {
    fn geo_point(&self) -> GeoPoint {
        GeoPoint::new(self.lat(), self.lng())
    }
}

/// Cells resolve to their centre.
impl AsGeoPoint for CellIndex {
    fn geo_point(&self) -> GeoPoint {
        LatLng::from(*self).geo_point()
    }
}

impl<T: AsGeoPoint + ?Sized> AsGeoPoint for &T {
    fn geo_point(&self) -> GeoPoint {
        (**self).geo_point()
    }
}

impl<T: AsGeoPoint + ?Sized> AsGeoPoint for Box<T> {
    fn geo_point(&self) -> GeoPoint {
        (**self).geo_point()
    }
}

impl<T: AsGeoPoint + ?Sized> AsGeoPoint for Arc<T> {
    fn geo_point(&self) -> GeoPoint {
        (**self).geo_point()
    }
}

impl<T: AsGeoPoint + ?Sized> AsGeoPoint for Rc<T> {
    fn geo_point(&self) -> GeoPoint {
        (**self).geo_point()
    }
}

impl From<LatLng> for GeoPoint {
    fn from(value: LatLng) -> Self {
        value.geo_point()
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from(value: (f64, f64)) -> Self {
        value.geo_point()
    }
}

impl TryFrom<GeoPoint> for LatLng {
    type Error = h3o::error::InvalidLatLng;

    fn try_from(value: GeoPoint) -> Result<Self, Self::Error> {
        LatLng::new(value.lat, value.lng)
    }
}

/// One route point as it may appear in a JSON route file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RoutePointRecord {
    Pair(f64, f64),
    Fields {
        #[serde(alias = "latitude")]
        lat: f64,
        #[serde(alias = "lon", alias = "longitude")]
        lng: f64,
    },
}

impl AsGeoPoint for RoutePointRecord {
    fn geo_point(&self) -> GeoPoint {
        match *self {
            RoutePointRecord::Pair(lat, lng) => GeoPoint::new(lat, lng),
            RoutePointRecord::Fields { lat, lng } => GeoPoint::new(lat, lng),
        }
    }
}

/// Parse a JSON array of route points.
///
/// Accepts `[lat, lng]` pairs and `{lat, lng}` / `{lat, lon}` /
/// `{latitude, longitude}` objects, mixed freely. Rejects empty routes and
/// out-of-range coordinates.
pub fn parse_route_json(text: &str) -> Result<Vec<GeoPoint>, SimulationError> {
    let records: Vec<RoutePointRecord> = serde_json::from_str(text)?;
    if records.is_empty() {
        return Err(SimulationError::EmptyPath);
    }
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let point = record.geo_point();
            if point.is_valid() {
                Ok(point)
            } else {
                Err(SimulationError::InvalidRoute(format!(
                    "point {i} is out of range: ({}, {})",
                    point.lat, point.lng
                )))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessor_and_field_representations_agree() {
        let ll = LatLng::new(52.52, 13.405).expect("valid latlng");
        let from_accessors = ll.geo_point();
        let from_fields = GeoPoint::new(52.52, 13.405);
        let from_pair = (52.52, 13.405).geo_point();

        assert!((from_accessors.lat - from_fields.lat).abs() < 1e-12);
        assert!((from_accessors.lng - from_fields.lng).abs() < 1e-12);
        assert_eq!(from_pair, from_fields);
    }

    #[test]
    fn boxed_trait_objects_normalize() {
        let mixed: Vec<Box<dyn AsGeoPoint>> = vec![
            Box::new(GeoPoint::new(1.0, 2.0)),
            Box::new((3.0, 4.0)),
        ];
        let points: Vec<GeoPoint> = mixed.iter().map(|p| p.geo_point()).collect();
        assert_eq!(points, vec![GeoPoint::new(1.0, 2.0), GeoPoint::new(3.0, 4.0)]);
    }

    #[test]
    fn parses_mixed_route_json() {
        let text = r#"[
            [52.5, 13.4],
            {"lat": 52.51, "lng": 13.41},
            {"latitude": 52.52, "longitude": 13.42},
            {"lat": 52.53, "lon": 13.43}
        ]"#;
        let route = parse_route_json(text).expect("route parses");
        assert_eq!(
            route,
            vec![
                GeoPoint::new(52.5, 13.4),
                GeoPoint::new(52.51, 13.41),
                GeoPoint::new(52.52, 13.42),
                GeoPoint::new(52.53, 13.43),
            ]
        );
    }

    #[test]
    fn rejects_empty_and_out_of_range_routes() {
        assert!(matches!(
            parse_route_json("[]"),
            Err(SimulationError::EmptyPath)
        ));
        assert!(matches!(
            parse_route_json("[[91.0, 0.0]]"),
            Err(SimulationError::InvalidRoute(_))
        ));
        assert!(matches!(
            parse_route_json("{\"lat\": 1}"),
            Err(SimulationError::Json(_))
        ));
    }
}
