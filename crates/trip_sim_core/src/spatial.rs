//! Spatial operations: great-circle distance and H3 grid routes.
//!
//! This module provides:
//!
//! - **Haversine distance** between two [`GeoPoint`]s
//! - **Path length** of an ordered route
//! - **Grid routes**: a straight-line route sampled at H3 cell centres, with an
//!   LRU cache of computed cell paths
//!
//! Resolution 9 (~240m cells) gives a waypoint spacing close to what a city
//! street router returns.

use std::num::NonZeroUsize;
use std::sync::{Mutex, OnceLock};

use h3o::{CellIndex, LatLng, Resolution};
use lru::LruCache;

use crate::error::SimulationError;
use crate::geo::{AsGeoPoint, GeoPoint};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default resolution for grid routes.
pub const DEFAULT_ROUTE_RESOLUTION: Resolution = Resolution::Nine;

/// Great-circle distance in kilometres between two points given in degrees.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lon1) = (a.lat.to_radians(), a.lng.to_radians());
    let (lat2, lon2) = (b.lat.to_radians(), b.lng.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Sum of the leg distances along `path`, in kilometres.
pub fn path_length_km<P: AsGeoPoint>(path: &[P]) -> f64 {
    path.windows(2)
        .map(|leg| haversine_km(leg[0].geo_point(), leg[1].geo_point()))
        .sum()
}

/// Cache of directed grid paths. Only successful paths are cached.
struct PathCache {
    cache: Mutex<LruCache<(CellIndex, CellIndex), Vec<CellIndex>>>,
}

impl PathCache {
    fn new() -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(5_000).expect("cache size must be non-zero"),
            )),
        }
    }

    fn get_or_compute(&self, from: CellIndex, to: CellIndex) -> Option<Vec<CellIndex>> {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(_) => return Self::compute_path(from, to), // poisoned: skip the cache
        };
        if let Some(cached) = cache.get(&(from, to)) {
            return Some(cached.clone());
        }
        let path = Self::compute_path(from, to)?;
        cache.put((from, to), path.clone());
        Some(path)
    }

    fn compute_path(from: CellIndex, to: CellIndex) -> Option<Vec<CellIndex>> {
        from.grid_path_cells(to).ok().and_then(|path| {
            let cells: Vec<CellIndex> = path.filter_map(|cell| cell.ok()).collect();
            if cells.is_empty() {
                None
            } else {
                Some(cells)
            }
        })
    }
}

fn get_path_cache() -> &'static PathCache {
    static PATH_CACHE: OnceLock<PathCache> = OnceLock::new();
    PATH_CACHE.get_or_init(PathCache::new)
}

fn to_cell(point: GeoPoint, resolution: Resolution) -> Result<CellIndex, SimulationError> {
    LatLng::try_from(point)
        .map(|ll| ll.to_cell(resolution))
        .map_err(|err| SimulationError::InvalidRoute(format!("{point:?}: {err}")))
}

/// Build a route from `from` to `to` through the centres of the H3 cells on
/// the grid line between them.
///
/// The first and last points are the exact endpoints, so a replay starts and
/// ends where the trip does. Fails when the grid path cannot be computed
/// (e.g. across a pentagon or between very distant cells).
pub fn grid_route(
    from: GeoPoint,
    to: GeoPoint,
    resolution: Resolution,
) -> Result<Vec<GeoPoint>, SimulationError> {
    let from_cell = to_cell(from, resolution)?;
    let to_cell = to_cell(to, resolution)?;
    let cells = get_path_cache()
        .get_or_compute(from_cell, to_cell)
        .ok_or_else(|| {
            SimulationError::InvalidRoute(format!(
                "no grid path between {from_cell} and {to_cell}"
            ))
        })?;

    let mut route: Vec<GeoPoint> = cells.iter().map(|cell| cell.geo_point()).collect();
    route[0] = from;
    if route.len() == 1 {
        route.push(to);
    } else if let Some(last) = route.last_mut() {
        *last = to;
    }
    Ok(route)
}
