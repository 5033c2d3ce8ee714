use std::sync::{Arc, Mutex};

use trip_sim_core::geo::GeoPoint;
use trip_sim_core::map::{MapView, VehicleMarker};

/// Marker that remembers every position it was moved to.
#[derive(Debug, Default)]
pub struct RecordingMarker {
    created_at: Option<GeoPoint>,
    moves: Mutex<Vec<GeoPoint>>,
}

impl RecordingMarker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn created_at(point: GeoPoint) -> Self {
        Self {
            created_at: Some(point),
            moves: Mutex::new(Vec::new()),
        }
    }

    pub fn initial_position(&self) -> Option<GeoPoint> {
        self.created_at
    }

    pub fn moves(&self) -> Vec<GeoPoint> {
        self.moves.lock().unwrap().clone()
    }
}

impl VehicleMarker for RecordingMarker {
    fn set_position(&self, point: GeoPoint) {
        self.moves.lock().unwrap().push(point);
    }

    fn position(&self) -> Option<GeoPoint> {
        self.moves.lock().unwrap().last().copied().or(self.created_at)
    }
}

/// Map view that records recentring, zoom changes and created markers.
#[derive(Debug)]
pub struct RecordingMap {
    zoom: Mutex<f64>,
    centers: Mutex<Vec<GeoPoint>>,
    zoom_changes: Mutex<Vec<f64>>,
    markers: Mutex<Vec<Arc<RecordingMarker>>>,
}

impl RecordingMap {
    pub fn with_zoom(zoom: f64) -> Arc<Self> {
        Arc::new(Self {
            zoom: Mutex::new(zoom),
            centers: Mutex::new(Vec::new()),
            zoom_changes: Mutex::new(Vec::new()),
            markers: Mutex::new(Vec::new()),
        })
    }

    pub fn current_zoom(&self) -> f64 {
        *self.zoom.lock().unwrap()
    }

    pub fn centers(&self) -> Vec<GeoPoint> {
        self.centers.lock().unwrap().clone()
    }

    pub fn zoom_changes(&self) -> Vec<f64> {
        self.zoom_changes.lock().unwrap().clone()
    }

    pub fn created_markers(&self) -> Vec<Arc<RecordingMarker>> {
        self.markers.lock().unwrap().clone()
    }
}

impl MapView for RecordingMap {
    fn set_center(&self, point: GeoPoint) {
        self.centers.lock().unwrap().push(point);
    }

    fn zoom(&self) -> f64 {
        *self.zoom.lock().unwrap()
    }

    fn set_zoom(&self, zoom: f64) {
        *self.zoom.lock().unwrap() = zoom;
        self.zoom_changes.lock().unwrap().push(zoom);
    }

    fn create_marker(&self, at: GeoPoint) -> Arc<dyn VehicleMarker> {
        let marker = Arc::new(RecordingMarker::created_at(at));
        self.markers.lock().unwrap().push(Arc::clone(&marker));
        marker
    }
}

/// Collects the points handed to a navigation hook.
#[derive(Debug, Clone, Default)]
pub struct NavigationLog(Arc<Mutex<Vec<GeoPoint>>>);

impl NavigationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A hook closure that appends to this log.
    pub fn hook(&self) -> impl Fn(GeoPoint) + Send + Sync + 'static {
        let sink = Arc::clone(&self.0);
        move |point| sink.lock().unwrap().push(point)
    }

    pub fn points(&self) -> Vec<GeoPoint> {
        self.0.lock().unwrap().clone()
    }
}
