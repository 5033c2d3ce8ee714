//! Trip replay: walks a vehicle marker along a route in (scaled) real time.
//!
//! A [`Simulation`] owns a cursor into a shared path and advances it one point
//! per tick. Each tick moves the marker, recentres the map (raising its zoom
//! to navigation level when needed) and calls the navigation hook. The next
//! tick is scheduled after the leg's travel time at the current speed,
//! clamped to the configured bounds (see [`crate::speed`]).
//!
//! States: idle, running, stopped. `start` always replays from the first
//! point; there is no pause/resume.
//!
//! Collaborators are called without the internal lock held, so they may call
//! back into the simulation. Each run carries a generation number: a tick from
//! an earlier run that wakes after `stop`/`start` does nothing.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use crate::clock::{Scheduler, TimerHandle};
use crate::config::{SimulationConfig, DEFAULT_SPEED_KMH};
use crate::error::SimulationError;
use crate::geo::{AsGeoPoint, GeoPoint};
use crate::map::{MapView, NavigationHook, VehicleMarker, ZoomPolicy};
use crate::speed::{sanitize_speed_kmh, step_delay_ms};

struct RunState {
    current_index: usize,
    speed_kmh: f64,
    is_running: bool,
    marker: Option<Arc<dyn VehicleMarker>>,
    /// The single outstanding tick, if any.
    timer: Option<TimerHandle>,
    generation: u64,
}

impl RunState {
    fn halt(&mut self) {
        self.is_running = false;
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

struct Shared<P> {
    path: Arc<[P]>,
    scheduler: Arc<dyn Scheduler>,
    map: Option<Weak<dyn MapView>>,
    navigation: Option<NavigationHook>,
    config: SimulationConfig,
    zoom: ZoomPolicy,
    state: Mutex<RunState>,
}

impl<P: AsGeoPoint + Send + Sync + 'static> Shared<P> {
    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The map, unless the host has dropped it.
    fn map(&self) -> Option<Arc<dyn MapView>> {
        self.map.as_ref().and_then(Weak::upgrade)
    }

    fn default_speed_kmh(&self) -> f64 {
        sanitize_speed_kmh(Some(self.config.default_speed_kmh), DEFAULT_SPEED_KMH)
    }

    fn step(self: &Arc<Self>, generation: u64) {
        let (index, point, marker) = {
            let mut state = self.lock();
            if state.generation != generation {
                return;
            }
            // Either this tick's own handle or none.
            state.timer = None;
            if !state.is_running || state.current_index >= self.path.len() {
                state.halt();
                return;
            }
            let index = state.current_index;
            (index, self.path[index].geo_point(), state.marker.clone())
        };

        if let Some(marker) = marker {
            marker.set_position(point);
        }
        if let Some(map) = self.map() {
            map.set_center(point);
            if let Some(zoom) = self.zoom.follow_zoom(map.zoom()) {
                map.set_zoom(zoom);
            }
        }
        if let Some(navigate) = &self.navigation {
            navigate(point);
        }

        let mut state = self.lock();
        if state.generation != generation {
            // Restarted from inside a collaborator.
            return;
        }
        state.current_index = index + 1;

        let interval = self.config.progress_log_interval;
        if interval > 0 && state.current_index % interval == 0 {
            log::debug!(
                "trip replay progress: {}/{} points",
                state.current_index,
                self.path.len()
            );
        }

        if !state.is_running {
            // Stopped from inside a collaborator.
            return;
        }

        match self.path.get(state.current_index) {
            Some(next) => {
                let delay_ms =
                    step_delay_ms(point, next.geo_point(), state.speed_kmh, &self.config);
                debug_assert!(state.timer.is_none(), "at most one tick may be pending");
                let weak = Arc::downgrade(self);
                let timer = self.scheduler.schedule_once(
                    Duration::from_millis(delay_ms),
                    Box::new(move || {
                        if let Some(shared) = weak.upgrade() {
                            shared.step(generation);
                        }
                    }),
                );
                state.timer = Some(timer);
            }
            None => {
                log::info!("trip replay finished after {} points", self.path.len());
                state.halt();
            }
        }
    }
}

/// Builder for [`Simulation`].
pub struct SimulationBuilder<P> {
    path: Arc<[P]>,
    scheduler: Arc<dyn Scheduler>,
    marker: Option<Arc<dyn VehicleMarker>>,
    map: Option<Weak<dyn MapView>>,
    navigation: Option<NavigationHook>,
    config: SimulationConfig,
    speed_kmh: Option<f64>,
}

impl<P: AsGeoPoint + Send + Sync + 'static> SimulationBuilder<P> {
    /// Use an existing marker instead of creating one on the map at start.
    pub fn with_marker(mut self, marker: Arc<dyn VehicleMarker>) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Follow the vehicle on `map`. The simulation does not keep the map alive.
    pub fn with_map(mut self, map: Weak<dyn MapView>) -> Self {
        self.map = Some(map);
        self
    }

    pub fn with_navigation(mut self, hook: impl Fn(GeoPoint) + Send + Sync + 'static) -> Self {
        self.navigation = Some(Arc::new(hook));
        self
    }

    pub fn with_config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }

    /// Initial speed. Invalid values fall back to the configured default.
    pub fn with_speed_kmh(mut self, speed_kmh: f64) -> Self {
        self.speed_kmh = Some(speed_kmh);
        self
    }

    /// Build the simulation. A config that fails
    /// [`SimulationConfig::validate`] is logged and replaced by the defaults.
    pub fn build(self) -> Simulation<P> {
        let config = match self.config.validate() {
            Ok(()) => self.config,
            Err(err) => {
                log::warn!("{err}; falling back to the default replay config");
                SimulationConfig::default()
            }
        };
        let default_speed = sanitize_speed_kmh(Some(config.default_speed_kmh), DEFAULT_SPEED_KMH);
        let speed_kmh = sanitize_speed_kmh(self.speed_kmh, default_speed);
        Simulation {
            shared: Arc::new(Shared {
                path: self.path,
                scheduler: self.scheduler,
                map: self.map,
                navigation: self.navigation,
                zoom: ZoomPolicy::from(&config),
                config,
                state: Mutex::new(RunState {
                    current_index: 0,
                    speed_kmh,
                    is_running: false,
                    marker: self.marker,
                    timer: None,
                    generation: 0,
                }),
            }),
        }
    }
}

/// Replays a path as timed position updates.
///
/// Dropping the simulation cancels any pending tick.
pub struct Simulation<P: AsGeoPoint + Send + Sync + 'static = GeoPoint> {
    shared: Arc<Shared<P>>,
}

impl<P: AsGeoPoint + Send + Sync + 'static> Simulation<P> {
    /// A simulation with no marker, map or navigation hook.
    pub fn new(path: impl Into<Arc<[P]>>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self::builder(path, scheduler).build()
    }

    pub fn builder(
        path: impl Into<Arc<[P]>>,
        scheduler: Arc<dyn Scheduler>,
    ) -> SimulationBuilder<P> {
        SimulationBuilder {
            path: path.into(),
            scheduler,
            marker: None,
            map: None,
            navigation: None,
            config: SimulationConfig::default(),
            speed_kmh: None,
        }
    }

    /// Start replaying from the first point, logging instead of failing.
    ///
    /// An empty path is logged as an error and a second start while running
    /// is logged and ignored. See [`Simulation::try_start`].
    pub fn start(&self) {
        match self.try_start() {
            Ok(()) => {}
            Err(SimulationError::AlreadyRunning) => {
                log::info!("trip replay already running; start ignored")
            }
            Err(err) => log::error!("trip replay not started: {err}"),
        }
    }

    /// Start replaying from the first point.
    ///
    /// Resets the cursor to 0, creates a marker at the first point if a map is
    /// attached and no marker was given, then runs the first step before
    /// returning.
    pub fn try_start(&self) -> Result<(), SimulationError> {
        let Some(first) = self.shared.path.first().map(|point| point.geo_point()) else {
            return Err(SimulationError::EmptyPath);
        };

        let (generation, needs_marker, speed_kmh) = {
            let mut state = self.shared.lock();
            if state.is_running {
                return Err(SimulationError::AlreadyRunning);
            }
            state.is_running = true;
            state.current_index = 0;
            state.generation = state.generation.wrapping_add(1);
            (state.generation, state.marker.is_none(), state.speed_kmh)
        };

        if needs_marker {
            if let Some(map) = self.shared.map() {
                let marker = map.create_marker(first);
                let mut state = self.shared.lock();
                if state.generation == generation && state.marker.is_none() {
                    state.marker = Some(marker);
                }
            }
        }

        log::info!(
            "trip replay started: {} points at {:.1} km/h",
            self.shared.path.len(),
            speed_kmh
        );
        self.shared.step(generation);
        Ok(())
    }

    /// Cancel the pending tick, if any. Safe to call at any time.
    pub fn stop(&self) {
        let mut state = self.shared.lock();
        if state.is_running {
            log::info!(
                "trip replay stopped at point {}/{}",
                state.current_index,
                self.shared.path.len()
            );
        }
        state.halt();
    }

    /// Speed for delays scheduled from now on. `None`, zero, negative and
    /// non-finite values select the configured default (50 km/h).
    pub fn set_speed(&self, speed_kmh: impl Into<Option<f64>>) {
        let speed = sanitize_speed_kmh(speed_kmh.into(), self.shared.default_speed_kmh());
        self.shared.lock().speed_kmh = speed;
    }

    pub fn speed_kmh(&self) -> f64 {
        self.shared.lock().speed_kmh
    }

    /// The point under the cursor, or `None` once the path is exhausted.
    pub fn current_position(&self) -> Option<GeoPoint> {
        let index = self.shared.lock().current_index;
        self.shared.path.get(index).map(|point| point.geo_point())
    }

    pub fn current_index(&self) -> usize {
        self.shared.lock().current_index
    }

    pub fn full_path(&self) -> Arc<[P]> {
        Arc::clone(&self.shared.path)
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().is_running
    }

    /// The marker being moved: the one supplied, or the one created at start.
    pub fn marker(&self) -> Option<Arc<dyn VehicleMarker>> {
        self.shared.lock().marker.clone()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.shared.config
    }
}

impl<P: AsGeoPoint + Send + Sync + 'static> Drop for Simulation<P> {
    fn drop(&mut self) {
        self.shared.lock().halt();
    }
}

impl<P: AsGeoPoint + Send + Sync + 'static> fmt::Debug for Simulation<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("Simulation")
            .field("points", &self.shared.path.len())
            .field("current_index", &state.current_index)
            .field("speed_kmh", &state.speed_kmh)
            .field("is_running", &state.is_running)
            .field("has_marker", &state.marker.is_some())
            .finish()
    }
}
