//! Driver trip replay engine.
//!
//! Replays a route as timed position updates for a map marker: the delay
//! between points follows the great-circle distance and a configurable
//! average speed, so a replay moves at a believable pace.
//!
//! ```no_run
//! use std::sync::Arc;
//! use trip_sim_core::clock::ManualClock;
//! use trip_sim_core::geo::GeoPoint;
//! use trip_sim_core::simulation::Simulation;
//!
//! let clock = ManualClock::new();
//! let path = vec![GeoPoint::new(52.5200, 13.4050), GeoPoint::new(52.5203, 13.4056)];
//! let sim: Simulation = Simulation::builder(path, Arc::new(clock.clone()))
//!     .with_navigation(|point| println!("now at {point:?}"))
//!     .build();
//! sim.start();
//! clock.run_until_idle(usize::MAX);
//! assert!(!sim.is_running());
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod geo;
pub mod map;
pub mod simulation;
pub mod spatial;
pub mod speed;

pub use clock::{ManualClock, Scheduler, TimerHandle, TokioScheduler};
pub use config::SimulationConfig;
pub use error::SimulationError;
pub use geo::{AsGeoPoint, GeoPoint};
pub use map::{MapView, NavigationHook, VehicleMarker, ZoomPolicy};
pub use simulation::{Simulation, SimulationBuilder};
