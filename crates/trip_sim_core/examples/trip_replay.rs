//! Replay a driver trip on the console in real time.
//!
//! Run with:
//!   cargo run -p trip_sim_core --example trip_replay -- --route route.json
//!   cargo run -p trip_sim_core --example trip_replay -- --from 52.52,13.405 --to 52.53,13.425
//!
//! Set `RUST_LOG=debug` to see per-step progress.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use clap::Parser;
use trip_sim_core::clock::TokioScheduler;
use trip_sim_core::config::{SimulationConfig, DEFAULT_SPEED_KMH};
use trip_sim_core::error::SimulationError;
use trip_sim_core::geo::{parse_route_json, GeoPoint};
use trip_sim_core::map::{MapView, VehicleMarker};
use trip_sim_core::simulation::Simulation;
use trip_sim_core::spatial::{grid_route, path_length_km, DEFAULT_ROUTE_RESOLUTION};
use trip_sim_core::speed::{replay_duration_ms, sanitize_speed_kmh};

#[derive(Parser, Debug)]
#[command(about = "Replay a driver trip as timed position updates")]
struct Args {
    /// JSON file with an array of [lat, lng] pairs or {lat, lng} objects.
    #[arg(long, conflicts_with_all = ["from", "to"])]
    route: Option<PathBuf>,
    /// Trip origin as "lat,lng" (used with --to).
    #[arg(long, value_parser = parse_lat_lng, requires = "to")]
    from: Option<GeoPoint>,
    /// Trip destination as "lat,lng" (used with --from).
    #[arg(long, value_parser = parse_lat_lng, requires = "from")]
    to: Option<GeoPoint>,
    /// Average speed in km/h.
    #[arg(long, env = "TRIP_REPLAY_SPEED_KMH")]
    speed: Option<f64>,
    /// JSON replay config (delay bounds, zoom policy, default speed).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_lat_lng(raw: &str) -> Result<GeoPoint, String> {
    let (lat, lng) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected \"lat,lng\", got {raw:?}"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {e}"))?;
    let lng: f64 = lng.trim().parse().map_err(|e| format!("bad longitude: {e}"))?;
    let point = GeoPoint::new(lat, lng);
    if point.is_valid() {
        Ok(point)
    } else {
        Err(format!("coordinates out of range: {raw}"))
    }
}

struct ConsoleMarker {
    position: Mutex<Option<GeoPoint>>,
}

impl VehicleMarker for ConsoleMarker {
    fn set_position(&self, point: GeoPoint) {
        println!("vehicle at {:.6}, {:.6}", point.lat, point.lng);
        if let Ok(mut position) = self.position.lock() {
            *position = Some(point);
        }
    }

    fn position(&self) -> Option<GeoPoint> {
        self.position.lock().ok().and_then(|position| *position)
    }
}

struct ConsoleMap {
    zoom: Mutex<f64>,
}

impl MapView for ConsoleMap {
    fn set_center(&self, point: GeoPoint) {
        log::debug!("map centred on {:.6}, {:.6}", point.lat, point.lng);
    }

    fn zoom(&self) -> f64 {
        self.zoom.lock().map(|zoom| *zoom).unwrap_or_default()
    }

    fn set_zoom(&self, zoom: f64) {
        log::info!("map zoom set to {zoom}");
        if let Ok(mut current) = self.zoom.lock() {
            *current = zoom;
        }
    }

    fn create_marker(&self, at: GeoPoint) -> Arc<dyn VehicleMarker> {
        log::info!("vehicle marker placed at {:.6}, {:.6}", at.lat, at.lng);
        Arc::new(ConsoleMarker {
            position: Mutex::new(Some(at)),
        })
    }
}

fn load_route(args: &Args) -> Result<Vec<GeoPoint>, SimulationError> {
    match (&args.route, args.from, args.to) {
        (Some(path), _, _) => {
            let text = fs::read_to_string(path).map_err(|source| SimulationError::Io {
                path: path.display().to_string(),
                source,
            })?;
            parse_route_json(&text)
        }
        (None, Some(from), Some(to)) => grid_route(from, to, DEFAULT_ROUTE_RESOLUTION),
        _ => Err(SimulationError::InvalidRoute(
            "pass --route FILE or --from LAT,LNG --to LAT,LNG".to_string(),
        )),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), SimulationError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SimulationConfig::from_path(path)?,
        None => SimulationConfig::default(),
    };
    let route = load_route(&args)?;
    let default_speed = sanitize_speed_kmh(Some(config.default_speed_kmh), DEFAULT_SPEED_KMH);
    let speed_kmh = sanitize_speed_kmh(args.speed, default_speed);

    println!(
        "--- Trip replay ({} points, {:.2} km, ~{:.1} s at {:.0} km/h) ---",
        route.len(),
        path_length_km(&route),
        replay_duration_ms(&route, speed_kmh, &config) as f64 / 1000.0,
        speed_kmh
    );

    let map = Arc::new(ConsoleMap {
        zoom: Mutex::new(12.0),
    });
    let sim: Simulation = Simulation::builder(route, Arc::new(TokioScheduler::current()?))
        .with_config(config)
        .with_speed_kmh(speed_kmh)
        .with_map(Arc::downgrade(&map) as Weak<dyn MapView>)
        .with_navigation(|point| log::debug!("navigation step at {point:?}"))
        .build();

    sim.start();
    while sim.is_running() {
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    println!("Trip replay finished.");
    Ok(())
}
