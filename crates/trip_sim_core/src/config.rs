//! Replay configuration: speed default, step delay bounds, follow-zoom policy.
//!
//! Every field has a default, so a JSON file only needs the values it
//! overrides:
//!
//! ```json
//! { "default_speed_kmh": 30.0, "max_step_delay_ms": 1500 }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

pub const DEFAULT_SPEED_KMH: f64 = 50.0;
pub const MIN_STEP_DELAY_MS: u64 = 300;
pub const MAX_STEP_DELAY_MS: u64 = 2_000;
pub const MIN_NAVIGATION_ZOOM: f64 = 15.0;
pub const NAVIGATION_ZOOM: f64 = 16.0;
pub const PROGRESS_LOG_INTERVAL: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Speed used on construction and whenever an invalid speed is set.
    pub default_speed_kmh: f64,
    /// Floor for the delay between two steps.
    pub min_step_delay_ms: u64,
    /// Ceiling for the delay between two steps.
    pub max_step_delay_ms: u64,
    /// Maps zoomed out further than this are pulled in while following.
    pub min_navigation_zoom: f64,
    /// Zoom applied when the map is below `min_navigation_zoom`.
    pub navigation_zoom: f64,
    /// Log progress every N steps at debug level. 0 disables.
    pub progress_log_interval: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            default_speed_kmh: DEFAULT_SPEED_KMH,
            min_step_delay_ms: MIN_STEP_DELAY_MS,
            max_step_delay_ms: MAX_STEP_DELAY_MS,
            min_navigation_zoom: MIN_NAVIGATION_ZOOM,
            navigation_zoom: NAVIGATION_ZOOM,
            progress_log_interval: PROGRESS_LOG_INTERVAL,
        }
    }
}

impl SimulationConfig {
    pub fn with_default_speed_kmh(mut self, speed_kmh: f64) -> Self {
        self.default_speed_kmh = speed_kmh;
        self
    }

    pub fn with_step_delay_bounds_ms(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.min_step_delay_ms = min_ms;
        self.max_step_delay_ms = max_ms;
        self
    }

    pub fn with_navigation_zoom(mut self, min_zoom: f64, zoom: f64) -> Self {
        self.min_navigation_zoom = min_zoom;
        self.navigation_zoom = zoom;
        self
    }

    pub fn with_progress_log_interval(mut self, steps: usize) -> Self {
        self.progress_log_interval = steps;
        self
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(text: &str) -> Result<Self, SimulationError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SimulationError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SimulationError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(self.default_speed_kmh.is_finite() && self.default_speed_kmh > 0.0) {
            return Err(SimulationError::InvalidConfig(format!(
                "default_speed_kmh must be positive and finite, got {}",
                self.default_speed_kmh
            )));
        }
        if self.min_step_delay_ms == 0 || self.min_step_delay_ms > self.max_step_delay_ms {
            return Err(SimulationError::InvalidConfig(format!(
                "step delay bounds must satisfy 0 < min <= max, got {}..={}",
                self.min_step_delay_ms, self.max_step_delay_ms
            )));
        }
        if !(self.min_navigation_zoom.is_finite() && self.navigation_zoom.is_finite())
            || self.min_navigation_zoom > self.navigation_zoom
        {
            return Err(SimulationError::InvalidConfig(format!(
                "min_navigation_zoom ({}) must not exceed navigation_zoom ({})",
                self.min_navigation_zoom, self.navigation_zoom
            )));
        }
        Ok(())
    }
}
