mod support;

use std::sync::Arc;
use std::time::Duration;

use trip_sim_core::clock::ManualClock;
use trip_sim_core::config::SimulationConfig;
use trip_sim_core::simulation::Simulation;
use trip_sim_core::speed::replay_duration_ms;

use support::paths::{berlin_drive, equator_line};

/// Due times of every tick of a full replay, relative to start.
fn tick_times(clock: &ManualClock) -> Vec<u64> {
    let mut times = Vec::new();
    while let Some(due) = clock.next_due_ms() {
        times.push(due);
        clock.run_next();
    }
    times
}

#[test]
fn in_range_legs_wait_their_travel_time() {
    let clock = ManualClock::new();
    let sim: Simulation = Simulation::new(equator_line(4, 0.02), Arc::new(clock.clone()));

    sim.start();
    // 0.02 km at 50 km/h = 1440 ms per leg.
    assert_eq!(tick_times(&clock), vec![1_440, 2_880, 4_320]);
    assert_eq!(sim.current_index(), 4);
}

#[test]
fn clustered_waypoints_are_floored() {
    let clock = ManualClock::new();
    let sim: Simulation = Simulation::new(equator_line(3, 0.002), Arc::new(clock.clone()));

    sim.start();
    assert_eq!(tick_times(&clock), vec![300, 600]);
}

#[test]
fn sparse_waypoints_are_capped() {
    for spacing_km in [0.1, 1.0, 50.0] {
        let clock = ManualClock::new();
        let sim: Simulation =
            Simulation::new(equator_line(3, spacing_km), Arc::new(clock.clone()));

        sim.start();
        assert_eq!(tick_times(&clock), vec![2_000, 4_000], "spacing {spacing_km} km");
    }
}

#[test]
fn speed_change_applies_to_the_next_scheduled_leg_only() {
    let clock = ManualClock::new();
    let sim: Simulation = Simulation::new(equator_line(4, 0.02), Arc::new(clock.clone()));

    sim.start();
    assert_eq!(clock.next_due_ms(), Some(1_440));

    sim.set_speed(100.0);
    // The pending tick keeps the delay it was scheduled with.
    assert_eq!(clock.next_due_ms(), Some(1_440));

    clock.run_next();
    assert_eq!(clock.next_due_ms(), Some(1_440 + 720));

    sim.set_speed(200.0);
    clock.run_next();
    assert_eq!(clock.next_due_ms(), Some(1_440 + 720 + 360));
}

#[test]
fn invalid_speeds_fall_back_to_fifty() {
    let clock = ManualClock::new();
    let sim: Simulation = Simulation::new(equator_line(3, 0.02), Arc::new(clock.clone()));

    sim.set_speed(80.0);
    assert_eq!(sim.speed_kmh(), 80.0);
    sim.set_speed(0.0);
    assert_eq!(sim.speed_kmh(), 50.0);

    sim.set_speed(80.0);
    sim.set_speed(None);
    assert_eq!(sim.speed_kmh(), 50.0);

    sim.set_speed(-3.0);
    assert_eq!(sim.speed_kmh(), 50.0);
    sim.set_speed(f64::NAN);
    assert_eq!(sim.speed_kmh(), 50.0);

    // The fallback speed produces a normal delay rather than a division by zero.
    sim.set_speed(0.0);
    sim.start();
    assert_eq!(clock.next_due_ms(), Some(1_440));
}

#[test]
fn custom_delay_bounds_are_honoured() {
    let clock = ManualClock::new();
    let config = SimulationConfig::default().with_step_delay_bounds_ms(100, 500);
    let sim: Simulation = Simulation::builder(equator_line(3, 1.0), Arc::new(clock.clone()))
        .with_config(config)
        .build();

    sim.start();
    assert_eq!(tick_times(&clock), vec![500, 1_000]);
}

#[test]
fn inverted_delay_bounds_fall_back_to_defaults() {
    let clock = ManualClock::new();
    let config = SimulationConfig::default().with_step_delay_bounds_ms(2_000, 300);
    assert!(config.validate().is_err());
    let sim: Simulation = Simulation::builder(equator_line(3, 0.02), Arc::new(clock.clone()))
        .with_config(config)
        .build();

    sim.start();
    assert_eq!(sim.current_index(), 1);
    assert_eq!(tick_times(&clock), vec![1_440, 2_880]);
    assert_eq!(sim.current_index(), 3);
}

#[test]
fn zero_delay_floor_falls_back_to_defaults() {
    let clock = ManualClock::new();
    let config = SimulationConfig::default().with_step_delay_bounds_ms(0, 2_000);
    assert!(config.validate().is_err());
    let sim: Simulation = Simulation::builder(equator_line(3, 0.002), Arc::new(clock.clone()))
        .with_config(config)
        .build();

    sim.start();
    assert_eq!(tick_times(&clock), vec![300, 600]);
}

#[test]
fn full_replay_takes_the_predicted_duration() {
    let clock = ManualClock::new();
    let path = berlin_drive();
    let config = SimulationConfig::default();
    let expected = replay_duration_ms(&path, 30.0, &config);
    let sim: Simulation = Simulation::builder(path, Arc::new(clock.clone()))
        .with_speed_kmh(30.0)
        .build();

    sim.start();
    clock.run_until_idle(100);
    assert_eq!(clock.now_ms(), expected);
}

#[test]
fn stopped_replay_stays_put_past_the_longest_delay() {
    let clock = ManualClock::new();
    let sim: Simulation = Simulation::new(equator_line(5, 1.0), Arc::new(clock.clone()));

    sim.start();
    clock.advance(Duration::from_millis(2_000));
    assert_eq!(sim.current_index(), 2);

    sim.stop();
    clock.advance(Duration::from_millis(2_001));
    clock.advance(Duration::from_millis(10_000));
    assert_eq!(sim.current_index(), 2);
    assert_eq!(clock.next_due_ms(), None);
}
