//! The race-state aggregate
//!
//! Everything mutable about the race lives here, behind one lock owned
//! by the engine. [`RaceState::advance`] is the whole tick: callers
//! hold the write guard across it, so an input arriving mid-tick is
//! staged for the next tick, never torn into the current one.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SpectatorConfig;
use crate::physics::{integrate, ControlInput, PhysicsTuning};
use crate::race::{
    compute_intervals, compute_standings, CarProfile, CarState, CarStatus, CarTiming,
    CheckInOutcome, InputOutcome, Penalty, RaceSnapshot,
};
use crate::track::{BoundaryPolicy, LapDetector, ProgressMap, TrackGeometry};

/// Rejection reason for a token mismatch; exact wire string
const INVALID_TOKEN: &str = "invalid token";

/// Race termination rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RaceMode {
    /// Race ends when the leader completes this many laps
    ByLaps {
        /// Lap target
        total_laps: u32,
    },
    /// Race ends when the clock runs out
    ByTime {
        /// Race length in seconds
        duration_s: u32,
    },
}

impl Default for RaceMode {
    fn default() -> Self {
        RaceMode::ByLaps { total_laps: 3 }
    }
}

/// Aggregate race phase; Finished is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RacePhase {
    /// Simulation running
    Racing,
    /// Termination condition met; no further meaningful mutation
    Finished,
}

/// The single authoritative aggregate: roster, car states, staged
/// inputs, tokens, penalties, and the race clock.
pub struct RaceState {
    roster: Vec<CarProfile>,
    cars: HashMap<String, CarState>,
    timing: HashMap<String, CarTiming>,
    detectors: HashMap<String, LapDetector>,
    staged_inputs: HashMap<String, ControlInput>,
    auth_tokens: HashMap<String, String>,
    penalties: HashMap<String, Penalty>,
    spectator: Option<SpectatorConfig>,
    spectator_token: Option<String>,
    track: Arc<TrackGeometry>,
    mode: RaceMode,
    phase: RacePhase,
    tick: u64,
    race_time_s: f64,
    started_at: DateTime<Utc>,
}

/// Grid spacing along +Y between consecutive cars
const GRID_STAGGER: f32 = 10.0;

/// Livery colors cycled over the roster
const CAR_COLORS: &[&str] = &["#FF0000", "#00FF00", "#0000FF", "#FFFF00", "#FF00FF"];

/// Driver names cycled over the roster
const DRIVER_NAMES: &[&str] = &["Alice", "Bob", "Charlie", "Diana", "Eve"];

fn generate_token() -> String {
    format!("{:032x}", rand::random::<u128>())
}

impl RaceState {
    /// Build the aggregate: roster of `car_count` cars staggered along
    /// +Y from the track's grid anchor, one fresh auth token per car,
    /// everyone set straight to Racing.
    pub fn new(
        car_count: usize,
        mode: RaceMode,
        spectator: Option<SpectatorConfig>,
        track: Arc<TrackGeometry>,
    ) -> Self {
        let start = track.start_position();

        let mut roster = Vec::with_capacity(car_count);
        let mut cars = HashMap::with_capacity(car_count);
        let mut timing = HashMap::with_capacity(car_count);
        let mut detectors = HashMap::with_capacity(car_count);
        let mut staged_inputs = HashMap::with_capacity(car_count);
        let mut auth_tokens = HashMap::with_capacity(car_count);

        for i in 0..car_count {
            let car_id = ((b'A' + (i % 26) as u8) as char).to_string();
            roster.push(CarProfile {
                car_id: car_id.clone(),
                team: format!("Team {}", i + 1),
                power: 80.0 + i as f32 * 5.0,
                weight: 1000.0 + i as f32 * 50.0,
                color: CAR_COLORS[i % CAR_COLORS.len()].to_string(),
                driver: DRIVER_NAMES
                    .get(i)
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| format!("Driver {}", i + 1)),
            });

            let mut state = CarState::on_grid(
                &car_id,
                crate::track::Point3::new(start.x, start.y + i as f32 * GRID_STAGGER),
            );
            state.status = CarStatus::Racing;
            cars.insert(car_id.clone(), state);
            timing.insert(car_id.clone(), CarTiming::new());
            detectors.insert(car_id.clone(), LapDetector::default());
            staged_inputs.insert(car_id.clone(), ControlInput::default());
            auth_tokens.insert(car_id.clone(), generate_token());
        }

        let spectator_token = spectator
            .as_ref()
            .map(|s| s.token.clone().unwrap_or_else(generate_token));

        Self {
            roster,
            cars,
            timing,
            detectors,
            staged_inputs,
            auth_tokens,
            penalties: HashMap::new(),
            spectator,
            spectator_token,
            track,
            mode,
            phase: RacePhase::Racing,
            tick: 0,
            race_time_s: 0.0,
            started_at: Utc::now(),
        }
    }

    /// Canonical roster, car-id order
    pub fn roster(&self) -> &[CarProfile] {
        &self.roster
    }

    /// Loaded track geometry
    pub fn track(&self) -> &Arc<TrackGeometry> {
        &self.track
    }

    /// Race termination rule
    pub fn mode(&self) -> RaceMode {
        self.mode
    }

    /// Current phase
    pub fn phase(&self) -> RacePhase {
        self.phase
    }

    /// Tick counter
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Race clock in milliseconds
    pub fn race_time_ms(&self) -> u64 {
        (self.race_time_s * 1000.0) as u64
    }

    /// Wall-clock time the race object was created
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Auth token for a car, for startup logging
    pub fn auth_token(&self, car_id: &str) -> Option<&str> {
        self.auth_tokens.get(car_id).map(String::as_str)
    }

    /// Seconds left in a time-limited race (0 once expired or for
    /// lap-limited races)
    pub fn time_left_s(&self) -> u32 {
        match self.mode {
            RaceMode::ByTime { duration_s } => {
                (duration_s as f64 - self.race_time_s).max(0.0) as u32
            }
            RaceMode::ByLaps { .. } => 0,
        }
    }

    /// Register a client for a car id.
    ///
    /// Idempotent and read-only: a known car id always gets the same
    /// token back; the configured spectator id gets the spectator
    /// credential; anything else is rejected. Kinematic state is never
    /// touched here.
    pub fn check_in(&self, car_id: &str, display_name: &str) -> CheckInOutcome {
        if let Some(token) = self.auth_tokens.get(car_id) {
            debug!(car_id, display_name, "check-in accepted");
            return CheckInOutcome::Accepted {
                auth_token: token.clone(),
                message: "Welcome to the race!".to_string(),
                is_spectator: false,
                roster: self.roster.clone(),
                track: (*self.track).clone(),
            };
        }

        if let (Some(spectator), Some(token)) = (&self.spectator, &self.spectator_token) {
            if car_id == spectator.car_id {
                debug!(display_name, "spectator check-in accepted");
                return CheckInOutcome::Accepted {
                    auth_token: token.clone(),
                    message: "Welcome spectator!".to_string(),
                    is_spectator: true,
                    roster: self.roster.clone(),
                    track: (*self.track).clone(),
                };
            }
        }

        debug!(car_id, "check-in rejected: unknown car id");
        CheckInOutcome::Rejected {
            message: "Car ID not found".to_string(),
        }
    }

    /// Stage a control input for the next tick.
    ///
    /// Flat token equality; on success the previous staged input is
    /// overwritten unconditionally (last write wins, sequence numbers
    /// are carried but not enforced). Rejection never mutates staged
    /// input and always answers with the current tick.
    pub fn submit_input(&mut self, car_id: &str, token: &str, input: ControlInput) -> InputOutcome {
        match self.auth_tokens.get(car_id) {
            Some(expected) if expected == token => {
                self.staged_inputs.insert(car_id.to_string(), input);
                InputOutcome::Accepted { tick: self.tick }
            }
            _ => InputOutcome::Rejected {
                reason: INVALID_TOKEN.to_string(),
                tick: self.tick,
            },
        }
    }

    /// Put a car under penalty.
    ///
    /// What triggers a penalty is an external rule detector's call;
    /// only decay and expiry are handled inside the tick.
    pub fn issue_penalty(&mut self, car_id: &str, reason: &str, duration_ms: i32) {
        if !self.cars.contains_key(car_id) {
            warn!(car_id, "penalty for unknown car ignored");
            return;
        }
        self.penalties.insert(
            car_id.to_string(),
            Penalty::new(car_id, reason, self.tick, duration_ms),
        );
        if let Some(state) = self.cars.get_mut(car_id) {
            state.status = CarStatus::ServingPenalty;
        }
    }

    /// Advance the whole race by one tick of `dt` seconds and assemble
    /// the snapshot for broadcast.
    ///
    /// Cars are processed in canonical roster order, never request
    /// order. Penalty decay runs first, physics only for Racing cars,
    /// lap detection and timing after integration, then the derived
    /// leaderboard. The caller holds the write lock for all of it.
    pub fn advance(
        &mut self,
        dt: f32,
        progress: &dyn ProgressMap,
        tuning: &PhysicsTuning,
        boundary: &dyn BoundaryPolicy,
    ) -> RaceSnapshot {
        self.tick += 1;
        self.race_time_s += dt as f64;
        let dt_ms = (dt * 1000.0) as i32;
        let race_time_ms = self.race_time_ms();

        // Clock expiry for time-limited races
        if let RaceMode::ByTime { duration_s } = self.mode {
            if self.race_time_s >= duration_s as f64 && self.phase == RacePhase::Racing {
                info!("race clock expired");
                self.phase = RacePhase::Finished;
                for state in self.cars.values_mut() {
                    if state.status == CarStatus::Racing {
                        state.status = CarStatus::Finished;
                    }
                }
            }
        }

        let mut leader_lap = 0u32;
        let order: Vec<String> = self.roster.iter().map(|p| p.car_id.clone()).collect();

        for car_id in &order {
            let Some(state) = self.cars.get_mut(car_id) else {
                // Roster/state mismatch is a programming error: loud in
                // debug builds, skipped in release.
                debug_assert!(false, "car {} missing from state map", car_id);
                tracing::error!(%car_id, "roster car has no state, skipping tick");
                continue;
            };

            // Penalty decay and status flips
            if let Some(penalty) = self.penalties.get_mut(car_id) {
                if penalty.decay(dt_ms) {
                    self.penalties.remove(car_id);
                    state.status = CarStatus::Racing;
                } else {
                    state.status = CarStatus::ServingPenalty;
                }
            }

            if state.status != CarStatus::Racing {
                continue;
            }

            let input = self.staged_inputs.get(car_id).copied().unwrap_or_default();
            integrate(state, &input, dt, tuning);
            boundary.resolve(state);

            let current = progress.progress(state.position.x, state.position.y);
            let detector = self
                .detectors
                .entry(car_id.clone())
                .or_insert_with(LapDetector::default);
            if detector.observe(current, state.speed) {
                state.lap += 1;
                if let Some(timing) = self.timing.get_mut(car_id) {
                    let lap_time = timing.complete_lap(race_time_ms);
                    info!(
                        %car_id,
                        lap = state.lap,
                        lap_time,
                        best = timing.best_lap_time,
                        "lap completed"
                    );
                }
            }

            if let RaceMode::ByLaps { total_laps } = self.mode {
                if state.lap >= total_laps {
                    state.status = CarStatus::Finished;
                }
            }

            leader_lap = leader_lap.max(state.lap);
        }

        if let RaceMode::ByLaps { total_laps } = self.mode {
            if leader_lap >= total_laps && self.phase == RacePhase::Racing {
                info!(total_laps, "leader reached the lap target");
                self.phase = RacePhase::Finished;
            }
        }

        self.assemble_snapshot()
    }

    fn assemble_snapshot(&self) -> RaceSnapshot {
        let field: Vec<(String, u32, f32)> = self
            .roster
            .iter()
            .filter_map(|profile| {
                let state = self.cars.get(&profile.car_id)?;
                let progress = self
                    .detectors
                    .get(&profile.car_id)
                    .map(|d| d.last_progress())
                    .unwrap_or(0.0);
                Some((profile.car_id.clone(), state.lap, progress))
            })
            .collect();

        let standings = compute_standings(&field);
        let (intervals_to_leader, intervals_ahead) = compute_intervals(&standings);

        let total_laps = match self.mode {
            RaceMode::ByLaps { total_laps } => total_laps,
            RaceMode::ByTime { .. } => 0,
        };

        RaceSnapshot {
            tick: self.tick,
            status: self.phase,
            total_laps,
            race_time_ms: self.race_time_ms(),
            time_left_s: self.time_left_s(),
            cars: self
                .roster
                .iter()
                .filter_map(|p| self.cars.get(&p.car_id).cloned())
                .collect(),
            penalties: self.penalties.values().cloned().collect(),
            intervals_to_leader,
            intervals_ahead,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{CenterlineProgress, OpenCourse, TrackSample};

    fn ring_track(points: usize, radius: f32) -> Arc<TrackGeometry> {
        let samples: Vec<TrackSample> = (0..points)
            .map(|i| {
                let angle = i as f32 / points as f32 * std::f32::consts::TAU;
                TrackSample {
                    center_x: radius * angle.cos(),
                    center_y: radius * angle.sin(),
                    width_left: 5.0,
                    width_right: 5.0,
                }
            })
            .collect();
        Arc::new(TrackGeometry::from_samples("ring", "Ring", &samples).unwrap())
    }

    fn race(cars: usize) -> RaceState {
        RaceState::new(
            cars,
            RaceMode::ByLaps { total_laps: 3 },
            None,
            ring_track(36, 500.0),
        )
    }

    #[test]
    fn test_roster_is_canonical_order() {
        let state = race(3);
        let ids: Vec<&str> = state.roster().iter().map(|p| p.car_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_grid_is_staggered() {
        let state = race(3);
        let snapshot = state.assemble_snapshot();
        let y0 = snapshot.car("A").unwrap().position.y;
        let y1 = snapshot.car("B").unwrap().position.y;
        assert!((y1 - y0 - GRID_STAGGER).abs() < 1e-4);
    }

    #[test]
    fn test_check_in_is_idempotent() {
        let state = race(2);
        let first = state.check_in("A", "bot-a");
        let second = state.check_in("A", "bot-a");
        match (&first, &second) {
            (
                CheckInOutcome::Accepted {
                    auth_token: t1,
                    track,
                    ..
                },
                CheckInOutcome::Accepted { auth_token: t2, .. },
            ) => {
                assert_eq!(t1, t2);
                assert_eq!(track.left_boundary.len(), track.right_boundary.len());
                assert!(!track.left_boundary.is_empty());
            }
            _ => panic!("expected both check-ins to be accepted"),
        }
    }

    #[test]
    fn test_check_in_unknown_car_rejected() {
        let state = race(2);
        assert!(matches!(
            state.check_in("Z", "nope"),
            CheckInOutcome::Rejected { .. }
        ));
    }

    #[test]
    fn test_spectator_check_in() {
        let state = RaceState::new(
            2,
            RaceMode::default(),
            Some(SpectatorConfig {
                car_id: "OBSERVER".to_string(),
                token: None,
            }),
            ring_track(36, 500.0),
        );
        match state.check_in("OBSERVER", "viewer") {
            CheckInOutcome::Accepted { is_spectator, .. } => assert!(is_spectator),
            other => panic!("spectator rejected: {:?}", other),
        }
    }

    #[test]
    fn test_submit_input_token_gate() {
        let mut state = race(2);
        let token = state.auth_token("A").unwrap().to_string();

        let input = ControlInput {
            throttle: 1.0,
            ..ControlInput::default()
        };

        let rejected = state.submit_input("A", "wrong-token", input);
        match rejected {
            InputOutcome::Rejected { reason, .. } => assert_eq!(reason, "invalid token"),
            other => panic!("expected rejection, got {:?}", other),
        }
        // Rejection must not have staged anything
        assert_eq!(state.staged_inputs["A"], ControlInput::default());

        assert!(state.submit_input("A", &token, input).is_accepted());
        assert_eq!(state.staged_inputs["A"].throttle, 1.0);
    }

    #[test]
    fn test_staged_input_is_last_write_wins() {
        let mut state = race(1);
        let token = state.auth_token("A").unwrap().to_string();

        let first = ControlInput {
            throttle: 0.3,
            sequence: 7,
            ..ControlInput::default()
        };
        let second = ControlInput {
            throttle: 0.9,
            sequence: 3,
            ..ControlInput::default()
        };
        state.submit_input("A", &token, first);
        // Lower sequence still overwrites: no reordering is enforced
        state.submit_input("A", &token, second);
        assert_eq!(state.staged_inputs["A"].throttle, 0.9);
    }

    #[test]
    fn test_advance_skips_penalized_car() {
        let track = ring_track(36, 500.0);
        let progress = CenterlineProgress::new(&track);
        let tuning = PhysicsTuning::default();
        let mut state = RaceState::new(2, RaceMode::default(), None, track);
        let token = state.auth_token("A").unwrap().to_string();

        state.submit_input(
            "A",
            &token,
            ControlInput {
                throttle: 1.0,
                ..ControlInput::default()
            },
        );
        state.issue_penalty("A", "corner cutting", 10_000);

        let snapshot = state.advance(1.0 / 60.0, &progress, &tuning, &OpenCourse);
        let car = snapshot.car("A").unwrap();
        assert_eq!(car.status, CarStatus::ServingPenalty);
        assert_eq!(car.speed, 0.0);
        assert_eq!(snapshot.penalties.len(), 1);
    }

    #[test]
    fn test_penalty_expiry_restores_racing() {
        let track = ring_track(36, 500.0);
        let progress = CenterlineProgress::new(&track);
        let tuning = PhysicsTuning::default();
        let mut state = RaceState::new(1, RaceMode::default(), None, track);

        state.issue_penalty("A", "jump start", 30);
        // 30ms penalty expires during the second 16ms tick
        state.advance(0.016, &progress, &tuning, &OpenCourse);
        state.advance(0.016, &progress, &tuning, &OpenCourse);
        let snapshot = state.advance(0.016, &progress, &tuning, &OpenCourse);

        assert_eq!(snapshot.car("A").unwrap().status, CarStatus::Racing);
        assert!(snapshot.penalties.is_empty());
    }

    #[test]
    fn test_time_limited_race_finishes_on_expiry() {
        let track = ring_track(36, 500.0);
        let progress = CenterlineProgress::new(&track);
        let tuning = PhysicsTuning::default();
        let mut state = RaceState::new(
            1,
            RaceMode::ByTime { duration_s: 1 },
            None,
            track,
        );

        let snapshot = state.advance(1.5, &progress, &tuning, &OpenCourse);
        assert_eq!(snapshot.status, RacePhase::Finished);
        assert_eq!(snapshot.time_left_s, 0);
        assert_eq!(snapshot.car("A").unwrap().status, CarStatus::Finished);
    }

    #[test]
    fn test_tick_counter_advances() {
        let track = ring_track(36, 500.0);
        let progress = CenterlineProgress::new(&track);
        let tuning = PhysicsTuning::default();
        let mut state = RaceState::new(1, RaceMode::default(), None, track);

        for expected in 1..=5u64 {
            let snapshot = state.advance(0.016, &progress, &tuning, &OpenCourse);
            assert_eq!(snapshot.tick, expected);
        }
    }

    #[test]
    fn test_snapshot_echoes_last_applied_input() {
        let track = ring_track(36, 500.0);
        let progress = CenterlineProgress::new(&track);
        let tuning = PhysicsTuning::default();
        let mut state = RaceState::new(1, RaceMode::default(), None, track);
        let token = state.auth_token("A").unwrap().to_string();

        state.submit_input(
            "A",
            &token,
            ControlInput {
                throttle: 0.8,
                steering: -0.25,
                ..ControlInput::default()
            },
        );
        let snapshot = state.advance(0.016, &progress, &tuning, &OpenCourse);
        let car = snapshot.car("A").unwrap();
        assert_eq!(car.current_throttle, 0.8);
        assert_eq!(car.current_steering, -0.25);
    }
}
