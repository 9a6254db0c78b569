//! Car roster entries and per-tick car state

use serde::{Deserialize, Serialize};

use crate::track::Point3;

/// Immutable roster entry assigned at server start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarProfile {
    /// Unique car identifier
    pub car_id: String,
    /// Team name (cosmetic)
    pub team: String,
    /// Engine power figure (cosmetic)
    pub power: f32,
    /// Car weight in kg (cosmetic)
    pub weight: f32,
    /// Livery color as a hex string (cosmetic)
    pub color: String,
    /// Driver display name (cosmetic)
    pub driver: String,
}

/// Car lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarStatus {
    /// Not yet checked in
    NotReady,
    /// Checked in, race not started
    Waiting,
    /// Actively racing
    Racing,
    /// Stopped while a penalty runs down
    ServingPenalty,
    /// Crossed the line on the final lap (or the clock ran out)
    Finished,
}

/// Per-tick kinematic snapshot of one car.
///
/// Mutated only by the tick loop; everything else sees copies inside
/// published snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarState {
    /// Which car this is
    pub car_id: String,
    /// Lifecycle status
    pub status: CarStatus,
    /// Track-space position
    pub position: Point3,
    /// Heading in degrees, always in [0, 360)
    pub heading: f32,
    /// Scalar speed, >= 0 and capped by physics
    pub speed: f32,
    /// Completed laps; never decreases
    pub lap: u32,
    /// Last applied steering (input echo)
    pub current_steering: f32,
    /// Last applied throttle (input echo)
    pub current_throttle: f32,
}

impl CarState {
    /// Fresh state on the grid at the given position
    pub fn on_grid(car_id: &str, position: Point3) -> Self {
        Self {
            car_id: car_id.to_string(),
            status: CarStatus::Waiting,
            position,
            heading: 0.0,
            speed: 0.0,
            lap: 0,
            current_steering: 0.0,
            current_throttle: 0.0,
        }
    }
}

/// Lap-time bookkeeping for one car, against the race clock
#[derive(Debug, Clone)]
pub struct CarTiming {
    /// Race-clock time (ms) when the current lap started
    pub lap_start_ms: u64,
    /// Completed lap times in seconds
    pub lap_times: Vec<f32>,
    /// Fastest completed lap in seconds
    pub best_lap_time: Option<f32>,
}

impl CarTiming {
    /// Fresh bookkeeping at the race start
    pub fn new() -> Self {
        Self {
            lap_start_ms: 0,
            lap_times: Vec::new(),
            best_lap_time: None,
        }
    }

    /// Record a completed lap at the given race-clock time
    pub fn complete_lap(&mut self, race_time_ms: u64) -> f32 {
        let lap_time = (race_time_ms.saturating_sub(self.lap_start_ms)) as f32 / 1000.0;
        self.lap_times.push(lap_time);
        match self.best_lap_time {
            Some(best) if best <= lap_time => {}
            _ => self.best_lap_time = Some(lap_time),
        }
        self.lap_start_ms = race_time_ms;
        lap_time
    }
}

impl Default for CarTiming {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_lap_records_time_and_best() {
        let mut timing = CarTiming::new();

        let first = timing.complete_lap(90_000);
        assert_eq!(first, 90.0);
        assert_eq!(timing.best_lap_time, Some(90.0));

        // Second lap is faster: 80s
        let second = timing.complete_lap(170_000);
        assert_eq!(second, 80.0);
        assert_eq!(timing.best_lap_time, Some(80.0));

        // Third lap slower: best unchanged
        timing.complete_lap(270_000);
        assert_eq!(timing.best_lap_time, Some(80.0));
        assert_eq!(timing.lap_times.len(), 3);
    }

    #[test]
    fn test_on_grid_is_stationary() {
        let state = CarState::on_grid("A", crate::track::Point3::new(1.0, 2.0));
        assert_eq!(state.speed, 0.0);
        assert_eq!(state.lap, 0);
        assert_eq!(state.status, CarStatus::Waiting);
    }
}
