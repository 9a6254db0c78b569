//! Immutable per-tick race snapshot

use serde::{Deserialize, Serialize};

use crate::race::{CarState, Interval, Penalty, RacePhase};

/// One fully-populated race-state message, produced once per tick and
/// shared unchanged with every subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSnapshot {
    /// Tick counter at publication
    pub tick: u64,
    /// Racing or finished
    pub status: RacePhase,
    /// Lap target for lap-limited races
    pub total_laps: u32,
    /// Race clock in milliseconds
    pub race_time_ms: u64,
    /// Seconds left for time-limited races (0 otherwise)
    pub time_left_s: u32,
    /// Every car's kinematic state, roster order
    pub cars: Vec<CarState>,
    /// Penalties still being served
    pub penalties: Vec<Penalty>,
    /// Gap to the leader, running order
    pub intervals_to_leader: Vec<Interval>,
    /// Gap to the car ahead, running order
    pub intervals_ahead: Vec<Interval>,
}

impl RaceSnapshot {
    /// Look up one car's state in the snapshot
    pub fn car(&self, car_id: &str) -> Option<&CarState> {
        self.cars.iter().find(|c| c.car_id == car_id)
    }
}
