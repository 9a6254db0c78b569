//! Penalty decay
//!
//! Only the decay/expiry side of penalties is modeled here; what causes
//! one is a rule-violation detector that lives outside the core.

use serde::{Deserialize, Serialize};

/// An active penalty against one car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Penalty {
    /// Penalized car
    pub car_id: String,
    /// Human-readable reason
    pub reason: String,
    /// Tick at which the penalty was issued
    pub issued_tick: u64,
    /// Time left to serve, in milliseconds
    pub remaining_ms: i32,
}

impl Penalty {
    /// New penalty with the full duration outstanding
    pub fn new(car_id: &str, reason: &str, issued_tick: u64, duration_ms: i32) -> Self {
        Self {
            car_id: car_id.to_string(),
            reason: reason.to_string(),
            issued_tick,
            remaining_ms: duration_ms,
        }
    }

    /// Decrement by one tick's elapsed time; true when fully served
    pub fn decay(&mut self, dt_ms: i32) -> bool {
        self.remaining_ms -= dt_ms;
        self.remaining_ms <= 0
    }
}
