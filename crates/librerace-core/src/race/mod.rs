//! Authoritative Race State
//!
//! The single shared aggregate: roster, per-car kinematic state, staged
//! inputs, auth tokens, penalties, and the race clock. All mutation
//! happens inside the tick (callers hold the write half of one
//! readers-writer lock across the whole advance); connection handlers
//! only stage inputs and read.

mod car;
mod input;
mod leaderboard;
mod penalty;
mod snapshot;
mod state;

pub use car::{CarProfile, CarState, CarStatus, CarTiming};
pub use input::{CheckInOutcome, InputOutcome};
pub use leaderboard::{compute_intervals, compute_standings, Interval, Standing};
pub use penalty::Penalty;
pub use snapshot::RaceSnapshot;
pub use state::{RaceMode, RacePhase, RaceState};
