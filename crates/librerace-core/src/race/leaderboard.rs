//! Leaderboard ordering and intervals
//!
//! Derived data, recomputed from scratch every tick. The interval
//! figure is `lap_difference + progress_difference` — a unit-less
//! ordering proxy, not a time, and kept as the literal contract.

use serde::{Deserialize, Serialize};

/// One car's place in the running order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    /// Which car
    pub car_id: String,
    /// 1-based position
    pub position: u32,
    /// Completed laps
    pub lap: u32,
    /// Progress along the current lap, in [0, 1)
    pub progress: f32,
}

/// Gap from one car to a reference car (leader or the car ahead)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Which car
    pub car_id: String,
    /// 1-based position
    pub position: u32,
    /// Completed laps
    pub laps: u32,
    /// Combined lap + progress gap (unit-less)
    pub interval: f32,
}

/// Sort cars into the running order: laps descending, then progress
/// descending. Cars tied on both keep their incoming order, which is
/// the canonical roster order and intentionally not part of the
/// contract.
pub fn compute_standings(cars: &[(String, u32, f32)]) -> Vec<Standing> {
    let mut order: Vec<&(String, u32, f32)> = cars.iter().collect();
    order.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal)));

    order
        .into_iter()
        .enumerate()
        .map(|(i, (car_id, lap, progress))| Standing {
            car_id: car_id.clone(),
            position: i as u32 + 1,
            lap: *lap,
            progress: *progress,
        })
        .collect()
}

/// Intervals to the leader and to the car one position ahead.
///
/// Both lists come back in running order; the leader's entries are
/// zero.
pub fn compute_intervals(standings: &[Standing]) -> (Vec<Interval>, Vec<Interval>) {
    let mut to_leader = Vec::with_capacity(standings.len());
    let mut to_ahead = Vec::with_capacity(standings.len());

    let Some(leader) = standings.first() else {
        return (to_leader, to_ahead);
    };

    for (i, entry) in standings.iter().enumerate() {
        let lap_diff = (leader.lap - entry.lap) as f32;
        let progress_diff = leader.progress - entry.progress;
        to_leader.push(Interval {
            car_id: entry.car_id.clone(),
            position: entry.position,
            laps: entry.lap,
            interval: lap_diff + progress_diff,
        });

        let gap_ahead = if i == 0 {
            0.0
        } else {
            let ahead = &standings[i - 1];
            (ahead.lap - entry.lap) as f32 + (ahead.progress - entry.progress)
        };
        to_ahead.push(Interval {
            car_id: entry.car_id.clone(),
            position: entry.position,
            laps: entry.lap,
            interval: gap_ahead,
        });
    }

    (to_leader, to_ahead)
}
