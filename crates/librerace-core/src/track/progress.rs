//! Lap progress mapping and lap-crossing detection

use super::{Point3, TrackGeometry};
use crate::race::CarState;

/// Maps a track-space position to a fractional lap progress in [0, 1).
///
/// Trait boundary exists so the linear scan in [`CenterlineProgress`]
/// can later be swapped for a spatial index without touching callers.
pub trait ProgressMap: Send + Sync {
    /// Progress along the lap for the given position
    fn progress(&self, x: f32, y: f32) -> f32;
}

/// Nearest-centerline-point progress map.
///
/// Linear scan over the precomputed centerline, O(n) per call. Fine at
/// the car/point counts this server runs at.
#[derive(Debug, Clone)]
pub struct CenterlineProgress {
    centerline: Vec<Point3>,
}

impl CenterlineProgress {
    /// Precompute the centerline from loaded geometry
    pub fn new(track: &TrackGeometry) -> Self {
        Self {
            centerline: track.centerline(),
        }
    }

    /// Number of centerline points
    pub fn point_count(&self) -> usize {
        self.centerline.len()
    }
}

impl ProgressMap for CenterlineProgress {
    fn progress(&self, x: f32, y: f32) -> f32 {
        let mut min_dist = f32::MAX;
        let mut closest_idx = 0usize;

        for (i, point) in self.centerline.iter().enumerate() {
            let dist = point.distance_sq(x, y);
            if dist < min_dist {
                min_dist = dist;
                closest_idx = i;
            }
        }

        closest_idx as f32 / self.centerline.len() as f32
    }
}

/// Detects lap completion by progress wraparound near the seam.
///
/// A lap counts exactly when the previous tick's progress was above 0.9
/// and the current one is below 0.1 while the car is moving. The dead
/// zone in between suppresses jitter double-counts; a car oscillating
/// right at the threshold bands can still double-count or miss. That is
/// a known sharp edge of this heuristic, kept as-is.
#[derive(Debug, Clone)]
pub struct LapDetector {
    last_progress: f32,
}

/// Upper band of the wraparound seam
const SEAM_EXIT: f32 = 0.9;
/// Lower band of the wraparound seam
const SEAM_ENTRY: f32 = 0.1;

impl LapDetector {
    /// New detector starting at the given progress
    pub fn new(initial_progress: f32) -> Self {
        Self {
            last_progress: initial_progress,
        }
    }

    /// Progress observed on the previous tick
    pub fn last_progress(&self) -> f32 {
        self.last_progress
    }

    /// Feed this tick's progress; returns true when a lap completed
    pub fn observe(&mut self, progress: f32, speed: f32) -> bool {
        let crossed = self.last_progress > SEAM_EXIT && progress < SEAM_ENTRY && speed > 0.0;
        self.last_progress = progress;
        crossed
    }
}

impl Default for LapDetector {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Post-integration re-entry policy.
///
/// Kinematics are integrated first, then the track-specific policy
/// resolves whatever "off the course" means for the layout in use.
/// The closed-loop progress lap model needs no correction at all.
pub trait BoundaryPolicy: Send + Sync {
    /// Adjust the freshly integrated state back onto the course
    fn resolve(&self, state: &mut CarState);
}

/// No-op policy for closed-loop tracks
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCourse;

impl BoundaryPolicy for OpenCourse {
    fn resolve(&self, _state: &mut CarState) {}
}
