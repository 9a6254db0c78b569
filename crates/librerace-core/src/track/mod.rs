//! Track Geometry and Lap Progress
//!
//! Loads raw centerline samples into matched left/right boundary
//! polylines and maps car positions onto a fractional lap progress.
//!
//! Geometry is a one-shot transform performed at startup; everything in
//! this module is immutable once the server is serving.

mod error;
mod geometry;
mod progress;

pub use error::TrackError;
pub use geometry::{Point3, TrackGeometry, TrackSample};
pub use progress::{BoundaryPolicy, CenterlineProgress, LapDetector, OpenCourse, ProgressMap};
