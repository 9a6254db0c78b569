//! Boundary generation from raw centerline samples

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::TrackError;

/// A point in track space
///
/// Z is carried for wire compatibility but the loader always emits 0.0;
/// the simulation is planar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    /// X coordinate (meters)
    pub x: f32,
    /// Y coordinate (meters)
    pub y: f32,
    /// Z coordinate (meters, unused)
    pub z: f32,
}

impl Point3 {
    /// Create a point on the track plane
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Squared planar distance to another point
    pub fn distance_sq(&self, x: f32, y: f32) -> f32 {
        let dx = x - self.x;
        let dy = y - self.y;
        dx * dx + dy * dy
    }
}

/// One raw centerline sample as read from the track file
///
/// File column order is `center_x, center_y, width_right, width_left`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackSample {
    /// Centerline X
    pub center_x: f32,
    /// Centerline Y
    pub center_y: f32,
    /// Half-width to the left of the direction of travel
    pub width_left: f32,
    /// Half-width to the right of the direction of travel
    pub width_right: f32,
}

/// Immutable track geometry: matched left/right boundary polylines
///
/// Invariant: both boundaries have the same non-zero length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackGeometry {
    /// Stable track identifier
    pub track_id: String,
    /// Display name
    pub name: String,
    /// Left boundary, one point per sample
    pub left_boundary: Vec<Point3>,
    /// Right boundary, one point per sample
    pub right_boundary: Vec<Point3>,
}

impl TrackGeometry {
    /// Build boundaries from raw samples.
    ///
    /// The tangent at each sample is estimated by finite difference
    /// (forward at the first point, backward at the last, central
    /// elsewhere) and normalized; the boundary points are the
    /// centerline offset along the perpendicular by the respective
    /// half-widths. A degenerate zero-length tangent leaves the
    /// boundary offset at zero for that sample.
    pub fn from_samples(
        track_id: &str,
        name: &str,
        samples: &[TrackSample],
    ) -> Result<Self, TrackError> {
        if samples.is_empty() {
            return Err(TrackError::NoSamples);
        }

        let n = samples.len();
        let mut left_boundary = Vec::with_capacity(n);
        let mut right_boundary = Vec::with_capacity(n);

        for (i, sample) in samples.iter().enumerate() {
            let (mut dx, mut dy) = if n == 1 {
                (0.0, 0.0)
            } else if i == 0 {
                // Direction to next point
                (
                    samples[i + 1].center_x - sample.center_x,
                    samples[i + 1].center_y - sample.center_y,
                )
            } else if i == n - 1 {
                // Direction from previous point
                (
                    sample.center_x - samples[i - 1].center_x,
                    sample.center_y - samples[i - 1].center_y,
                )
            } else {
                // Central difference
                (
                    samples[i + 1].center_x - samples[i - 1].center_x,
                    samples[i + 1].center_y - samples[i - 1].center_y,
                )
            };

            let length = (dx * dx + dy * dy).sqrt();
            if length > 0.0 {
                dx /= length;
                dy /= length;
            } else {
                // Duplicate sample: no usable tangent, leave the offset zero
                dx = 0.0;
                dy = 0.0;
            }

            // Perpendicular: left is (-dy, dx), right is (dy, -dx)
            let perp_x = -dy;
            let perp_y = dx;

            left_boundary.push(Point3::new(
                sample.center_x + perp_x * sample.width_left,
                sample.center_y + perp_y * sample.width_left,
            ));
            right_boundary.push(Point3::new(
                sample.center_x - perp_x * sample.width_right,
                sample.center_y - perp_y * sample.width_right,
            ));
        }

        Ok(Self {
            track_id: track_id.to_string(),
            name: name.to_string(),
            left_boundary,
            right_boundary,
        })
    }

    /// Load a track from a CSV sample file.
    ///
    /// Lines starting with `#` are comments; rows with fewer than four
    /// fields are skipped. A row with four fields that do not parse as
    /// numbers is an error rather than a silent skip.
    pub fn load_csv<P: AsRef<Path>>(
        path: P,
        track_id: &str,
        name: &str,
    ) -> Result<Self, TrackError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .comment(Some(b'#'))
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut samples = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() < 4 {
                continue;
            }

            let field = |i: usize| -> Result<f32, TrackError> {
                record[i].parse::<f32>().map_err(|e| TrackError::BadSample {
                    line: idx + 1,
                    message: format!("field {}: {}", i, e),
                })
            };

            samples.push(TrackSample {
                center_x: field(0)?,
                center_y: field(1)?,
                width_right: field(2)?,
                width_left: field(3)?,
            });
        }

        Self::from_samples(track_id, name, &samples)
    }

    /// Number of boundary point pairs
    pub fn len(&self) -> usize {
        self.left_boundary.len()
    }

    /// True when the track has no points (never holds for a loaded track)
    pub fn is_empty(&self) -> bool {
        self.left_boundary.is_empty()
    }

    /// Derived centerline: midpoint of each left/right boundary pair
    pub fn centerline(&self) -> Vec<Point3> {
        self.left_boundary
            .iter()
            .zip(self.right_boundary.iter())
            .map(|(l, r)| Point3::new((l.x + r.x) / 2.0, (l.y + r.y) / 2.0))
            .collect()
    }

    /// Grid anchor: the first left-boundary point.
    ///
    /// Cars are staggered along +Y from here at race start.
    pub fn start_position(&self) -> Point3 {
        self.left_boundary[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn straight_samples(n: usize) -> Vec<TrackSample> {
        (0..n)
            .map(|i| TrackSample {
                center_x: i as f32 * 10.0,
                center_y: 0.0,
                width_left: 5.0,
                width_right: 5.0,
            })
            .collect()
    }

    #[test]
    fn test_boundaries_match_length() {
        let track = TrackGeometry::from_samples("t", "Test", &straight_samples(8)).unwrap();
        assert_eq!(track.left_boundary.len(), 8);
        assert_eq!(track.right_boundary.len(), 8);
    }

    #[test]
    fn test_straight_track_offsets() {
        // Travel along +X: left is +Y, right is -Y
        let track = TrackGeometry::from_samples("t", "Test", &straight_samples(4)).unwrap();
        for (l, r) in track.left_boundary.iter().zip(track.right_boundary.iter()) {
            assert!((l.y - 5.0).abs() < 1e-4, "left at {}", l.y);
            assert!((r.y + 5.0).abs() < 1e-4, "right at {}", r.y);
        }
    }

    #[test]
    fn test_degenerate_tangent_keeps_center() {
        // Two identical samples: zero tangent, boundary collapses onto center
        let samples = vec![
            TrackSample {
                center_x: 3.0,
                center_y: 4.0,
                width_left: 5.0,
                width_right: 5.0,
            };
            2
        ];
        let track = TrackGeometry::from_samples("t", "Test", &samples).unwrap();
        assert_eq!(track.left_boundary[0], Point3::new(3.0, 4.0));
        assert_eq!(track.right_boundary[1], Point3::new(3.0, 4.0));
    }

    #[test]
    fn test_no_samples_is_error() {
        let err = TrackGeometry::from_samples("t", "Test", &[]).unwrap_err();
        assert!(matches!(err, TrackError::NoSamples));
    }

    #[test]
    fn test_centerline_is_midpoint() {
        let track = TrackGeometry::from_samples("t", "Test", &straight_samples(3)).unwrap();
        let center = track.centerline();
        assert_eq!(center.len(), 3);
        for (i, p) in center.iter().enumerate() {
            assert!((p.x - i as f32 * 10.0).abs() < 1e-4);
            assert!(p.y.abs() < 1e-4);
        }
    }

    #[test]
    fn test_load_csv_skips_comments_and_short_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# x, y, width_right, width_left").unwrap();
        writeln!(file, "0.0, 0.0, 4.0, 6.0").unwrap();
        writeln!(file, "10.0, 0.0").unwrap();
        writeln!(file, "20.0, 0.0, 4.0, 6.0").unwrap();
        file.flush().unwrap();

        let track = TrackGeometry::load_csv(file.path(), "t", "Test").unwrap();
        assert_eq!(track.len(), 2);
        // Asymmetric widths: left offset 6, right offset 4
        assert!((track.left_boundary[0].y - 6.0).abs() < 1e-4);
        assert!((track.right_boundary[0].y + 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_load_csv_empty_file_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# only comments here").unwrap();
        file.flush().unwrap();

        let err = TrackGeometry::load_csv(file.path(), "t", "Test").unwrap_err();
        assert!(matches!(err, TrackError::NoSamples));
    }

    #[test]
    fn test_load_csv_bad_number_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0.0, zero, 4.0, 6.0").unwrap();
        file.flush().unwrap();

        let err = TrackGeometry::load_csv(file.path(), "t", "Test").unwrap_err();
        assert!(matches!(err, TrackError::BadSample { .. }));
    }
}
