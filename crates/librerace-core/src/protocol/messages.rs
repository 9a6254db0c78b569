//! Request and response message types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::race::{CarProfile, RaceMode, RaceSnapshot};
use crate::track::TrackGeometry;

/// Requests a client can send.
///
/// Tagged JSON, one message per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    /// Register for a car id (or the spectator id) and fetch static data
    CheckIn {
        /// Car id to claim
        car_id: String,
        /// Client's display name
        display_name: String,
        /// Reserved credential field; unchecked in this build
        #[serde(default)]
        credential: Option<String>,
    },
    /// Fetch the track without authenticating
    GetTrack,
    /// Submit one control-input frame; last write wins
    SubmitInput {
        /// Which car
        car_id: String,
        /// Token handed out at check-in
        auth_token: String,
        /// Steering in [-1, 1]
        steering: f32,
        /// Throttle in [0, 1]
        throttle: f32,
        /// Brake in [0, 1]
        brake: f32,
        /// Boost flag
        #[serde(default)]
        boost: bool,
        /// Client timestamp (ms), echoed for diagnostics
        #[serde(default)]
        timestamp: i64,
        /// Client-side sequence; carried, not enforced
        #[serde(default)]
        sequence: u64,
    },
    /// Switch this connection into the per-tick update stream
    Subscribe,
}

/// Static race parameters returned at check-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceMetadata {
    /// Termination rule
    pub mode: RaceMode,
    /// Simulation rate in Hz
    pub tick_rate_hz: u32,
    /// Wall-clock time the race object was created
    pub started_at: DateTime<Utc>,
}

/// Reply to a check-in request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInReply {
    /// Whether the registration was accepted
    pub accepted: bool,
    /// Greeting or rejection reason
    pub message: String,
    /// Token for subsequent input submissions (accepted only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// True when checked in under the spectator credential
    #[serde(default)]
    pub is_spectator: bool,
    /// Static race parameters (accepted only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub race: Option<RaceMetadata>,
    /// Full roster with static car attributes (accepted only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cars: Vec<CarProfile>,
    /// Track geometry (accepted only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<TrackInfo>,
}

/// Track geometry on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    /// Stable track identifier
    pub track_id: String,
    /// Display name
    pub name: String,
    /// Left boundary polyline
    pub left_boundary: Vec<crate::track::Point3>,
    /// Right boundary polyline
    pub right_boundary: Vec<crate::track::Point3>,
}

impl From<&TrackGeometry> for TrackInfo {
    fn from(track: &TrackGeometry) -> Self {
        Self {
            track_id: track.track_id.clone(),
            name: track.name.clone(),
            left_boundary: track.left_boundary.clone(),
            right_boundary: track.right_boundary.clone(),
        }
    }
}

/// Acknowledgment of one input submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputAck {
    /// Whether the input was staged
    pub accepted: bool,
    /// Rejection reason when not accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Tick counter at the time of the answer
    pub game_tick: u64,
}

/// Messages the server sends.
///
/// A `Subscribe` request flips the connection into a stream of
/// `Roster?` then `Update` messages, one per tick subject to the
/// mailbox drop policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Answer to `CheckIn`
    CheckIn(CheckInReply),
    /// Answer to `GetTrack`
    Track(TrackInfo),
    /// Answer to `SubmitInput`
    InputAck(InputAck),
    /// Optional first stream message with the static roster
    Roster {
        /// Static car attributes in canonical order
        cars: Vec<CarProfile>,
    },
    /// One race snapshot per tick
    Update(RaceSnapshot),
    /// Malformed request or server-side refusal
    Error {
        /// What went wrong
        message: String,
    },
}
