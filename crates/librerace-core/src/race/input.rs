//! Input gate outcomes

use serde::{Deserialize, Serialize};

use crate::race::CarProfile;
use crate::track::TrackGeometry;

/// Result of a control-input submission.
///
/// Always a value, never an error: a rejected submission is a normal
/// answer carrying the current tick, and it never touches staged input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputOutcome {
    /// Input staged for the next tick
    Accepted {
        /// Tick counter at the time of acceptance
        tick: u64,
    },
    /// Input discarded
    Rejected {
        /// Why the input was refused
        reason: String,
        /// Tick counter at the time of rejection
        tick: u64,
    },
}

impl InputOutcome {
    /// True for the accepted case
    pub fn is_accepted(&self) -> bool {
        matches!(self, InputOutcome::Accepted { .. })
    }
}

/// Result of a check-in (registration) attempt
#[derive(Debug, Clone, PartialEq)]
pub enum CheckInOutcome {
    /// Known car id (or configured spectator): token plus static race data
    Accepted {
        /// Auth token for subsequent input submissions
        auth_token: String,
        /// Greeting shown to the client
        message: String,
        /// True when checked in under the spectator credential
        is_spectator: bool,
        /// Full roster with static car attributes
        roster: Vec<CarProfile>,
        /// Loaded track geometry
        track: TrackGeometry,
    },
    /// Unknown car id
    Rejected {
        /// Why the check-in was refused
        message: String,
    },
}
