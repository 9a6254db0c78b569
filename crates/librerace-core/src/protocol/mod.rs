//! Client-Facing Wire Protocol
//!
//! Semantic message types for the four operations the server exposes:
//! check-in, track fetch, input submission, and the race-update
//! stream. Transport is newline-delimited JSON; the framing itself is
//! wired up in the server binary and is not part of the hardened core.

mod error;
mod messages;

pub use error::WireError;
pub use messages::{
    CheckInReply, ClientRequest, InputAck, RaceMetadata, ServerMessage, TrackInfo,
};

/// Maximum accepted line length for a single framed message
pub const MAX_FRAME_BYTES: usize = 256 * 1024;
