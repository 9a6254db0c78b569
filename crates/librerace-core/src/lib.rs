//! # LibreRace Core Library
//!
//! Core functionality for the LibreRace racing simulation server.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Track geometry loading and lap-progress mapping
//! - Per-tick car physics integration
//! - The authoritative race-state aggregate (cars, inputs, penalties, leaderboard)
//! - The fixed-rate tick engine and snapshot broadcaster
//! - Wire message types for the client-facing protocol
//!
//! ## Architecture
//!
//! One tick task owns all mutation of [`race::RaceState`] behind a
//! readers-writer lock; connection handlers stage inputs and read
//! snapshots but never mutate mid-tick. Subscribers receive one
//! immutable [`race::RaceSnapshot`] per tick through bounded mailboxes
//! that drop rather than block.
//!
//! ## Example
//!
//! ```rust,ignore
//! use librerace_core::{config::ServerConfig, engine::RaceEngine, track::TrackGeometry};
//!
//! let config = ServerConfig::load("race.json")?;
//! let track = TrackGeometry::load_csv(&config.track_path, &config.track_id, &config.track_name)?;
//!
//! let engine = RaceEngine::new(config, track);
//! engine.spawn_tick_loop();
//!
//! // Connection handlers call engine.check_in / submit_input / subscribe.
//! ```

pub mod broadcast;
pub mod config;
pub mod engine;
pub mod physics;
pub mod protocol;
pub mod race;
pub mod track;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::broadcast::{Broadcaster, SubscriberId};
    pub use crate::config::{ServerConfig, SpectatorConfig};
    pub use crate::engine::RaceEngine;
    pub use crate::physics::{ControlInput, PhysicsTuning};
    pub use crate::protocol::{CheckInReply, ClientRequest, RaceMetadata, ServerMessage};
    pub use crate::race::{
        CarProfile, CarState, CarStatus, CheckInOutcome, InputOutcome, Penalty, RaceMode,
        RacePhase, RaceSnapshot, RaceState,
    };
    pub use crate::track::{
        CenterlineProgress, LapDetector, Point3, ProgressMap, TrackGeometry, TrackSample,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
