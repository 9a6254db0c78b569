//! Tick Engine
//!
//! Drives the fixed-rate simulation loop and fronts the race state for
//! connection handlers. One spawned task owns all mutation: each tick
//! it takes the write half of the state lock for the entire
//! read-modify-compute-snapshot sequence, then hands the finished
//! snapshot to the broadcaster outside the lock. Handlers take the
//! read lock (or a brief write for input staging) and never see a torn
//! tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::broadcast::{Broadcaster, SubscriberId};
use crate::config::ServerConfig;
use crate::physics::{ControlInput, PhysicsTuning};
use crate::protocol::RaceMetadata;
use crate::race::{CarProfile, CheckInOutcome, InputOutcome, RaceSnapshot, RaceState};
use crate::track::{BoundaryPolicy, CenterlineProgress, OpenCourse, ProgressMap, TrackGeometry};

/// The authoritative race engine: shared state, broadcaster, and the
/// policies the tick applies.
pub struct RaceEngine {
    state: RwLock<RaceState>,
    broadcaster: Broadcaster,
    track: Arc<TrackGeometry>,
    progress: Box<dyn ProgressMap>,
    boundary: Box<dyn BoundaryPolicy>,
    tuning: PhysicsTuning,
    tick_period: Duration,
    tick_rate_hz: u32,
    send_roster_on_subscribe: bool,
}

impl RaceEngine {
    /// Engine with the default policies: nearest-centerline progress
    /// and no boundary correction (closed-loop lap model).
    pub fn new(config: &ServerConfig, track: TrackGeometry) -> Self {
        let progress = Box::new(CenterlineProgress::new(&track));
        Self::with_policies(config, track, progress, Box::new(OpenCourse))
    }

    /// Engine with explicit progress and boundary policies
    pub fn with_policies(
        config: &ServerConfig,
        track: TrackGeometry,
        progress: Box<dyn ProgressMap>,
        boundary: Box<dyn BoundaryPolicy>,
    ) -> Self {
        let track = Arc::new(track);
        let state = RaceState::new(
            config.car_count,
            config.mode,
            config.spectator.clone(),
            Arc::clone(&track),
        );

        Self {
            state: RwLock::new(state),
            broadcaster: Broadcaster::new(config.mailbox_capacity),
            track,
            progress,
            boundary,
            tuning: config.physics,
            tick_period: config.tick_period(),
            tick_rate_hz: config.tick_rate_hz,
            send_roster_on_subscribe: config.send_roster_on_subscribe,
        }
    }

    /// Loaded track geometry; unauthenticated reads go straight here
    pub fn track(&self) -> &Arc<TrackGeometry> {
        &self.track
    }

    /// Whether subscribers get the static roster as their first message
    pub fn send_roster_on_subscribe(&self) -> bool {
        self.send_roster_on_subscribe
    }

    /// Configured tick period
    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Canonical roster copy
    pub async fn roster(&self) -> Vec<CarProfile> {
        self.state.read().await.roster().to_vec()
    }

    /// Current tick counter
    pub async fn current_tick(&self) -> u64 {
        self.state.read().await.tick()
    }

    /// Log every car's token at startup, the way operators expect to
    /// hand them to bot authors
    pub async fn log_tokens(&self) {
        let state = self.state.read().await;
        for profile in state.roster() {
            if let Some(token) = state.auth_token(&profile.car_id) {
                info!(car_id = %profile.car_id, token, "car auth token");
            }
        }
    }

    /// Look up a car's token (primarily for tests and tooling)
    pub async fn auth_token(&self, car_id: &str) -> Option<String> {
        self.state
            .read()
            .await
            .auth_token(car_id)
            .map(str::to_string)
    }

    /// Register a client; read-only against the aggregate
    pub async fn check_in(&self, car_id: &str, display_name: &str) -> CheckInOutcome {
        self.state.read().await.check_in(car_id, display_name)
    }

    /// Static race parameters handed out at check-in
    pub async fn race_metadata(&self) -> RaceMetadata {
        let state = self.state.read().await;
        RaceMetadata {
            mode: state.mode(),
            tick_rate_hz: self.tick_rate_hz,
            started_at: state.started_at(),
        }
    }

    /// Stage a control input for the next tick.
    ///
    /// Takes the write lock, so a submission that arrives mid-tick
    /// waits for the tick to finish and lands in the following one.
    pub async fn submit_input(
        &self,
        car_id: &str,
        token: &str,
        input: ControlInput,
    ) -> InputOutcome {
        self.state.write().await.submit_input(car_id, token, input)
    }

    /// Put a car under penalty (rule detectors are external callers)
    pub async fn issue_penalty(&self, car_id: &str, reason: &str, duration_ms: i32) {
        self.state
            .write()
            .await
            .issue_penalty(car_id, reason, duration_ms)
    }

    /// Register a snapshot mailbox for a streaming subscriber
    pub fn subscribe(&self) -> (SubscriberId, mpsc::Receiver<Arc<RaceSnapshot>>) {
        self.broadcaster.subscribe()
    }

    /// Deregister a subscriber's mailbox
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.broadcaster.unsubscribe(id)
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.broadcaster.subscriber_count()
    }

    /// Run one tick of `dt` seconds and publish the snapshot.
    ///
    /// The write guard covers the whole advance; publication happens
    /// after it drops and never blocks on slow subscribers.
    pub async fn tick_once(&self, dt: f32) -> Arc<RaceSnapshot> {
        let snapshot = {
            let mut state = self.state.write().await;
            Arc::new(state.advance(dt, self.progress.as_ref(), &self.tuning, self.boundary.as_ref()))
        };
        self.broadcaster.publish(Arc::clone(&snapshot));
        snapshot
    }

    /// Spawn the fixed-rate tick driver.
    ///
    /// The interval delays overrun ticks rather than bursting to catch
    /// up; `dt` is measured between iterations, so a delayed tick
    /// integrates the real elapsed time.
    pub fn spawn_tick_loop(self: Arc<Self>) -> JoinHandle<()> {
        let engine = self;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(engine.tick_period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; consume it so the
            // loop below sees full periods.
            interval.tick().await;

            let mut last = Instant::now();
            info!(period_ms = engine.tick_period.as_millis() as u64, "tick loop running");

            loop {
                interval.tick().await;
                let now = Instant::now();
                let dt = (now - last).as_secs_f32();
                last = now;

                if dt > engine.tick_period.as_secs_f32() * 4.0 {
                    warn!(dt, "tick overran badly; integrating the full gap");
                }

                engine.tick_once(dt).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::TrackSample;

    fn ring_track(points: usize, radius: f32) -> TrackGeometry {
        let samples: Vec<TrackSample> = (0..points)
            .map(|i| {
                let angle = i as f32 / points as f32 * std::f32::consts::TAU;
                TrackSample {
                    center_x: radius * angle.cos(),
                    center_y: radius * angle.sin(),
                    width_left: 5.0,
                    width_right: 5.0,
                }
            })
            .collect();
        TrackGeometry::from_samples("ring", "Ring", &samples).unwrap()
    }

    fn engine() -> Arc<RaceEngine> {
        let config = ServerConfig {
            car_count: 2,
            ..ServerConfig::default()
        };
        Arc::new(RaceEngine::new(&config, ring_track(36, 500.0)))
    }

    #[tokio::test]
    async fn test_tick_once_publishes_to_subscribers() {
        let engine = engine();
        let (_id, mut rx) = engine.subscribe();

        let snapshot = engine.tick_once(1.0 / 60.0).await;
        assert_eq!(snapshot.tick, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.tick, 1);
    }

    #[tokio::test]
    async fn test_input_applies_on_next_tick() {
        let engine = engine();
        let token = engine.auth_token("A").await.unwrap();

        let outcome = engine
            .submit_input(
                "A",
                &token,
                ControlInput {
                    throttle: 1.0,
                    ..ControlInput::default()
                },
            )
            .await;
        assert!(outcome.is_accepted());

        let snapshot = engine.tick_once(1.0 / 60.0).await;
        assert!(snapshot.car("A").unwrap().speed > 0.0);
        assert_eq!(snapshot.car("B").unwrap().speed, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_loop_advances_at_fixed_rate() {
        let engine = engine();
        let handle = Arc::clone(&engine).spawn_tick_loop();
        let period = engine.tick_period();

        // Let the loop start and arm its interval
        tokio::task::yield_now().await;

        for _ in 0..10 {
            tokio::time::advance(period).await;
        }
        tokio::task::yield_now().await;

        assert_eq!(engine.current_tick().await, 10);
        handle.abort();
    }
}
