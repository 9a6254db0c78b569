//! Per-Tick Car Physics
//!
//! Pure state integration: staged input + elapsed time + current state
//! produce the next kinematic state. Explicit forward Euler, which is
//! an accepted approximation at 60 Hz for this speed range; there is no
//! sub-stepping and no higher-order integrator.

use serde::{Deserialize, Serialize};

use crate::race::CarState;

/// Physics tuning table.
///
/// One configurable table instead of forked server variants; defaults
/// match the reference setup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    /// Speed cap without boost (units/s)
    pub max_speed: f32,
    /// Acceleration at full throttle (units/s²)
    pub acceleration: f32,
    /// Deceleration at full brake (units/s²)
    pub brake_force: f32,
    /// Coast-down deceleration with no input (units/s²)
    pub friction: f32,
    /// Turn rate at full speed (degrees/s)
    pub turn_speed: f32,
    /// Multiplier applied to acceleration and the speed cap under boost
    pub boost_multiplier: f32,
    /// Below this speed steering has no effect (prevents in-place spins)
    pub min_steer_speed: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            max_speed: 300.0,
            acceleration: 200.0,
            brake_force: 400.0,
            friction: 50.0,
            turn_speed: 180.0,
            boost_multiplier: 1.5,
            min_steer_speed: 10.0,
        }
    }
}

/// One control input frame from a client
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    /// Steering in [-1, 1]
    pub steering: f32,
    /// Throttle in [0, 1]
    pub throttle: f32,
    /// Brake in [0, 1]
    pub brake: f32,
    /// Boost flag; unconditional, not resource-limited
    pub boost: bool,
    /// Client-side timestamp, echoed for diagnostics only
    pub client_timestamp: i64,
    /// Client-side monotonic sequence; carried but not used for ordering
    pub sequence: u64,
}

/// Wrap a heading into [0, 360).
///
/// Repeated add/subtract rather than modulo so slightly-out-of-range
/// inputs stay exact.
pub fn wrap_heading(mut heading: f32) -> f32 {
    while heading < 0.0 {
        heading += 360.0;
    }
    while heading >= 360.0 {
        heading -= 360.0;
    }
    heading
}

/// Integrate one car over `dt` seconds.
///
/// Longitudinal: throttle accelerates (boost scales both the rate and
/// the cap), else brake decelerates, else friction decays toward zero.
/// Lateral: steering only above `min_steer_speed`, turn rate
/// proportional to the fraction of (unboosted) max speed. Position is a
/// standard Euler step along the heading.
pub fn integrate(state: &mut CarState, input: &ControlInput, dt: f32, tuning: &PhysicsTuning) {
    // Longitudinal
    if input.throttle > 0.0 {
        let mut acc = tuning.acceleration;
        if input.boost {
            acc *= tuning.boost_multiplier;
        }
        state.speed += acc * input.throttle * dt;
    } else if input.brake > 0.0 {
        state.speed -= tuning.brake_force * input.brake * dt;
    } else {
        state.speed -= tuning.friction * dt;
    }

    if state.speed < 0.0 {
        state.speed = 0.0;
    }
    let mut max_speed = tuning.max_speed;
    if input.boost {
        max_speed *= tuning.boost_multiplier;
    }
    if state.speed > max_speed {
        state.speed = max_speed;
    }

    // Lateral: no steering authority below the threshold
    if state.speed > tuning.min_steer_speed && input.steering != 0.0 {
        let turn_rate = tuning.turn_speed * (state.speed / tuning.max_speed);
        state.heading = wrap_heading(state.heading + turn_rate * input.steering * dt);
    }

    // Position
    let rad = state.heading.to_radians();
    state.position.x += rad.cos() * state.speed * dt;
    state.position.y += rad.sin() * state.speed * dt;

    // Echo the applied input into the state for snapshots
    state.current_steering = input.steering;
    state.current_throttle = input.throttle;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::{CarState, CarStatus};
    use crate::track::Point3;

    const DT: f32 = 1.0 / 60.0;

    fn car() -> CarState {
        CarState {
            car_id: "A".to_string(),
            status: CarStatus::Racing,
            position: Point3::new(0.0, 0.0),
            heading: 0.0,
            speed: 0.0,
            lap: 0,
            current_steering: 0.0,
            current_throttle: 0.0,
        }
    }

    fn full_throttle() -> ControlInput {
        ControlInput {
            throttle: 1.0,
            ..ControlInput::default()
        }
    }

    #[test]
    fn test_speed_never_exceeds_max() {
        let tuning = PhysicsTuning::default();
        let mut state = car();
        for _ in 0..600 {
            integrate(&mut state, &full_throttle(), DT, &tuning);
            assert!(state.speed <= tuning.max_speed);
        }
        assert_eq!(state.speed, tuning.max_speed);
    }

    #[test]
    fn test_boost_raises_cap() {
        let tuning = PhysicsTuning::default();
        let input = ControlInput {
            throttle: 1.0,
            boost: true,
            ..ControlInput::default()
        };
        let mut state = car();
        for _ in 0..600 {
            integrate(&mut state, &input, DT, &tuning);
        }
        assert!(state.speed > tuning.max_speed);
        assert_eq!(state.speed, tuning.max_speed * tuning.boost_multiplier);
    }

    #[test]
    fn test_coasting_decays_to_exact_zero() {
        let tuning = PhysicsTuning::default();
        let mut state = car();
        state.speed = 100.0;
        let coast = ControlInput::default();

        let mut previous = state.speed;
        for _ in 0..600 {
            integrate(&mut state, &coast, DT, &tuning);
            assert!(state.speed <= previous);
            previous = state.speed;
        }
        assert_eq!(state.speed, 0.0);

        // And it stays there
        integrate(&mut state, &coast, DT, &tuning);
        assert_eq!(state.speed, 0.0);
    }

    #[test]
    fn test_brake_outranks_friction() {
        let tuning = PhysicsTuning::default();
        let mut braking = car();
        braking.speed = 200.0;
        let mut coasting = car();
        coasting.speed = 200.0;

        let brake = ControlInput {
            brake: 1.0,
            ..ControlInput::default()
        };
        integrate(&mut braking, &brake, DT, &tuning);
        integrate(&mut coasting, &ControlInput::default(), DT, &tuning);
        assert!(braking.speed < coasting.speed);
    }

    #[test]
    fn test_no_steering_below_threshold() {
        let tuning = PhysicsTuning::default();
        let mut state = car();
        state.speed = 5.0;
        let input = ControlInput {
            steering: 1.0,
            ..ControlInput::default()
        };
        integrate(&mut state, &input, DT, &tuning);
        assert_eq!(state.heading, 0.0);
    }

    #[test]
    fn test_heading_stays_normalized() {
        let tuning = PhysicsTuning::default();
        let mut state = car();
        state.speed = tuning.max_speed;
        let left = ControlInput {
            throttle: 1.0,
            steering: -1.0,
            ..ControlInput::default()
        };
        for _ in 0..600 {
            integrate(&mut state, &left, DT, &tuning);
            assert!(
                (0.0..360.0).contains(&state.heading),
                "heading {} out of range",
                state.heading
            );
        }
    }

    #[test]
    fn test_wrap_heading_handles_out_of_range() {
        assert_eq!(wrap_heading(-10.0), 350.0);
        assert_eq!(wrap_heading(370.0), 10.0);
        assert_eq!(wrap_heading(720.5), 0.5);
        assert_eq!(wrap_heading(359.9), 359.9);
    }

    #[test]
    fn test_position_advances_along_heading() {
        let tuning = PhysicsTuning::default();
        let mut state = car();
        state.speed = 60.0;
        integrate(&mut state, &ControlInput::default(), 1.0, &tuning);
        // Heading 0°: pure +X motion at the post-friction speed
        assert!((state.position.x - 10.0).abs() < 1e-3);
        assert_eq!(state.position.y, 0.0);
    }

    #[test]
    fn test_input_echo_recorded() {
        let tuning = PhysicsTuning::default();
        let mut state = car();
        let input = ControlInput {
            steering: 0.5,
            throttle: 0.75,
            ..ControlInput::default()
        };
        integrate(&mut state, &input, DT, &tuning);
        assert_eq!(state.current_steering, 0.5);
        assert_eq!(state.current_throttle, 0.75);
    }
}
