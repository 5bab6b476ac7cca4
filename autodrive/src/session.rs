//! Per-tick orchestration of one car on one track: controls, integration,
//! sensing, recording, collision.

use drive_protocol::ControlCommands;
use tracing::debug;

use crate::car::{CarParams, CarState};
use crate::collision;
use crate::radar::{self, RadarDistances};
use crate::telemetry::TelemetryRecorder;
use crate::track::Track;

/// Forward momentum above this gets braked before reverse thrust kicks in.
const REVERSE_BRAKE_THRESHOLD: f32 = 5.0;

pub struct DrivingSession {
    car: CarState,
    params: CarParams,
    track: Track,
    recorder: TelemetryRecorder,
    distances: RadarDistances,
    collided: bool,
    elapsed_ms: f64,
}

impl DrivingSession {
    pub fn new(track: Track, params: CarParams) -> Self {
        let car = CarState::new(track.start.x, track.start.y);
        let distances = radar::update(&car, &track.boundary);
        Self {
            car,
            params,
            track,
            recorder: TelemetryRecorder::new(),
            distances,
            collided: false,
            elapsed_ms: 0.0,
        }
    }

    /// Advance one tick: apply control primitives, integrate, re-sense,
    /// record telemetry, evaluate the terminal condition. Returns true when
    /// the car hit the boundary this tick; the caller decides whether to
    /// restart.
    pub fn step(&mut self, dt_ms: f64, controls: ControlCommands) -> bool {
        let dt = (dt_ms / 1000.0) as f32;
        self.elapsed_ms += dt_ms;

        self.apply_controls(controls, dt);
        self.car.apply_physics(&self.params, dt);
        self.distances = radar::update(&self.car, &self.track.boundary);
        self.recorder
            .sample(dt_ms, controls, &self.distances, self.car.speed());
        self.collided = collision::check_collision(&self.car, &self.track.boundary);
        self.collided
    }

    fn apply_controls(&mut self, controls: ControlCommands, dt: f32) {
        if controls.forward {
            self.car.accelerate(&self.params, dt);
        }
        if controls.backward {
            // Braking sheds forward momentum first; reverse thrust only
            // applies once the car has mostly stopped rolling forward.
            if self.car.velocity.dot(self.car.heading()) > REVERSE_BRAKE_THRESHOLD {
                self.car.brake(&self.params);
            } else {
                self.car.reverse(&self.params, dt);
            }
        }
        // The minimum turning speed is enforced here, not in the integrator.
        if self.car.speed() > self.params.min_turn_speed {
            if controls.left {
                self.car.turn_left(&self.params, dt);
            }
            if controls.right {
                self.car.turn_right(&self.params, dt);
            }
        }
    }

    /// Put the car back on the start point and clear session-scoped state.
    /// An autopilot controller keeps its own state and must be reset by its
    /// owner; the two are deliberately independent.
    pub fn restart(&mut self) {
        debug!(track = %self.track.name, "session restart");
        self.car
            .reset_position(self.track.start.x, self.track.start.y);
        self.recorder.clear();
        self.collided = false;
        self.distances = radar::update(&self.car, &self.track.boundary);
    }

    pub fn car(&self) -> &CarState {
        &self.car
    }

    pub fn distances(&self) -> &RadarDistances {
        &self.distances
    }

    pub fn collided(&self) -> bool {
        self.collided
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn recorder(&self) -> &TelemetryRecorder {
        &self.recorder
    }

    pub fn track(&self) -> &Track {
        &self.track
    }
}
