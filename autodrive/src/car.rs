use glam::Vec2;

pub const CAR_WIDTH: f32 = 40.0;
pub const CAR_HEIGHT: f32 = 20.0;

/// Tunable constants for the kinematic model.
#[derive(Debug, Clone, Copy)]
pub struct CarParams {
    /// Forward thrust, world units per second squared.
    pub acceleration: f32,
    /// Reverse thrust, world units per second squared.
    pub reverse_acceleration: f32,
    /// Velocity multiplier applied once per braking tick. Sheds speed
    /// faster than passive friction.
    pub brake_damping: f32,
    /// Velocity multiplier applied once per tick, unconditionally.
    pub friction: f32,
    pub max_speed: f32,
    /// Steering rate in radians per second.
    pub turn_rate: f32,
    /// Below this speed the caller must not invoke the turn primitives.
    pub min_turn_speed: f32,
}

impl Default for CarParams {
    fn default() -> Self {
        Self {
            acceleration: 220.0,
            reverse_acceleration: 140.0,
            brake_damping: 0.90,
            friction: 0.985,
            max_speed: 320.0,
            turn_rate: 2.4,
            min_turn_speed: 12.0,
        }
    }
}

/// The car's full kinematic state. Only the integrator primitives below
/// mutate it; every other component reads it.
#[derive(Debug, Clone, Copy)]
pub struct CarState {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Heading in radians; 0 points along +X, positive turns are
    /// counter-clockwise.
    pub rotation: f32,
    /// Rectangle extent along the heading axis.
    pub width: f32,
    /// Rectangle extent across the heading axis.
    pub height: f32,
}

impl CarState {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            velocity: Vec2::ZERO,
            rotation: 0.0,
            width: CAR_WIDTH,
            height: CAR_HEIGHT,
        }
    }

    /// Unit vector along the heading.
    pub fn heading(&self) -> Vec2 {
        Vec2::from_angle(self.rotation)
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    pub fn accelerate(&mut self, params: &CarParams, dt: f32) {
        self.velocity += self.heading() * params.acceleration * dt;
    }

    pub fn reverse(&mut self, params: &CarParams, dt: f32) {
        self.velocity -= self.heading() * params.reverse_acceleration * dt;
    }

    pub fn brake(&mut self, params: &CarParams) {
        self.velocity *= params.brake_damping;
    }

    pub fn turn_left(&mut self, params: &CarParams, dt: f32) {
        self.rotation += params.turn_rate * dt;
    }

    pub fn turn_right(&mut self, params: &CarParams, dt: f32) {
        self.rotation -= params.turn_rate * dt;
    }

    pub fn stop(&mut self) {
        self.velocity = Vec2::ZERO;
    }

    /// One integration step: passive friction, speed clamp, then position
    /// update. Friction applies every tick whether or not any control
    /// primitive ran.
    pub fn apply_physics(&mut self, params: &CarParams, dt: f32) {
        self.velocity *= params.friction;

        let speed = self.velocity.length();
        if speed > params.max_speed {
            self.velocity *= params.max_speed / speed;
        }

        self.position += self.velocity * dt;
    }

    pub fn reset_position(&mut self, x: f32, y: f32) {
        self.position = Vec2::new(x, y);
        self.velocity = Vec2::ZERO;
        self.rotation = 0.0;
    }
}
