//! Headless 2D driving simulation core: kinematic car model, five-ray range
//! sensing against track boundaries, collision detection, fixed-rate
//! telemetry recording and a fault-tolerant autopilot controller backed by
//! an external predictor.

pub mod autopilot;
pub mod car;
pub mod collision;
pub mod geometry;
pub mod radar;
pub mod session;
pub mod telemetry;
pub mod track;
