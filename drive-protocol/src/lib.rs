//! Wire types shared between the simulation core, the predictor client and
//! the external collaborators (track authoring tool, persistence service,
//! predictor server).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A point on the track plane, as emitted by the track authoring tool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// An open line segment placed on the track as an obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub start: Point,
    pub end: Point,
}

/// The drivable annulus: two implicitly-closed polygons plus optional
/// free-standing obstacle segments. Point sequences arrive already densified;
/// no smoothing happens on this side of the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryGeometry {
    pub outer_polygon: Vec<Point>,
    pub inner_polygon: Vec<Point>,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
}

/// The four logical controls. The only channel through which any driver,
/// human or autopilot, affects the car.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ControlCommands {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl ControlCommands {
    /// Fallback command applied whenever no prediction is available.
    pub const SAFE_DEFAULT: Self = Self {
        forward: true,
        backward: false,
        left: false,
        right: false,
    };

    /// Encode as the predictor's action vector. Feature order is W/A/S/D
    /// (forward, left, backward, right), matching the trained model.
    pub fn action_vector(&self) -> [u8; 4] {
        [
            self.forward as u8,
            self.left as u8,
            self.backward as u8,
            self.right as u8,
        ]
    }
}

/// One timestep of predictor input: the five sensor ranges (dead-zone
/// clipped) plus the current speed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub l_sensor: f32,
    pub ml_sensor: f32,
    pub c_sensor: f32,
    pub mr_sensor: f32,
    pub r_sensor: f32,
    pub speed: f32,
}

/// Request body for `POST /predict`: the full ordered observation window and
/// the previously predicted action, fed back for temporal continuity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    pub sequence: Vec<Observation>,
    pub previous_action: [u8; 4],
}

/// Response body for `POST /predict`. `probabilities` is debug output from
/// the model server; it is tolerated and ignored when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<BTreeMap<String, f32>>,
}

impl PredictResponse {
    pub fn commands(&self) -> ControlCommands {
        ControlCommands {
            forward: self.forward,
            backward: self.backward,
            left: self.left,
            right: self.right,
        }
    }
}

/// Response body for `GET /health` on the predictor server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

impl HealthResponse {
    /// The probe only counts as successful once the model is actually loaded;
    /// a server that is up but still loading stays unreachable.
    pub fn is_available(&self) -> bool {
        self.model_loaded
    }
}

/// One fixed-rate telemetry sample, exported to the persistence service as a
/// flat JSON object. Key naming follows the W/A/S/D convention the training
/// pipeline reads: W=forward, A=left, S=backward, D=right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub step: u64,
    /// Milliseconds since the start of the recording session.
    pub timestamp: f64,
    pub w_pressed: bool,
    pub a_pressed: bool,
    pub s_pressed: bool,
    pub d_pressed: bool,
    pub w_impulse: bool,
    pub a_impulse: bool,
    pub s_impulse: bool,
    pub d_impulse: bool,
    pub l_sensor_range: f32,
    pub ml_sensor_range: f32,
    pub c_sensor_range: f32,
    pub mr_sensor_range: f32,
    pub r_sensor_range: f32,
    pub speed: f32,
}
