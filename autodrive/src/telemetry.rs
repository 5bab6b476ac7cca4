//! Fixed-rate telemetry recording, decoupled from the variable render tick
//! by a time accumulator.

use drive_protocol::{ControlCommands, TelemetrySample};

use crate::radar::RadarDistances;

/// Samples are spaced exactly this far apart in session time, regardless of
/// tick duration.
pub const SAMPLE_INTERVAL_MS: f64 = 50.0;

#[derive(Debug, Default)]
pub struct TelemetryRecorder {
    samples: Vec<TelemetrySample>,
    accumulator_ms: f64,
    step: u64,
    previous: ControlCommands,
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the sampling clock by one tick's worth of time. The
    /// accumulator drains in a loop, so a tick longer than the sample
    /// interval still emits every owed sample instead of dropping them.
    pub fn sample(
        &mut self,
        dt_ms: f64,
        controls: ControlCommands,
        distances: &RadarDistances,
        speed: f32,
    ) {
        self.accumulator_ms += dt_ms;
        while self.accumulator_ms >= SAMPLE_INTERVAL_MS {
            self.accumulator_ms -= SAMPLE_INTERVAL_MS;
            self.push_sample(controls, distances, speed);
        }
    }

    fn push_sample(&mut self, controls: ControlCommands, distances: &RadarDistances, speed: f32) {
        let previous = self.previous;
        self.samples.push(TelemetrySample {
            step: self.step,
            timestamp: self.step as f64 * SAMPLE_INTERVAL_MS,
            w_pressed: controls.forward,
            a_pressed: controls.left,
            s_pressed: controls.backward,
            d_pressed: controls.right,
            w_impulse: controls.forward && !previous.forward,
            a_impulse: controls.left && !previous.left,
            s_impulse: controls.backward && !previous.backward,
            d_impulse: controls.right && !previous.right,
            l_sensor_range: distances.far_left,
            ml_sensor_range: distances.mid_left,
            c_sensor_range: distances.center,
            mr_sensor_range: distances.mid_right,
            r_sensor_range: distances.far_right,
            speed,
        });
        self.previous = controls;
        self.step += 1;
    }

    /// Drop all recorded state: samples, the accumulator, the step counter
    /// and the edge-detection memory. Required on every session restart so
    /// no impulse is carried across the boundary.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.accumulator_ms = 0.0;
        self.step = 0;
        self.previous = ControlCommands::default();
    }

    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Serialize the full sample sequence as the JSON array the persistence
    /// service stores.
    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.samples)
    }
}
