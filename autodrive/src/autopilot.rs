//! Autopilot controller: keeps a sliding window of observations, queries the
//! external predictor under a hard deadline, and degrades to a safe default
//! when the predictor misbehaves.
//!
//! Queries are fire-and-settle: each one runs on a spawned task racing
//! `tokio::time::timeout`, and the tick thread drains whatever has settled
//! since the previous tick. The tick loop therefore never awaits the
//! network; it applies the most recently completed result, which may be a
//! tick or two stale. The hard deadline bounds that staleness.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use drive_protocol::{ControlCommands, Observation, PredictRequest, PredictResponse};
use predictor_client::{Predictor, PredictorError};
use tracing::{debug, warn};

use crate::radar::RadarDistances;

#[derive(Debug, Clone)]
pub struct AutopilotConfig {
    /// Observation window length fed to the sequence model.
    pub window_len: usize,
    /// Subtracted from every sensor range before it enters the window,
    /// floored at zero.
    pub dead_zone: f32,
    /// Hard deadline for one predictor call, query and probe alike.
    pub predict_timeout: Duration,
    /// Minimum dwell before a changed command is accepted. Zero disables
    /// hysteresis.
    pub command_dwell_ms: f64,
    /// Spacing between availability probes while the predictor is
    /// unreachable.
    pub probe_interval_ms: f64,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            window_len: 10,
            dead_zone: 30.0,
            predict_timeout: Duration::from_millis(250),
            command_dwell_ms: 200.0,
            probe_interval_ms: 1000.0,
        }
    }
}

/// Controller life cycle. `Cold` until the window is full, `Active` while
/// the predictor answers, `Degraded` after any failed query or probe.
/// Leaving `Degraded` requires a successful health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutopilotPhase {
    Cold,
    Active,
    Degraded,
}

pub struct AutopilotController<P> {
    predictor: P,
    phase: AutopilotPhase,
    window: VecDeque<Observation>,
    /// Feedback vector for the next request, in W/A/S/D order.
    previous_action: [u8; 4],
    /// Last emitted command; the hysteresis reference.
    current: ControlCommands,
    last_change_ms: f64,
    reachable: bool,
    in_flight: bool,
    results: Arc<Mutex<Vec<Result<PredictResponse, PredictorError>>>>,
    probe_in_flight: bool,
    probe_results: Arc<Mutex<Vec<bool>>>,
    last_probe_ms: f64,
    config: AutopilotConfig,
}

impl<P> AutopilotController<P>
where
    P: Predictor + Clone + Send + 'static,
{
    pub fn new(predictor: P, config: AutopilotConfig) -> Self {
        Self {
            predictor,
            phase: AutopilotPhase::Cold,
            window: VecDeque::with_capacity(config.window_len),
            previous_action: [0; 4],
            current: ControlCommands::SAFE_DEFAULT,
            last_change_ms: 0.0,
            reachable: true,
            in_flight: false,
            results: Arc::new(Mutex::new(Vec::new())),
            probe_in_flight: false,
            probe_results: Arc::new(Mutex::new(Vec::new())),
            last_probe_ms: f64::NEG_INFINITY,
            config,
        }
    }

    pub fn phase(&self) -> AutopilotPhase {
        self.phase
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    /// Per-tick decision. `now_ms` is session time. Pushes the current
    /// observation, drains settled probe and query results, launches at most
    /// one new query, and returns this tick's command. A failed query is
    /// surfaced exactly once, on the tick that discovers it; the caller
    /// picks the fallback command for that tick.
    pub fn control(
        &mut self,
        distances: &RadarDistances,
        speed: f32,
        now_ms: f64,
    ) -> Result<ControlCommands, PredictorError> {
        self.push_observation(distances, speed);
        self.drain_probes();
        let (fresh, failure) = self.drain_results();

        if self.window.len() < self.config.window_len {
            // Warm-up: fixed safe default, nothing to predict from yet.
            return Ok(ControlCommands::SAFE_DEFAULT);
        }
        if self.phase == AutopilotPhase::Cold {
            self.phase = if self.reachable {
                AutopilotPhase::Active
            } else {
                AutopilotPhase::Degraded
            };
            debug!(phase = ?self.phase, "observation window full");
        }

        if let Some(error) = failure {
            warn!(%error, "predictor query failed, entering degraded mode");
            self.phase = AutopilotPhase::Degraded;
            self.reachable = false;
            self.current = ControlCommands::SAFE_DEFAULT;
            self.maybe_probe(now_ms);
            return Err(error);
        }

        if self.phase == AutopilotPhase::Degraded {
            self.maybe_probe(now_ms);
            self.current = ControlCommands::SAFE_DEFAULT;
            return Ok(ControlCommands::SAFE_DEFAULT);
        }

        if self.reachable && !self.in_flight {
            self.launch_query();
        }

        let mut candidate = self.current;
        if let Some(response) = fresh {
            candidate = response.commands();
        }
        self.apply_hysteresis(candidate, now_ms);
        Ok(self.current)
    }

    /// Clear all session-scoped state: the observation window, the previous
    /// command memory and the feedback vector. Reachability describes the
    /// predictor, not the session, and survives a reset.
    pub fn reset(&mut self) {
        self.window.clear();
        self.previous_action = [0; 4];
        self.current = ControlCommands::SAFE_DEFAULT;
        self.last_change_ms = 0.0;
        self.phase = AutopilotPhase::Cold;
        // Replies to queries from the old session settle into the abandoned
        // queue and are never read.
        self.results = Arc::new(Mutex::new(Vec::new()));
        self.in_flight = false;
    }

    fn push_observation(&mut self, distances: &RadarDistances, speed: f32) {
        let dead_zone = self.config.dead_zone;
        let clip = |range: f32| (range - dead_zone).max(0.0);
        let observation = Observation {
            l_sensor: clip(distances.far_left),
            ml_sensor: clip(distances.mid_left),
            c_sensor: clip(distances.center),
            mr_sensor: clip(distances.mid_right),
            r_sensor: clip(distances.far_right),
            speed,
        };

        self.window.push_back(observation);
        while self.window.len() > self.config.window_len {
            self.window.pop_front();
        }
    }

    fn drain_results(&mut self) -> (Option<PredictResponse>, Option<PredictorError>) {
        let mut settled = Vec::new();
        if let Ok(mut pending) = self.results.lock() {
            settled.append(&mut *pending);
        }

        let mut fresh = None;
        let mut failure = None;
        for outcome in settled {
            self.in_flight = false;
            match outcome {
                Ok(response) => {
                    self.previous_action = response.commands().action_vector();
                    fresh = Some(response);
                }
                Err(error) => failure = Some(error),
            }
        }
        (fresh, failure)
    }

    fn drain_probes(&mut self) {
        let mut settled = Vec::new();
        if let Ok(mut pending) = self.probe_results.lock() {
            settled.append(&mut *pending);
        }

        for available in settled {
            self.probe_in_flight = false;
            if available {
                if !self.reachable {
                    debug!("predictor reachable again");
                }
                self.reachable = true;
                if self.phase == AutopilotPhase::Degraded
                    && self.window.len() >= self.config.window_len
                {
                    self.phase = AutopilotPhase::Active;
                }
            } else {
                self.reachable = false;
                if self.phase == AutopilotPhase::Active {
                    self.phase = AutopilotPhase::Degraded;
                }
            }
        }
    }

    fn launch_query(&mut self) {
        let request = PredictRequest {
            sequence: self.window.iter().copied().collect(),
            previous_action: self.previous_action,
        };
        let predictor = self.predictor.clone();
        let results = Arc::clone(&self.results);
        let timeout = self.config.predict_timeout;

        self.in_flight = true;
        tokio::spawn(async move {
            // The losing branch of the race is dropped, not aborted.
            let outcome = match tokio::time::timeout(timeout, predictor.predict(request)).await {
                Ok(result) => result,
                Err(_) => Err(PredictorError::Timeout(timeout)),
            };
            if let Ok(mut pending) = results.lock() {
                pending.push(outcome);
            }
        });
    }

    fn maybe_probe(&mut self, now_ms: f64) {
        if self.probe_in_flight || now_ms - self.last_probe_ms < self.config.probe_interval_ms {
            return;
        }
        self.last_probe_ms = now_ms;
        self.probe_in_flight = true;

        let predictor = self.predictor.clone();
        let results = Arc::clone(&self.probe_results);
        let timeout = self.config.predict_timeout;
        tokio::spawn(async move {
            let available = match tokio::time::timeout(timeout, predictor.health()).await {
                Ok(Ok(health)) => health.is_available(),
                Ok(Err(_)) | Err(_) => false,
            };
            if let Ok(mut pending) = results.lock() {
                pending.push(available);
            }
        });
    }

    fn apply_hysteresis(&mut self, candidate: ControlCommands, now_ms: f64) {
        if candidate == self.current {
            return;
        }
        // A dwell of zero accepts every change.
        if now_ms - self.last_change_ms >= self.config.command_dwell_ms {
            self.current = candidate;
            self.last_change_ms = now_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use drive_protocol::HealthResponse;

    use super::*;

    #[derive(Clone)]
    struct StubPredictor {
        delay: Duration,
        response: Arc<Mutex<PredictResponse>>,
        healthy: Arc<AtomicBool>,
        predict_calls: Arc<AtomicUsize>,
        last_request: Arc<Mutex<Option<PredictRequest>>>,
    }

    impl StubPredictor {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                response: Arc::new(Mutex::new(forward_only())),
                healthy: Arc::new(AtomicBool::new(true)),
                predict_calls: Arc::new(AtomicUsize::new(0)),
                last_request: Arc::new(Mutex::new(None)),
            }
        }

        fn respond_with(&self, response: PredictResponse) {
            *self.response.lock().unwrap() = response;
        }

        fn calls(&self) -> usize {
            self.predict_calls.load(Ordering::SeqCst)
        }

        fn last_request(&self) -> Option<PredictRequest> {
            self.last_request.lock().unwrap().clone()
        }
    }

    impl Predictor for StubPredictor {
        async fn predict(&self, request: PredictRequest) -> Result<PredictResponse, PredictorError> {
            self.predict_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request);
            tokio::time::sleep(self.delay).await;
            Ok(self.response.lock().unwrap().clone())
        }

        async fn health(&self) -> Result<HealthResponse, PredictorError> {
            if self.healthy.load(Ordering::SeqCst) {
                Ok(HealthResponse {
                    status: "healthy".to_string(),
                    model_loaded: true,
                })
            } else {
                Err(PredictorError::Transport("connection refused".to_string()))
            }
        }
    }

    fn forward_only() -> PredictResponse {
        PredictResponse {
            forward: true,
            backward: false,
            left: false,
            right: false,
            probabilities: None,
        }
    }

    fn forward_left() -> PredictResponse {
        PredictResponse {
            forward: true,
            backward: false,
            left: true,
            right: false,
            probabilities: None,
        }
    }

    fn no_dwell() -> AutopilotConfig {
        AutopilotConfig {
            command_dwell_ms: 0.0,
            ..AutopilotConfig::default()
        }
    }

    /// Let spawned queries and probes run and settle under the paused clock.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn cold_phase_returns_safe_default_without_querying() {
        let stub = StubPredictor::new(Duration::ZERO);
        let mut controller = AutopilotController::new(stub.clone(), no_dwell());
        let distances = RadarDistances::saturated();

        for tick in 0..9 {
            let command = controller
                .control(&distances, 50.0, tick as f64 * 16.0)
                .unwrap();
            assert_eq!(command, ControlCommands::SAFE_DEFAULT);
            assert_eq!(controller.phase(), AutopilotPhase::Cold);
        }
        assert_eq!(stub.calls(), 0);

        // The tenth observation fills the window.
        controller.control(&distances, 50.0, 144.0).unwrap();
        assert_eq!(controller.phase(), AutopilotPhase::Active);
        settle().await;
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_prediction_becomes_the_next_command() {
        let stub = StubPredictor::new(Duration::ZERO);
        stub.respond_with(forward_left());
        let mut controller = AutopilotController::new(stub.clone(), no_dwell());
        let distances = RadarDistances::saturated();

        for tick in 0..10 {
            controller
                .control(&distances, 50.0, tick as f64 * 16.0)
                .unwrap();
        }
        settle().await;

        let command = controller.control(&distances, 50.0, 160.0).unwrap();
        assert_eq!(command, forward_left().commands());
        assert_eq!(controller.phase(), AutopilotPhase::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn request_carries_full_window_and_feedback_action() {
        let stub = StubPredictor::new(Duration::ZERO);
        stub.respond_with(forward_left());
        let mut controller = AutopilotController::new(stub.clone(), no_dwell());
        let distances = RadarDistances::saturated();

        for tick in 0..10 {
            controller
                .control(&distances, 50.0, tick as f64 * 16.0)
                .unwrap();
        }
        settle().await;

        // First request went out before any prediction existed.
        let first = stub.last_request().unwrap();
        assert_eq!(first.sequence.len(), 10);
        assert_eq!(first.previous_action, [0, 0, 0, 0]);

        // The next request feeds the previous prediction back (W/A/S/D).
        controller.control(&distances, 50.0, 160.0).unwrap();
        settle().await;
        let second = stub.last_request().unwrap();
        assert_eq!(second.sequence.len(), 10);
        assert_eq!(second.previous_action, [1, 1, 0, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn observations_are_dead_zone_clipped() {
        let stub = StubPredictor::new(Duration::ZERO);
        let mut controller = AutopilotController::new(stub.clone(), no_dwell());
        let distances = RadarDistances {
            far_left: 130.0,
            mid_left: 31.0,
            center: 29.0,
            mid_right: 30.0,
            far_right: 0.0,
        };

        for tick in 0..10 {
            controller
                .control(&distances, 42.0, tick as f64 * 16.0)
                .unwrap();
        }
        settle().await;

        let request = stub.last_request().unwrap();
        let observation = request.sequence[0];
        assert_eq!(observation.l_sensor, 100.0);
        assert_eq!(observation.ml_sensor, 1.0);
        assert_eq!(observation.c_sensor, 0.0);
        assert_eq!(observation.mr_sensor, 0.0);
        assert_eq!(observation.r_sensor, 0.0);
        assert_eq!(observation.speed, 42.0);
    }

    #[tokio::test(start_paused = true)]
    async fn at_most_one_query_is_in_flight() {
        let stub = StubPredictor::new(Duration::from_secs(30));
        let config = AutopilotConfig {
            predict_timeout: Duration::from_secs(60),
            ..no_dwell()
        };
        let mut controller = AutopilotController::new(stub.clone(), config);
        let distances = RadarDistances::saturated();

        for tick in 0..15 {
            controller
                .control(&distances, 50.0, tick as f64 * 16.0)
                .unwrap();
            settle().await;
        }

        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_degrades_and_recovers_only_after_a_good_probe() {
        let stub = StubPredictor::new(Duration::from_secs(10));
        stub.healthy.store(false, Ordering::SeqCst);
        let mut controller = AutopilotController::new(stub.clone(), no_dwell());
        let distances = RadarDistances::saturated();

        for tick in 0..10 {
            controller
                .control(&distances, 50.0, tick as f64 * 16.0)
                .unwrap();
        }
        // Let the in-flight query lose its race against the deadline.
        tokio::time::sleep(Duration::from_millis(300)).await;

        let error = controller
            .control(&distances, 50.0, 176.0)
            .expect_err("the discovering tick surfaces the failure");
        assert!(matches!(error, PredictorError::Timeout(_)));
        assert_eq!(controller.phase(), AutopilotPhase::Degraded);
        assert!(!controller.is_reachable());

        // Failed probes keep it degraded, commands fall back silently.
        settle().await;
        let command = controller.control(&distances, 50.0, 192.0).unwrap();
        assert_eq!(command, ControlCommands::SAFE_DEFAULT);
        assert_eq!(controller.phase(), AutopilotPhase::Degraded);

        // Probe succeeds once the predictor is back.
        stub.healthy.store(true, Ordering::SeqCst);
        controller.control(&distances, 50.0, 2000.0).unwrap();
        settle().await;
        controller.control(&distances, 50.0, 2016.0).unwrap();
        assert_eq!(controller.phase(), AutopilotPhase::Active);
        assert!(controller.is_reachable());
    }

    #[tokio::test(start_paused = true)]
    async fn hysteresis_holds_a_changed_command_until_the_dwell_elapses() {
        let stub = StubPredictor::new(Duration::ZERO);
        let config = AutopilotConfig {
            command_dwell_ms: 200.0,
            ..AutopilotConfig::default()
        };
        let mut controller = AutopilotController::new(stub.clone(), config);
        let distances = RadarDistances::saturated();

        for tick in 0..10 {
            controller
                .control(&distances, 50.0, tick as f64 * 16.0)
                .unwrap();
        }
        settle().await;
        stub.respond_with(forward_left());

        // Drains the forward-only prediction (no change), launches the next
        // query, which will answer with a turn.
        let command = controller.control(&distances, 50.0, 176.0).unwrap();
        assert_eq!(command, ControlCommands::SAFE_DEFAULT);
        settle().await;

        // The turn lands before the dwell has elapsed: previous command
        // is reused.
        let command = controller.control(&distances, 50.0, 192.0).unwrap();
        assert_eq!(command, ControlCommands::SAFE_DEFAULT);
        settle().await;

        // Past the dwell the change is accepted.
        let command = controller.control(&distances, 50.0, 400.0).unwrap();
        assert_eq!(command, forward_left().commands());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_dwell_accepts_every_change() {
        let stub = StubPredictor::new(Duration::ZERO);
        stub.respond_with(forward_left());
        let mut controller = AutopilotController::new(stub.clone(), no_dwell());
        let distances = RadarDistances::saturated();

        for tick in 0..10 {
            controller
                .control(&distances, 50.0, tick as f64 * 16.0)
                .unwrap();
        }
        settle().await;

        let command = controller.control(&distances, 50.0, 160.0).unwrap();
        assert_eq!(command, forward_left().commands());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_window_command_memory_and_feedback() {
        let stub = StubPredictor::new(Duration::ZERO);
        stub.respond_with(forward_left());
        let mut controller = AutopilotController::new(stub.clone(), no_dwell());
        let distances = RadarDistances::saturated();

        for tick in 0..12 {
            controller
                .control(&distances, 50.0, tick as f64 * 16.0)
                .unwrap();
            settle().await;
        }
        assert_eq!(controller.phase(), AutopilotPhase::Active);

        controller.reset();
        assert_eq!(controller.phase(), AutopilotPhase::Cold);

        // Cold again: safe default for a full warm-up window.
        for tick in 0..9 {
            let command = controller
                .control(&distances, 50.0, 1000.0 + tick as f64 * 16.0)
                .unwrap();
            assert_eq!(command, ControlCommands::SAFE_DEFAULT);
            assert_eq!(controller.phase(), AutopilotPhase::Cold);
        }

        // The first post-reset request starts from a zeroed feedback vector.
        controller.control(&distances, 50.0, 1144.0).unwrap();
        settle().await;
        let request = stub.last_request().unwrap();
        assert_eq!(request.previous_action, [0, 0, 0, 0]);
        assert_eq!(request.sequence.len(), 10);
    }
}
