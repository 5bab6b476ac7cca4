//! HTTP client for the external autopilot predictor.
//!
//! The predictor is a separately trained sequence model served over HTTP.
//! This crate only implements the contract the simulation core expects from
//! it: `POST /predict` with an observation window and `GET /health` as the
//! availability probe. Timeout enforcement is intentionally not done here;
//! the autopilot controller races each call against its own hard deadline.

use std::future::Future;
use std::time::Duration;

use drive_protocol::{HealthResponse, PredictRequest, PredictResponse};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Error)]
pub enum PredictorError {
    #[error("predictor call exceeded the {0:?} deadline")]
    Timeout(Duration),
    #[error("predictor returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("predictor transport error: {0}")]
    Transport(String),
}

/// The seam between the autopilot controller and the predictor transport.
/// The controller is generic over this, so tests can drive it with an
/// in-process stub instead of a live server.
pub trait Predictor {
    fn predict(
        &self,
        request: PredictRequest,
    ) -> impl Future<Output = Result<PredictResponse, PredictorError>> + Send;

    fn health(&self) -> impl Future<Output = Result<HealthResponse, PredictorError>> + Send;
}

/// `reqwest`-backed predictor client.
#[derive(Debug, Clone)]
pub struct HttpPredictor {
    http: reqwest::Client,
    base_url: String,
}

impl HttpPredictor {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Predictor for HttpPredictor {
    async fn predict(&self, request: PredictRequest) -> Result<PredictResponse, PredictorError> {
        let response = self
            .http
            .post(self.url("/predict"))
            .json(&request)
            .send()
            .await
            .map_err(|err| PredictorError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PredictorError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<PredictResponse>()
            .await
            .map_err(|err| PredictorError::Transport(format!("invalid predict response: {err}")))
    }

    async fn health(&self) -> Result<HealthResponse, PredictorError> {
        let response = self
            .http
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|err| PredictorError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PredictorError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let health = response
            .json::<HealthResponse>()
            .await
            .map_err(|err| PredictorError::Transport(format!("invalid health response: {err}")))?;
        debug!(status = %health.status, model_loaded = health.model_loaded, "predictor health");
        Ok(health)
    }
}
