//! Issue labeler prediction model adapter.
//!
//! Implements the [`triage::LabelPredictor`] trait against a model served over
//! HTTP. The model itself (training, storage, loading) lives elsewhere; this
//! crate only ships a [`PredictionInput`] to it and validates the answer.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, request formatting and response
//! parsing live here. The [`triage`] crate sees only [`triage::LabelPredictor`].
//!
//! ## Protocol
//!
//! `POST <endpoint>` with the JSON-encoded [`PredictionInput`]; the model
//! answers `{ "predictions": [{ "label": "area-System.Net", "score": 0.93 }] }`.
//! Predictions scored outside `[0.0, 1.0]` are dropped; a body that does not
//! decode is an invalid response.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use triage::{LabelPrediction, LabelPredictor, LabelScore, PredictionError, PredictionInput};

#[derive(Debug, Deserialize)]
struct WirePrediction {
    label: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    predictions: Vec<WirePrediction>,
}

/// A [`LabelPredictor`] backed by a remote model endpoint.
#[derive(Debug, Clone)]
pub struct HttpLabelPredictor {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpLabelPredictor {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, PredictionError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(PredictionError::Unavailable {
                message: "no prediction endpoint configured".into(),
            });
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PredictionError::Unavailable {
                message: e.to_string(),
            })?;
        Ok(Self { http, endpoint })
    }
}

#[async_trait]
impl LabelPredictor for HttpLabelPredictor {
    #[instrument(skip_all, fields(repo = %input.repo, issue = %input.number))]
    async fn predict(
        &self,
        input: &PredictionInput,
    ) -> Result<Vec<LabelPrediction>, PredictionError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(input)
            .send()
            .await
            .map_err(|e| PredictionError::Unavailable {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PredictionError::Unavailable {
                message: format!("model endpoint returned {status}: {body}"),
            });
        }

        let body: WireResponse =
            response
                .json()
                .await
                .map_err(|e| PredictionError::InvalidResponse {
                    message: e.to_string(),
                })?;
        debug!(predictions = body.predictions.len(), "Model responded");

        Ok(body
            .predictions
            .into_iter()
            .filter_map(|p| match LabelScore::new(p.score) {
                Some(score) => Some(LabelPrediction {
                    label: p.label,
                    score,
                }),
                None => {
                    warn!(label = %p.label, score = p.score, "Dropping out-of-range score");
                    None
                }
            })
            .collect())
    }
}
