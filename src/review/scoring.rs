//! Client for the external essay-scoring API.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::ScoringError;

use super::model::ScoreResult;

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    prompt: &'a str,
    essay: &'a str,
}

/// Submits a single essay for scoring.
pub struct ScoringClient {
    client: reqwest::Client,
    base_url: String,
}

impl ScoringClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// POST `{base_url}/single_scoring`. Both fields must be non-blank.
    pub async fn score(&self, prompt: &str, essay: &str) -> Result<ScoreResult, ScoringError> {
        let prompt = prompt.trim();
        let essay = essay.trim();
        if prompt.is_empty() || essay.is_empty() {
            return Err(ScoringError::MissingInput);
        }

        let url = format!("{}/single_scoring", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ScoreRequest { prompt, essay })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Scoring API returned an error");
            return Err(ScoringError::Status {
                status: status.as_u16(),
            });
        }

        let result: ScoreResult = response.json().await?;
        info!(
            overall = result.overall,
            has_feedback = result.has_feedback(),
            "Essay scored"
        );
        Ok(result)
    }
}
