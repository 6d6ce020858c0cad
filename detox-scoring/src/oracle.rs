use std::env;
use std::future::Future;
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

const DEFAULT_ORACLE_URL: &str = "http://127.0.0.1:8080/score";
const DEFAULT_ORACLE_TIMEOUT_SECS: u64 = 30;

/// A two-class toxicity classifier: returns `[non_toxic, toxic]` logits.
///
/// The model is a single shared inference resource; callers go through
/// [`crate::ScoringGate`] rather than calling it directly.
pub trait ToxicityModel: Send + Sync {
    fn logits(&self, input_ids: &[u32]) -> impl Future<Output = anyhow::Result<[f32; 2]>> + Send;
}

#[derive(Serialize)]
struct ScoreRequest<'a> {
    input_ids: &'a [u32],
}

#[derive(Deserialize)]
struct ScoreResponse {
    logits: [f32; 2],
}

/// Toxicity model served over HTTP by an inference server.
#[derive(Clone, Debug)]
pub struct HttpOracle {
    client: reqwest::Client,
    url: String,
}

impl HttpOracle {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build oracle http client")?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let url = env::var("DETOX_ORACLE_URL")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_ORACLE_URL.to_owned());
        let timeout_secs = env::var("DETOX_ORACLE_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_ORACLE_TIMEOUT_SECS);

        Self::new(url, Duration::from_secs(timeout_secs))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ToxicityModel for HttpOracle {
    async fn logits(&self, input_ids: &[u32]) -> anyhow::Result<[f32; 2]> {
        let response = self
            .client
            .post(&self.url)
            .json(&ScoreRequest { input_ids })
            .send()
            .await
            .context("toxicity oracle is unavailable")?
            .error_for_status()
            .context("toxicity oracle rejected the request")?;

        let body: ScoreResponse = response
            .json()
            .await
            .context("toxicity oracle returned an unexpected body")?;

        Ok(body.logits)
    }
}
