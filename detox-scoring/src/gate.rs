use anyhow::Context as _;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::oracle::ToxicityModel;
use crate::tokenizer::{Tokenizer, encode_padded};

/// Model input length in tokens, control tokens included.
pub const MAX_TOKENS: usize = 128;

/// Serializes access to the toxicity model.
///
/// Tokenization runs on the caller's task without any locking; only the
/// model call itself holds the single permit.
#[derive(Debug)]
pub struct ScoringGate<T, M> {
    tokenizer: T,
    model: M,
    permit: Semaphore,
}

impl<T: Tokenizer, M: ToxicityModel> ScoringGate<T, M> {
    pub fn new(tokenizer: T, model: M) -> Self {
        Self {
            tokenizer,
            model,
            permit: Semaphore::new(1),
        }
    }

    /// Probability in `[0, 1]` that `text` is toxic.
    ///
    /// Text longer than [`MAX_TOKENS`] scores `0.0` without reaching the model.
    pub async fn evaluate(&self, text: &str) -> anyhow::Result<f32> {
        let Some(input_ids) = encode_padded(&self.tokenizer, text, MAX_TOKENS) else {
            debug!(
                chars = text.chars().count(),
                "message exceeds model input length; scoring as non-toxic"
            );
            return Ok(0.0);
        };

        let logits = {
            let _permit = self
                .permit
                .acquire()
                .await
                .context("scoring gate closed")?;
            self.model.logits(&input_ids).await?
        };

        toxic_probability(logits)
    }
}

/// Softmax over `[non_toxic, toxic]` logits, returning the toxic mass.
pub fn toxic_probability([non_toxic, toxic]: [f32; 2]) -> anyhow::Result<f32> {
    anyhow::ensure!(
        non_toxic.is_finite() && toxic.is_finite(),
        "toxicity model returned non-finite logits"
    );

    let max = non_toxic.max(toxic);
    let non_toxic = (non_toxic - max).exp();
    let toxic = (toxic - max).exp();
    Ok(toxic / (non_toxic + toxic))
}
