use std::sync::Arc;

use detox_database::ModerationStore;
use detox_scoring::ToxicityScorer;

pub type Error = anyhow::Error;

/// State shared by every command and event handler.
#[derive(Clone, Debug)]
pub struct Data {
    pub store: ModerationStore,
    pub scorer: Arc<ToxicityScorer>,
}

pub type Context<'a> = poise::Context<'a, Data, Error>;
