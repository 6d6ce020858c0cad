use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Warning text of the process-wide default ladder.
pub const DEFAULT_WARN_TEXT: &str = "This is too toxic!";

/// One escalation tier. Durations are in seconds; zero means "not set".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Reply template; `{score}` expands to the percentage score. Empty = no reply.
    #[serde(default)]
    pub warn: String,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub mute_time: u64,
    #[serde(default)]
    pub ban_time: u64,
    #[serde(default)]
    pub reset_time: u64,
}

impl Rule {
    /// A tier that only replies with `text`.
    pub fn warn(text: impl Into<String>) -> Self {
        Self {
            warn: text.into(),
            ..Self::default()
        }
    }
}

/// Ordered escalation ladder; index 0 is the mildest tier.
pub type RuleSet = Vec<Rule>;

static DEFAULT_RULES: LazyLock<RuleSet> = LazyLock::new(|| vec![Rule::warn(DEFAULT_WARN_TEXT)]);

/// Ladder used by chats that never configured one.
pub fn default_rules() -> &'static [Rule] {
    &DEFAULT_RULES
}
