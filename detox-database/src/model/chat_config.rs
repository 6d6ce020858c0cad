use serde::{Deserialize, Serialize};

use crate::model::rules::{Rule, RuleSet, default_rules};

/// Toxicity threshold used until a chat sets its own.
pub const DEFAULT_TOX_LEVEL: f32 = 0.4;

/// Per-chat moderation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    pub tox_level: f32,
    pub rules_user: Option<RuleSet>,
    pub rules_admin: Option<RuleSet>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            tox_level: DEFAULT_TOX_LEVEL,
            rules_user: None,
            rules_admin: None,
        }
    }
}

impl ChatConfig {
    /// The ladder that applies to a member, falling back to the default ladder.
    pub fn rules_for(&self, is_admin: bool) -> &[Rule] {
        let configured = if is_admin {
            self.rules_admin.as_deref()
        } else {
            self.rules_user.as_deref()
        };
        configured.unwrap_or_else(|| default_rules())
    }
}
