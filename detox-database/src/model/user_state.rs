use serde::{Deserialize, Serialize};

/// Where a user currently stands on a chat's escalation ladder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserModerationState {
    /// Unix seconds of the last violation that produced actions; 0 = never.
    pub last_applied_at: i64,
    /// Tier the next violation will use, before any reset.
    pub tier_index: usize,
    /// Tier applied by the last violation.
    pub applied_tier: Option<usize>,
}
