pub mod chat_config;
pub mod rules;
pub mod user_state;

pub use chat_config::{ChatConfig, DEFAULT_TOX_LEVEL};
pub use rules::{DEFAULT_WARN_TEXT, Rule, RuleSet, default_rules};
pub use user_state::UserModerationState;
