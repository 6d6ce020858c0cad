#[path = "config/mod.rs"]
mod config_group;

pub use config_group::configure;

pub mod actions;
pub(crate) mod embeds;
pub mod enforce;
pub mod escalation;

pub use embeds::author_display_name;
