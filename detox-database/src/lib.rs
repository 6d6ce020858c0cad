pub mod cache;
pub mod database;
pub mod impls;
pub mod model;
pub mod rules_text;
pub mod store;

pub use cache::CacheService;
pub use database::{Database, MIGRATOR};
pub use rules_text::{ParseError, parse_rules, render_rules};
pub use store::{ChatStore, MemoryStore, ModerationStore, update_config};
