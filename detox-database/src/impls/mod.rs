pub mod chat_config;
pub mod user_state;
