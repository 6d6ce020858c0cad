pub mod moderation;
pub mod utility;

use detox_core::{Data, Error};

pub struct CommandMeta {
    pub name: &'static str,
    pub desc: &'static str,
    pub category: &'static str,
    pub usage: &'static str,
}

pub const COMMANDS: &[CommandMeta] = &[
    utility::help::META,
    utility::start::META,
    moderation::configure::META,
];

pub fn commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        utility::help::help(),
        utility::start::start(),
        moderation::configure(),
    ]
}
