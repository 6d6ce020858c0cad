/// Generic embed builders shared across commands.
pub mod embed;
/// Shared formatting helpers (durations, scores).
pub mod formatting;
/// Single source of truth for the message-command prefix.
pub const COMMAND_PREFIX: char = '!';
/// Message text normalization ahead of scoring.
pub mod normalize;
/// Pure parser helpers.
pub mod parse;
/// Permission helper utilities.
pub mod permissions;
/// Shared time helpers.
pub mod time;
