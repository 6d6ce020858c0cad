use poise::serenity_prelude as serenity;

pub fn guild_only_message() -> &'static str {
    "This command only works in servers."
}

pub fn admin_only_message() -> &'static str {
    "Only administrators can configure the bot."
}

pub fn is_missing_permissions_error(source: &serenity::Error) -> bool {
    matches!(
        source,
        serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response))
            if response.status_code.as_u16() == 403 || response.error.code == 50013
    )
}

/// Display name used when a reply has to name the author of a deleted message.
pub fn author_display_name(message: &serenity::Message) -> String {
    message
        .member
        .as_ref()
        .and_then(|member| member.nick.clone())
        .or_else(|| message.author.global_name.clone())
        .unwrap_or_else(|| message.author.name.clone())
}
