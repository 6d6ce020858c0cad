use poise::serenity_prelude as serenity;

/// Default embed color used across the bot UI.
pub const DEFAULT_EMBED_COLOR: u32 = 0x3a_9d_5d;

/// Build a standard embed with a titled list of `name : value` lines.
pub fn build_field_embed(title: &str, fields: &[(&str, String)]) -> serenity::CreateEmbed {
    let description = fields
        .iter()
        .map(|(name, value)| format!("**{} :** {}", name, value))
        .collect::<Vec<_>>()
        .join("\n");

    serenity::CreateEmbed::new()
        .title(title.to_owned())
        .color(DEFAULT_EMBED_COLOR)
        .description(description)
}
