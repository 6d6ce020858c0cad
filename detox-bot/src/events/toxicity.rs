use poise::serenity_prelude as serenity;
use tracing::{debug, error, warn};

use detox_commands::moderation::author_display_name;
use detox_commands::moderation::enforce::apply_actions;
use detox_commands::moderation::escalation::{Violation, decide};
use detox_core::Data;
use detox_database::ChatStore;
use detox_utils::COMMAND_PREFIX;
use detox_utils::normalize::normalize;
use detox_utils::permissions::is_chat_admin;
use detox_utils::time::now_unix_secs;

/// Score an incoming guild message and apply whatever the chat's ladder
/// says to do about it.
pub async fn handle_message_toxicity(
    ctx: &serenity::Context,
    data: &Data,
    message: &serenity::Message,
) {
    // Ignore bots and webhooks.
    if message.author.bot || message.webhook_id.is_some() {
        return;
    }

    let Some(guild_id) = message.guild_id else {
        return;
    };

    if message.content.starts_with(COMMAND_PREFIX) {
        return;
    }

    let text = normalize(&message.content);
    if text.trim().is_empty() {
        return;
    }

    let score = match data.scorer.evaluate(&text).await {
        Ok(score) => score,
        Err(source) => {
            error!(?source, message_id = %message.id, "failed to score message");
            return;
        }
    };

    let chat_id = guild_id.get();
    let user_id = message.author.id.get();

    // Resolving permissions costs API calls; only do it for messages that will escalate.
    match data.store.get_config(chat_id).await {
        Ok(config) if score < config.tox_level => {
            debug!(chat_id, user_id, score, "message below toxicity threshold");
            return;
        }
        Ok(_) => {}
        Err(source) => {
            error!(?source, chat_id, "failed to read chat config");
            return;
        }
    }

    let is_admin = match is_chat_admin(&ctx.http, guild_id, message.author.id).await {
        Ok(is_admin) => is_admin,
        Err(source) => {
            warn!(?source, chat_id, user_id, "failed to resolve member permissions; using member ladder");
            false
        }
    };

    let display_name = author_display_name(message);
    let violation = Violation {
        chat_id,
        user_id,
        is_admin,
        score,
        now: now_unix_secs(),
        display_name: &display_name,
    };

    let actions = match decide(&data.store, &violation).await {
        Ok(actions) => actions,
        Err(source) => {
            error!(?source, chat_id, user_id, "failed to decide moderation actions");
            return;
        }
    };

    apply_actions(&ctx.http, message, guild_id, &actions).await;
}

/// Re-score a message whose text was edited.
pub async fn handle_message_update_toxicity(
    ctx: &serenity::Context,
    data: &Data,
    new: Option<&serenity::Message>,
    event: &serenity::MessageUpdateEvent,
) {
    let Some(guild_id) = edited_text_guild(event) else {
        return;
    };

    let mut message = match new {
        Some(message) => message.clone(),
        None => match event.channel_id.message(&ctx.http, event.id).await {
            Ok(message) => message,
            Err(source) => {
                error!(?source, message_id = %event.id, "failed to fetch edited message");
                return;
            }
        },
    };
    // Messages fetched over HTTP carry no guild id.
    message.guild_id = Some(guild_id);

    handle_message_toxicity(ctx, data, &message).await;
}

/// Guild of an edit that changed a user's message text, if any.
///
/// Embed unfurls and pin changes also arrive as updates but carry no content.
fn edited_text_guild(event: &serenity::MessageUpdateEvent) -> Option<serenity::GuildId> {
    event.content.as_ref()?;
    if event.author.as_ref().is_some_and(|author| author.bot) {
        return None;
    }
    event.guild_id
}
