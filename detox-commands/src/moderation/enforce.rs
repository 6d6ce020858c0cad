//! Applies escalation decisions to a Discord message and its author.

use std::sync::Arc;
use std::time::Duration;

use poise::serenity_prelude as serenity;
use tracing::{error, info, warn};

use detox_utils::time::now_unix_secs;

use crate::moderation::actions::ModerationAction;
use crate::moderation::embeds::is_missing_permissions_error;

/// Discord refuses communication timeouts longer than 28 days.
pub const MAX_TIMEOUT_SECS: i64 = 28 * 86_400;

/// Apply `actions` in order. A failed action is logged and does not stop the rest.
pub async fn apply_actions(
    http: &Arc<serenity::Http>,
    message: &serenity::Message,
    guild_id: serenity::GuildId,
    actions: &[ModerationAction],
) {
    for action in actions {
        let result = match action {
            ModerationAction::Reply(text) => message.reply(http, text).await.map(|_| ()),
            ModerationAction::Delete => message.delete(http).await,
            ModerationAction::Restrict { until } => {
                restrict_member(http, guild_id, message.author.id, *until).await
            }
            ModerationAction::Ban { until } => {
                ban_member(http, guild_id, message.author.id, *until).await
            }
        };

        if let Err(source) = result {
            if is_missing_permissions_error(&source) {
                warn!(
                    user_id = %message.author.id,
                    guild_id = %guild_id,
                    action = action.label(),
                    "missing permissions to apply moderation action (check role hierarchy)"
                );
            } else {
                error!(?source, action = action.label(), "failed to apply moderation action");
            }
        }
    }
}

/// Clamp a restriction expiry to the longest timeout Discord accepts.
pub fn clamp_timeout_until(until: i64, now: i64) -> i64 {
    until.min(now.saturating_add(MAX_TIMEOUT_SECS))
}

async fn restrict_member(
    http: &Arc<serenity::Http>,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    until: i64,
) -> Result<(), serenity::Error> {
    let until = clamp_timeout_until(until, now_unix_secs());
    let Ok(until) = serenity::Timestamp::from_unix_timestamp(until) else {
        warn!(until, "restriction expiry out of range; skipping timeout");
        return Ok(());
    };

    let edit = serenity::EditMember::new().disable_communication_until_datetime(until);
    guild_id.edit_member(http, user_id, edit).await?;
    Ok(())
}

async fn ban_member(
    http: &Arc<serenity::Http>,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    until: i64,
) -> Result<(), serenity::Error> {
    guild_id.ban(http, user_id, 0).await?;

    let delay = u64::try_from(until.saturating_sub(now_unix_secs())).unwrap_or(0);
    info!(
        user_id = %user_id,
        guild_id = %guild_id,
        unban_in_secs = delay,
        "member banned; unban scheduled"
    );

    // Scheduled unbans are lost on restart.
    let http = Arc::clone(http);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(delay)).await;
        if let Err(source) = guild_id.unban(&http, user_id).await {
            error!(?source, user_id = %user_id, "failed to lift temporary ban");
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{MAX_TIMEOUT_SECS, clamp_timeout_until};

    #[test]
    fn long_restrictions_are_clamped() {
        assert_eq!(clamp_timeout_until(1_600, 1_000), 1_600);
        assert_eq!(
            clamp_timeout_until(1_000 + 90 * 86_400, 1_000),
            1_000 + MAX_TIMEOUT_SECS
        );
    }
}
