use anyhow::Context as _;

use crate::database::Database;
use crate::model::UserModerationState;

#[derive(sqlx::FromRow)]
struct UserStateRow {
    last_applied_at: i64,
    tier_index: i32,
    applied_tier: Option<i32>,
}

/// Load a user's ladder position in a chat, or `None` if they never violated.
pub async fn get_user_state(
    db: &Database,
    chat_id: u64,
    user_id: u64,
) -> anyhow::Result<Option<UserModerationState>> {
    let chat_id_i64 = i64::try_from(chat_id).context("chat_id out of i64 range")?;
    let user_id_i64 = i64::try_from(user_id).context("user_id out of i64 range")?;

    let row = sqlx::query_as::<_, UserStateRow>(
        "SELECT last_applied_at, tier_index, applied_tier
         FROM user_moderation_state
         WHERE chat_id = $1 AND user_id = $2",
    )
    .bind(chat_id_i64)
    .bind(user_id_i64)
    .fetch_optional(db.pool())
    .await?;

    row.map(|row| {
        Ok::<_, anyhow::Error>(UserModerationState {
            last_applied_at: row.last_applied_at,
            tier_index: usize::try_from(row.tier_index).context("tier_index out of range")?,
            applied_tier: row
                .applied_tier
                .map(usize::try_from)
                .transpose()
                .context("applied_tier out of range")?,
        })
    })
    .transpose()
}

/// Store a user's ladder position in a chat.
pub async fn put_user_state(
    db: &Database,
    chat_id: u64,
    user_id: u64,
    state: &UserModerationState,
) -> anyhow::Result<()> {
    let chat_id_i64 = i64::try_from(chat_id).context("chat_id out of i64 range")?;
    let user_id_i64 = i64::try_from(user_id).context("user_id out of i64 range")?;
    let tier_index = i32::try_from(state.tier_index).context("tier_index out of i32 range")?;
    let applied_tier = state
        .applied_tier
        .map(i32::try_from)
        .transpose()
        .context("applied_tier out of i32 range")?;

    sqlx::query(
        "INSERT INTO user_moderation_state (chat_id, user_id, last_applied_at, tier_index, applied_tier)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (chat_id, user_id) DO UPDATE SET
             last_applied_at = EXCLUDED.last_applied_at,
             tier_index = EXCLUDED.tier_index,
             applied_tier = EXCLUDED.applied_tier",
    )
    .bind(chat_id_i64)
    .bind(user_id_i64)
    .bind(state.last_applied_at)
    .bind(tier_index)
    .bind(applied_tier)
    .execute(db.pool())
    .await?;

    Ok(())
}
