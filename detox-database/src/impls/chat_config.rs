use anyhow::Context as _;

use crate::cache::CONFIG_CACHE_TTL;
use crate::database::Database;
use crate::model::{ChatConfig, RuleSet};
use crate::rules_text::{parse_rules, render_rules};

#[derive(sqlx::FromRow)]
struct ChatConfigRow {
    tox_level: f32,
    rules_user: Option<String>,
    rules_admin: Option<String>,
}

/// Load a chat's moderation config, or `None` if the chat never configured one.
pub async fn get_chat_config(db: &Database, chat_id: u64) -> anyhow::Result<Option<ChatConfig>> {
    let cache_key = db.cache().chat_config_key(chat_id);
    db.cache()
        .get_or_load_json(&cache_key, CONFIG_CACHE_TTL, || async {
            let chat_id_i64 = i64::try_from(chat_id).context("chat_id out of i64 range")?;

            let row = sqlx::query_as::<_, ChatConfigRow>(
                "SELECT tox_level, rules_user, rules_admin FROM chat_config WHERE chat_id = $1",
            )
            .bind(chat_id_i64)
            .fetch_optional(db.pool())
            .await?;

            row.map(|row| {
                Ok::<_, anyhow::Error>(ChatConfig {
                    tox_level: row.tox_level,
                    rules_user: stored_rules(row.rules_user.as_deref(), "rules_user")?,
                    rules_admin: stored_rules(row.rules_admin.as_deref(), "rules_admin")?,
                })
            })
            .transpose()
        })
        .await
}

/// Replace a chat's moderation config.
pub async fn put_chat_config(db: &Database, chat_id: u64, config: &ChatConfig) -> anyhow::Result<()> {
    let chat_id_i64 = i64::try_from(chat_id).context("chat_id out of i64 range")?;
    let rules_user = config.rules_user.as_deref().map(render_rules);
    let rules_admin = config.rules_admin.as_deref().map(render_rules);

    sqlx::query(
        "INSERT INTO chat_config (chat_id, tox_level, rules_user, rules_admin)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (chat_id) DO UPDATE SET
             tox_level = EXCLUDED.tox_level,
             rules_user = EXCLUDED.rules_user,
             rules_admin = EXCLUDED.rules_admin",
    )
    .bind(chat_id_i64)
    .bind(config.tox_level)
    .bind(rules_user)
    .bind(rules_admin)
    .execute(db.pool())
    .await?;

    db.cache().invalidate_chat_config(chat_id).await?;

    Ok(())
}

fn stored_rules(text: Option<&str>, column: &str) -> anyhow::Result<Option<RuleSet>> {
    text.map(|text| parse_rules(text).with_context(|| format!("stored {column} is invalid")))
        .transpose()
}
