use poise::serenity_prelude as serenity;

use crate::CommandMeta;
use crate::moderation::embeds::{admin_only_message, guild_only_message};
use detox_core::{Context, Error};
use detox_database::model::{ChatConfig, RuleSet};
use detox_database::{ChatStore, parse_rules, render_rules, update_config};
use detox_utils::embed::build_field_embed;
use detox_utils::formatting::score_percent;
use detox_utils::parse::parse_percent;
use detox_utils::permissions::is_chat_admin;

pub const META: CommandMeta = CommandMeta {
    name: "configure",
    desc: "Show or change this server's toxicity settings.",
    category: "moderation",
    usage: "!configure <show|toxlevel|userrules|adminrules|reset>",
};

/// How to write a ladder, shown with the rule commands and `show`.
pub const RULES_FORMAT_HELP: &str = "A JSON list of tiers, mildest first. Keys: \
`warn` reply text (`{score}` = toxicity %), \
`delete` 0 or 1, \
`mute_time` / `ban_time` / `reset_time` durations like `1h30m0s`, `10m`, `45s`. \
Example: `[{\"warn\": \"careful\", \"reset_time\": \"1h\"}, {\"warn\": \"muted\", \"mute_time\": \"10m\"}]`";

/// Which of the two escalation ladders a subcommand targets.
#[derive(Clone, Copy, Debug, poise::ChoiceParameter)]
pub enum Ladder {
    #[name = "user"]
    User,
    #[name = "admin"]
    Admin,
}

impl Ladder {
    fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Admin => "Admin",
        }
    }

    fn slot(self, config: &mut ChatConfig) -> &mut Option<RuleSet> {
        match self {
            Self::User => &mut config.rules_user,
            Self::Admin => &mut config.rules_admin,
        }
    }
}

/// Show or change this server's toxicity settings.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Moderation",
    subcommands("show", "toxlevel", "userrules", "adminrules", "reset")
)]
pub async fn configure(ctx: Context<'_>) -> Result<(), Error> {
    show_config(ctx).await
}

/// Show the current threshold and ladders.
#[poise::command(prefix_command, slash_command, category = "Moderation")]
pub async fn show(ctx: Context<'_>) -> Result<(), Error> {
    show_config(ctx).await
}

/// Set the toxicity threshold as a percentage.
#[poise::command(prefix_command, slash_command, category = "Moderation")]
pub async fn toxlevel(
    ctx: Context<'_>,
    #[description = "Threshold from 0 to 100"] level: String,
) -> Result<(), Error> {
    let Some(chat_id) = admin_chat_id(ctx).await? else {
        return Ok(());
    };

    let Some(percent) = parse_percent(&level) else {
        ctx.say("Invalid value. Must be an integer from 0 to 100.")
            .await?;
        return Ok(());
    };

    update_config(&ctx.data().store, chat_id, |config| {
        config.tox_level = f32::from(percent) / 100.0;
    })
    .await?;

    ctx.say(format!("Tox level is now **{}%**.", percent)).await?;
    Ok(())
}

/// Replace the ladder applied to regular members.
#[poise::command(prefix_command, slash_command, category = "Moderation")]
pub async fn userrules(
    ctx: Context<'_>,
    #[description = "JSON list of tiers: warn, delete (0/1), mute_time, ban_time, reset_time (e.g. 10m)"]
    #[rest]
    rules: String,
) -> Result<(), Error> {
    set_ladder(ctx, Ladder::User, &rules).await
}

/// Replace the ladder applied to administrators.
#[poise::command(prefix_command, slash_command, category = "Moderation")]
pub async fn adminrules(
    ctx: Context<'_>,
    #[description = "JSON list of tiers: warn, delete (0/1), mute_time, ban_time, reset_time (e.g. 10m)"]
    #[rest]
    rules: String,
) -> Result<(), Error> {
    set_ladder(ctx, Ladder::Admin, &rules).await
}

/// Drop a custom ladder and go back to the default one.
#[poise::command(prefix_command, slash_command, category = "Moderation")]
pub async fn reset(
    ctx: Context<'_>,
    #[description = "Which ladder to reset"] ladder: Ladder,
) -> Result<(), Error> {
    let Some(chat_id) = admin_chat_id(ctx).await? else {
        return Ok(());
    };

    let config = update_config(&ctx.data().store, chat_id, |config| {
        *ladder.slot(config) = None;
    })
    .await?;

    ctx.say(format!(
        "{} rules reset to `{}`.",
        ladder.label(),
        render_rules(config.rules_for(matches!(ladder, Ladder::Admin)))
    ))
    .await?;
    Ok(())
}

async fn show_config(ctx: Context<'_>) -> Result<(), Error> {
    let Some(chat_id) = admin_chat_id(ctx).await? else {
        return Ok(());
    };

    let config = ctx.data().store.get_config(chat_id).await?;
    let embed = build_field_embed(
        "Detox Config",
        &[
            ("Tox Level", format!("{}%", score_percent(config.tox_level))),
            ("User Rules", ladder_field(&config, Ladder::User)),
            ("Admin Rules", ladder_field(&config, Ladder::Admin)),
            ("Rule Format", RULES_FORMAT_HELP.to_owned()),
        ],
    )
    .footer(serenity::CreateEmbedFooter::new(
        "Subcommands: show, toxlevel, userrules, adminrules, reset",
    ));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

async fn set_ladder(ctx: Context<'_>, ladder: Ladder, text: &str) -> Result<(), Error> {
    let Some(chat_id) = admin_chat_id(ctx).await? else {
        return Ok(());
    };

    let rules = match parse_rules(text) {
        Ok(rules) => rules,
        Err(err) => {
            ctx.say(format!("Invalid value: {}\n{}", err, RULES_FORMAT_HELP))
                .await?;
            return Ok(());
        }
    };

    let rendered = render_rules(&rules);
    update_config(&ctx.data().store, chat_id, |config| {
        *ladder.slot(config) = Some(rules);
    })
    .await?;

    ctx.say(format!("{} rules set to `{}`.", ladder.label(), rendered))
        .await?;
    Ok(())
}

fn ladder_field(config: &ChatConfig, ladder: Ladder) -> String {
    let (rules, custom) = match ladder {
        Ladder::User => (config.rules_for(false), config.rules_user.is_some()),
        Ladder::Admin => (config.rules_for(true), config.rules_admin.is_some()),
    };
    let origin = if custom { "" } else { " (default)" };
    format!("`{}`{}", render_rules(rules), origin)
}

/// Guild id of the invoking server if the author may configure it.
async fn admin_chat_id(ctx: Context<'_>) -> Result<Option<u64>, Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(None);
    };

    if !is_chat_admin(ctx.http(), guild_id, ctx.author().id).await? {
        ctx.say(admin_only_message()).await?;
        return Ok(None);
    }

    Ok(Some(guild_id.get()))
}

#[cfg(test)]
mod tests {
    use detox_database::parse_rules;

    use super::RULES_FORMAT_HELP;

    #[test]
    fn format_help_names_every_key_and_its_example_parses() {
        for key in ["warn", "{score}", "delete", "mute_time", "ban_time", "reset_time"] {
            assert!(RULES_FORMAT_HELP.contains(key), "missing {key}");
        }

        let (_, example) = RULES_FORMAT_HELP.rsplit_once("Example: `").unwrap();
        let rules = parse_rules(example.trim_end_matches('`')).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].reset_time, 3_600);
        assert_eq!(rules[1].mute_time, 600);
    }
}
