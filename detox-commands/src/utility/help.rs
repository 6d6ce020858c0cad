use detox_utils::embed::DEFAULT_EMBED_COLOR;
use poise::serenity_prelude as serenity;

use crate::utility::embeds::{grouped_help_description, unknown_category_message};
use crate::{COMMANDS, CommandMeta};
use detox_core::{Context, Error};

pub const META: CommandMeta = CommandMeta {
    name: "help",
    desc: "Lists out all available commands.",
    category: "utility",
    usage: "!help [category]",
};

#[poise::command(prefix_command, slash_command, category = "Utility")]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Category"] category: Option<String>,
) -> Result<(), Error> {
    let category = category.as_deref().map(str::trim).filter(|c| !c.is_empty());

    let mut categories: Vec<&str> = COMMANDS.iter().map(|c| c.category).collect();
    categories.sort_unstable();
    categories.dedup();

    if let Some(wanted_category) = category
        && !categories.contains(&wanted_category)
    {
        ctx.say(unknown_category_message(wanted_category, &categories))
            .await?;
        return Ok(());
    }

    let commands = sorted_commands(category);
    let embed = serenity::CreateEmbed::new()
        .title("Available Commands")
        .description(grouped_help_description(&commands))
        .color(DEFAULT_EMBED_COLOR);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

pub(crate) fn sorted_commands(category: Option<&str>) -> Vec<&'static CommandMeta> {
    let mut filtered: Vec<&'static CommandMeta> = COMMANDS
        .iter()
        .filter(|cmd| match category {
            Some(wanted) => cmd.category == wanted,
            None => true,
        })
        .collect();

    filtered.sort_unstable_by(|left, right| {
        left.category
            .cmp(right.category)
            .then_with(|| left.name.cmp(right.name))
    });

    filtered
}

#[cfg(test)]
mod tests {
    use super::sorted_commands;

    #[test]
    fn commands_are_grouped_by_category_then_name() {
        let names = sorted_commands(None)
            .iter()
            .map(|cmd| cmd.name)
            .collect::<Vec<_>>();
        assert_eq!(names, ["configure", "help", "start"]);

        let utility = sorted_commands(Some("utility"))
            .iter()
            .map(|cmd| cmd.name)
            .collect::<Vec<_>>();
        assert_eq!(utility, ["help", "start"]);
    }
}
