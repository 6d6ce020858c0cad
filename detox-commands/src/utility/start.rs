use detox_core::{Context, Error};

use crate::CommandMeta;
use crate::utility::embeds::command_list;

pub const META: CommandMeta = CommandMeta {
    name: "start",
    desc: "Introduces the bot.",
    category: "utility",
    usage: "!start",
};

#[poise::command(prefix_command, slash_command, category = "Utility")]
pub async fn start(ctx: Context<'_>) -> Result<(), Error> {
    let greeting = if ctx.guild_id().is_some() {
        format!(
            "Hello, I'm Detox. I can help you deal with toxicity in this server.\n{}",
            command_list()
        )
    } else {
        "Hello, I'm Detox. I can help you deal with toxicity in your server. \
         You should add me there first."
            .to_owned()
    };

    ctx.say(greeting).await?;
    Ok(())
}
