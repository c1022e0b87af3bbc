use poise::CreateReply;
use serenity::CreateEmbed;

use crate::serenity;
use crate::BotError;
use crate::Context;

/// Shown by `/version`.
const BOT_VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

/// Display the current version of the bot.
#[poise::command(slash_command, ephemeral)]
pub async fn version(ctx: Context<'_>) -> Result<(), BotError> {
    let embed = CreateEmbed::new()
        .title("Manga Tracker")
        .description(format!("The current version of the bot is **{BOT_VERSION}**."))
        .color(serenity::Colour::new(0x3498db));

    ctx.send(CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
