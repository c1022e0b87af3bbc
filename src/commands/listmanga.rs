//! Implements the `/listmanga` command.
//!
//! The bot responds with an embed listing the titles of all tracked manga.

use poise::CreateReply;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;
use tracing::instrument;

use crate::data::GetData;
use crate::serenity;
use crate::BotError;
use crate::Context;

/// An embed description has a limit of 4096 chars.
const EMBED_DESCRIPTION_LIMIT: usize = 4096;

/// List all tracked manga.
#[instrument(skip(ctx))]
#[poise::command(slash_command, ephemeral, user_cooldown = 5)]
pub async fn listmanga(ctx: Context<'_>) -> Result<(), BotError> {
    // Looking up every title takes a while.
    ctx.defer_ephemeral().await?;

    let titles = ctx.data().tracker.titles(&ctx.list_key()).await?;

    let embed = if titles.is_empty() {
        CreateEmbed::new()
            .title("Tracked Manga")
            .description("You are not tracking any manga.")
            .color(serenity::Colour::RED)
            .footer(CreateEmbedFooter::new("Use /addmanga to start tracking manga!"))
    } else {
        CreateEmbed::new()
            .title("📚 Your Tracked Manga List")
            .description(numbered_list(&titles))
            .color(serenity::Colour::new(0x3498db))
            .footer(CreateEmbedFooter::new(format!("Total Manga: {}", titles.len())))
    };

    ctx.send(CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// `**1.** title` lines, cut off before the embed limit.
fn numbered_list(titles: &[String]) -> String {
    let mut buffer = String::new();
    for (index, title) in titles.iter().enumerate() {
        let next_line = format!("**{}.** {title}", index + 1);

        // +1 for the newline
        if buffer.chars().count() + next_line.chars().count() + 1 > EMBED_DESCRIPTION_LIMIT {
            break;
        }
        if !buffer.is_empty() {
            buffer.push('\n');
        }
        buffer.push_str(&next_line);
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_numbered_from_one() {
        let titles = ["Berserk".to_string(), "Vagabond".to_string()];
        assert_eq!(numbered_list(&titles), "**1.** Berserk\n**2.** Vagabond");
    }

    #[test]
    fn long_lists_fit_in_an_embed() {
        let titles: Vec<String> = (0..500).map(|i| format!("Manga number {i}")).collect();
        let list = numbered_list(&titles);

        assert!(list.chars().count() <= EMBED_DESCRIPTION_LIMIT);
        assert!(list.starts_with("**1.** Manga number 0\n"));
        assert!(!list.contains("Manga number 499"));
    }
}
