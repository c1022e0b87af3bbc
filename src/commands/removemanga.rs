//! Implements the `/removemanga` command.

use tracing::instrument;

use crate::data::GetData;
use crate::data::MangaId;
use crate::error::UserError;
use crate::BotError;
use crate::Context;

/// Remove a manga from tracking.
#[instrument(skip(ctx))]
#[poise::command(slash_command, ephemeral)]
pub async fn removemanga(
    ctx: Context<'_>,
    #[description = "The MangaDex URL of the manga to remove."] url: String,
) -> Result<(), BotError> {
    let id = MangaId::from_url(&url).ok_or(UserError::InvalidMangaUrl)?;

    let store = ctx.data().tracker.store();
    if !store.remove(&ctx.list_key(), &id).await? {
        return Err(UserError::NotTracked.into());
    }

    ctx.say("Manga removed from your tracking list.").await?;
    Ok(())
}
