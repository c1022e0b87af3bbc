//! Implements the `/addmanga` command.
//!
//! Adds a manga to the author's tracking list, identified by its MangaDex url.

use tracing::instrument;

use crate::data::GetData;
use crate::data::MangaId;
use crate::error::UserError;
use crate::BotError;
use crate::Context;

/// Add a new manga URL to track.
#[instrument(skip(ctx))]
#[poise::command(slash_command, ephemeral)]
pub async fn addmanga(
    ctx: Context<'_>,
    #[description = "The MangaDex URL of the manga."] url: String,
) -> Result<(), BotError> {
    let id = MangaId::from_url(&url).ok_or(UserError::InvalidMangaUrl)?;

    let store = ctx.data().tracker.store();
    if !store.add(&ctx.list_key(), id).await? {
        return Err(UserError::AlreadyTracked.into());
    }

    ctx.say("Manga added to your tracking list.").await?;
    Ok(())
}
