//! Implements the `/exportmanga` command.
//!
//! The author's tracking list is sent to their DMs as a JSON file that
//! `/importmanga` accepts.

use serenity::CreateAttachment;
use serenity::CreateMessage;
use tracing::instrument;

use crate::data::GetData;
use crate::error::UserError;
use crate::serenity;
use crate::BotError;
use crate::Context;

/// Name of the attached file.
const EXPORT_FILE_NAME: &str = "manga.json";

/// Export your manga tracking list as a file.
#[instrument(skip(ctx))]
#[poise::command(slash_command, ephemeral)]
pub async fn exportmanga(ctx: Context<'_>) -> Result<(), BotError> {
    let json = ctx.data().tracker.store().export(&ctx.list_key()).await?;

    let file = CreateAttachment::bytes(json, EXPORT_FILE_NAME);
    let message = CreateMessage::new().add_file(file);

    if let Err(e) = ctx.author().direct_message(ctx, message).await {
        tracing::warn!("Failed to DM export to {}. {e}", ctx.author().name);
        return Err(UserError::CannotDm.into());
    }

    ctx.say("Your manga tracking list has been exported and sent via DM.")
        .await?;
    Ok(())
}
