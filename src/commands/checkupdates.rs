//! Implements the `/checkupdates` command.
//!
//! Looks for new chapters of the author's tracked manga right away and
//! sends each one to the author's DMs.

use tracing::instrument;

use crate::data::GetData;
use crate::error::UserError;
use crate::lib::notify::DirectMessage;
use crate::BotError;
use crate::Context;

/// Manually check for manga updates and send them via DM.
#[instrument(skip(ctx))]
#[poise::command(slash_command, ephemeral, user_cooldown = 30)]
pub async fn checkupdates(ctx: Context<'_>) -> Result<(), BotError> {
    // Fetching takes a while, discord wants an answer within 3 seconds.
    ctx.defer_ephemeral().await?;

    let tracker = &ctx.data().tracker;
    let key = ctx.list_key();

    let updates = tracker.check(&key).await?;
    if updates.is_empty() {
        ctx.say("No updates found for your tracked manga.").await?;
        return Ok(());
    }

    let http = ctx.serenity_context().http.clone();
    let notifier = DirectMessage::new(http, ctx.author().id);
    // Undelivered updates are found again on the next check.
    let sent = tracker.deliver(&key, &updates, &notifier).await;
    tracing::debug!("Sent {sent} of {} updates.", updates.len());

    if sent == 0 {
        return Err(UserError::CannotDm.into());
    }

    ctx.say("Checked for updates! Please check your DMs.").await?;
    Ok(())
}
