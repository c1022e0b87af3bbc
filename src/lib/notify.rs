//! Delivering chapter updates to discord.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::ChannelId;
use serenity::CreateMessage;
use serenity::Http;
use serenity::UserId;

use super::updates::ChapterUpdate;
use crate::error::BotError;
use crate::serenity;

/// Somewhere chapter updates can be sent.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, update: &ChapterUpdate) -> Result<(), BotError>;
}

/// Sends updates to a user's DMs.
pub struct DirectMessage {
    http: Arc<Http>,
    user: UserId,
}

impl DirectMessage {
    pub fn new(http: Arc<Http>, user: UserId) -> Self {
        Self { http, user }
    }
}

#[async_trait]
impl Notifier for DirectMessage {
    async fn notify(&self, update: &ChapterUpdate) -> Result<(), BotError> {
        let message = CreateMessage::new().content(update.to_string());
        self.user.direct_message(self.http.as_ref(), message).await?;
        Ok(())
    }
}

/// Posts updates in a channel.
pub struct ChannelPost {
    http: Arc<Http>,
    channel: ChannelId,
}

impl ChannelPost {
    pub fn new(http: Arc<Http>, channel: ChannelId) -> Self {
        Self { http, channel }
    }
}

#[async_trait]
impl Notifier for ChannelPost {
    async fn notify(&self, update: &ChapterUpdate) -> Result<(), BotError> {
        let message = CreateMessage::new().content(update.to_string());
        self.channel.send_message(self.http.as_ref(), message).await?;
        Ok(())
    }
}

/// Send every update. A failed send is logged and doesn't stop the rest.
/// Returns the updates that were sent.
pub async fn notify_all<'a>(
    notifier: &impl Notifier,
    updates: &'a [ChapterUpdate],
) -> Vec<&'a ChapterUpdate> {
    let mut sent = Vec::with_capacity(updates.len());
    for update in updates {
        match notifier.notify(update).await {
            Ok(()) => sent.push(update),
            Err(e) => tracing::error!("Failed to send update for {}. {e}", update.manga_id),
        }
    }
    sent
}
