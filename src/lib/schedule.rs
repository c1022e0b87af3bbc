//! The daily update check.
//!
//! On every trigger each tracking list is checked:
//! - per-user lists send their updates to the user's DMs,
//! - the shared list posts its updates to the configured channel.

use std::sync::Arc;

use serenity::ChannelId;
use serenity::Http;
use tokio_cron_scheduler::Job;
use tokio_cron_scheduler::JobScheduler;
use tracing::instrument;

use super::mangadex::MangaDex;
use super::notify::ChannelPost;
use super::notify::DirectMessage;
use super::updates::Tracker;
use crate::data::ListKey;
use crate::data::ListMode;
use crate::error::BotError;
use crate::serenity;

/// Everything a scheduled check needs.
#[derive(Debug, Clone)]
pub struct DailyCheck {
    pub tracker: Tracker<MangaDex>,
    pub list_mode: ListMode,
    /// Destination of shared list updates.
    pub channel: Option<ChannelId>,
}

/// Start running `check` on the `cron` schedule (6 fields, UTC).
pub async fn start(cron: &str, http: Arc<Http>, check: DailyCheck) -> Result<(), BotError> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let http = http.clone();
        let check = check.clone();

        Box::pin(async move {
            check.run(&http).await;
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    tracing::info!("Daily update check scheduled on '{cron}'.");
    Ok(())
}

impl DailyCheck {
    /// Check every list once. Errors are logged.
    #[instrument(skip_all)]
    pub async fn run(&self, http: &Arc<Http>) {
        tracing::info!("Running scheduled update check.");

        let keys = match self.tracker.store().keys().await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!("Failed to list tracking lists. {e}");
                return;
            }
        };

        let mut sent = 0;
        for target in targets(self.list_mode, self.channel, keys) {
            let result = match target {
                Target::User(user) => {
                    let notifier = DirectMessage::new(http.clone(), user);
                    self.tracker
                        .check_and_notify(&ListKey::User(user), &notifier)
                        .await
                }
                Target::Channel(channel) => {
                    let notifier = ChannelPost::new(http.clone(), channel);
                    self.tracker.check_and_notify(&ListKey::Shared, &notifier).await
                }
            };

            match result {
                Ok(count) => sent += count,
                Err(e) => tracing::error!("Scheduled check of {target:?} failed. {e}"),
            }
        }

        tracing::info!("Scheduled update check sent {sent} updates.");
    }
}

/// Where the updates of a list go.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Target {
    User(serenity::UserId),
    Channel(ChannelId),
}

/// Pair the stored lists with their destination. Lists that don't
/// belong to the current [ListMode] are ignored.
fn targets(mode: ListMode, channel: Option<ChannelId>, keys: Vec<ListKey>) -> Vec<Target> {
    match mode {
        ListMode::PerUser => keys
            .into_iter()
            .filter_map(|key| match key {
                ListKey::User(user) => Some(Target::User(user)),
                ListKey::Shared => None,
            })
            .collect(),
        ListMode::Shared => match channel {
            Some(channel) => vec![Target::Channel(channel)],
            None => {
                tracing::warn!("Shared list has no update channel configured, skipping.");
                vec![]
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serenity::UserId;

    #[test]
    fn per_user_mode_targets_each_user() {
        let alice = UserId::new(1);
        let bob = UserId::new(2);
        let keys = vec![ListKey::User(alice), ListKey::User(bob), ListKey::Shared];

        assert_eq!(
            targets(ListMode::PerUser, None, keys),
            vec![Target::User(alice), Target::User(bob)]
        );
    }

    #[test]
    fn shared_mode_posts_to_channel() {
        let channel = ChannelId::new(10);
        let keys = vec![ListKey::User(UserId::new(1))];
        assert_eq!(
            targets(ListMode::Shared, Some(channel), keys),
            vec![Target::Channel(channel)]
        );
    }

    #[test]
    fn shared_mode_without_channel_does_nothing() {
        assert!(targets(ListMode::Shared, None, vec![ListKey::Shared]).is_empty());
    }

    #[tokio::test]
    async fn invalid_cron_is_rejected() {
        let result = Job::new_async("every day at noon", |_uuid, _lock| Box::pin(async {}));
        assert!(result.is_err());
    }
}
