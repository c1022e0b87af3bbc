//! This module contains everything relating to [Data].

mod seen_chapters;
mod tracking;

use std::collections::HashSet;

use reqwest::Client;
use serenity::UserId;

use crate::lib::mangadex::MangaDex;
use crate::lib::updates::Tracker;
use crate::serenity;
use crate::Context;
pub use seen_chapters::SeenChapters;
pub use tracking::MangaId;
pub use tracking::TrackingList;
pub use tracking::TrackingStore;

#[cfg(test)]
pub(crate) use tracking::tests::temp_store;

/// The data kept between shards
#[derive(Debug)]
pub struct Data {
    /// List of users to send bug notifications
    pub notify_list: HashSet<UserId>,
    /// Tracking lists and the update pipeline, shared with the daily check.
    pub tracker: Tracker<MangaDex>,
    /// Who owns a tracking list.
    pub list_mode: ListMode,
}

/// Identifies a tracking list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListKey {
    /// The personal list of a user.
    User(UserId),
    /// The one list everyone shares.
    Shared,
}

/// Whether users get their own lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    PerUser,
    Shared,
}

impl ListMode {
    /// The list `user` works with.
    pub fn key_for(self, user: UserId) -> ListKey {
        match self {
            ListMode::PerUser => ListKey::User(user),
            ListMode::Shared => ListKey::Shared,
        }
    }
}

/// Is able to get the author's [ListKey] and a [Client].
pub trait GetData {
    /// The tracking list of the command author.
    fn list_key(&self) -> ListKey;
    /// The [Client] shared with the MangaDex api.
    fn http_client(&self) -> Client;
}

impl GetData for Context<'_> {
    fn list_key(&self) -> ListKey {
        self.data().list_mode.key_for(self.author().id)
    }

    fn http_client(&self) -> Client {
        // Client internally uses an Arc, so this is cheap to clone
        self.data().tracker.source().http_client()
    }
}
