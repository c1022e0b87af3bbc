//! Chapters already announced since the bot started.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::ListKey;
use crate::lib::updates::ChapterUpdate;

/// Remembers which chapters each tracking list was told about.
/// Lives in memory only, a restart announces the latest chapters again.
/// Internally uses an [Arc], so it's cheap to clone.
#[derive(Debug, Default, Clone)]
pub struct SeenChapters {
    #[allow(clippy::missing_docs_in_private_items)]
    inner: Arc<Mutex<HashMap<ListKey, HashSet<String>>>>,
}

impl SeenChapters {
    /// Keep only updates whose chapter `key` hasn't seen, in order.
    pub async fn unseen(&self, key: &ListKey, updates: Vec<ChapterUpdate>) -> Vec<ChapterUpdate> {
        let map = self.inner.lock().await;
        let seen = map.get(key);

        let mut batch = HashSet::new();
        updates
            .into_iter()
            .filter(|update| seen.map_or(true, |seen| !seen.contains(&update.chapter_id)))
            .filter(|update| batch.insert(update.chapter_id.clone()))
            .collect()
    }

    /// Remember that `key` was told about `updates`.
    pub async fn mark<'a>(&self, key: &ListKey, updates: impl IntoIterator<Item = &'a ChapterUpdate>) {
        let mut map = self.inner.lock().await;
        let seen = map.entry(*key).or_default();
        seen.extend(updates.into_iter().map(|update| update.chapter_id.clone()));
    }
}
