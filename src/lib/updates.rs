//! Finding new chapters of tracked manga.
//!
//! Checking a list runs three steps:
//! - load the tracking list from the [TrackingStore],
//! - ask the [ChapterSource] for each manga's latest chapter,
//! - drop chapters the list was already told about ([SeenChapters]).

use std::fmt::Display;

use async_trait::async_trait;
use futures::future;
use futures::stream;
use futures::StreamExt;
use tracing::instrument;

use super::mangadex::Chapter;
use super::notify::notify_all;
use super::notify::Notifier;
use crate::data::ListKey;
use crate::data::MangaId;
use crate::data::SeenChapters;
use crate::data::TrackingList;
use crate::data::TrackingStore;
use crate::error::BotError;

/// Shown when a manga's title can't be found.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// How many manga are looked up at once.
const CONCURRENT_REQUESTS: usize = 4;

/// Where chapter information comes from.
#[async_trait]
pub trait ChapterSource: Send + Sync {
    /// Display title of a manga.
    async fn manga_title(&self, id: &MangaId) -> Result<String, BotError>;
    /// The newest chapter of a manga, if it has any.
    async fn latest_chapter(&self, id: &MangaId) -> Result<Option<Chapter>, BotError>;
    /// Where users can read a chapter.
    fn chapter_link(&self, chapter: &Chapter) -> String;
}

/// A new chapter of a tracked manga.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterUpdate {
    pub manga_id: MangaId,
    /// Title of the manga.
    pub title: String,
    /// Chapter number, `None` for oneshots.
    pub chapter: Option<String>,
    pub chapter_id: String,
    pub link: String,
}

impl Display for ChapterUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let chapter = self.chapter.as_deref().unwrap_or("Oneshot");
        write!(
            f,
            "**{}** - Chapter {chapter}\nRead here: {}",
            self.title, self.link
        )
    }
}

/// The latest chapter of one manga as an update.
/// Lookup failures are logged and give `None`.
#[instrument(skip(source), fields(manga = %id))]
pub async fn fetch_update(source: &impl ChapterSource, id: &MangaId) -> Option<ChapterUpdate> {
    let chapter = match source.latest_chapter(id).await {
        Ok(Some(chapter)) => chapter,
        Ok(None) => {
            tracing::debug!("No chapters found.");
            return None;
        }
        Err(e) => {
            tracing::warn!("Failed to fetch latest chapter. {e}");
            return None;
        }
    };

    let title = source.manga_title(id).await.unwrap_or_else(|e| {
        tracing::warn!("Failed to fetch title. {e}");
        UNKNOWN_TITLE.to_string()
    });

    Some(ChapterUpdate {
        manga_id: id.clone(),
        title,
        link: source.chapter_link(&chapter),
        chapter: chapter.number,
        chapter_id: chapter.id,
    })
}

/// Latest chapters of every manga in `list`, in list order.
pub async fn fetch_updates(source: &impl ChapterSource, list: &TrackingList) -> Vec<ChapterUpdate> {
    stream::iter(list.iter().cloned())
        .map(|id| async move { fetch_update(source, &id).await })
        .buffered(CONCURRENT_REQUESTS)
        .filter_map(future::ready)
        .collect()
        .await
}

/// Titles of every manga in `list`, in list order.
pub async fn manga_titles(source: &impl ChapterSource, list: &TrackingList) -> Vec<String> {
    stream::iter(list.iter().cloned())
        .map(|id| async move {
            source.manga_title(&id).await.unwrap_or_else(|e| {
                tracing::warn!("Failed to fetch name for manga {id}. {e}");
                UNKNOWN_TITLE.to_string()
            })
        })
        .buffered(CONCURRENT_REQUESTS)
        .collect()
        .await
}

/// Tracking lists, what they've seen and where to look for chapters.
/// Cheap to clone, clones share state.
#[derive(Debug, Clone)]
pub struct Tracker<S> {
    store: TrackingStore,
    seen: SeenChapters,
    source: S,
}

impl<S: ChapterSource> Tracker<S> {
    pub fn new(store: TrackingStore, source: S) -> Self {
        Self {
            store,
            seen: SeenChapters::default(),
            source,
        }
    }

    pub fn store(&self) -> &TrackingStore {
        &self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// New chapters for the list of `key`.
    /// Nothing counts as seen until it's been delivered with [Tracker::deliver].
    #[instrument(skip(self))]
    pub async fn check(&self, key: &ListKey) -> Result<Vec<ChapterUpdate>, BotError> {
        let list = self.store.load(key).await?;
        let latest = fetch_updates(&self.source, &list).await;
        let updates = self.seen.unseen(key, latest).await;

        tracing::info!(
            "{} of {} tracked manga have new chapters.",
            updates.len(),
            list.len()
        );
        Ok(updates)
    }

    /// Send `updates` and mark the ones that got through as seen by `key`.
    /// Returns how many were sent.
    pub async fn deliver(
        &self,
        key: &ListKey,
        updates: &[ChapterUpdate],
        notifier: &impl Notifier,
    ) -> usize {
        let delivered = notify_all(notifier, updates).await;
        self.seen.mark(key, delivered.iter().copied()).await;
        delivered.len()
    }

    /// Check the list of `key` and send what's new. Returns how many updates were sent.
    pub async fn check_and_notify(
        &self,
        key: &ListKey,
        notifier: &impl Notifier,
    ) -> Result<usize, BotError> {
        let updates = self.check(key).await?;
        Ok(self.deliver(key, &updates, notifier).await)
    }

    /// Titles of the list of `key`.
    pub async fn titles(&self, key: &ListKey) -> Result<Vec<String>, BotError> {
        let list = self.store.load(key).await?;
        Ok(manga_titles(&self.source, &list).await)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::data::temp_store;
    use crate::lib::notify::tests::Recorder;

    /// An in-memory [ChapterSource]. Manga without an entry fail to load.
    #[derive(Debug, Default)]
    pub(crate) struct FakeSource {
        pub titles: HashMap<String, String>,
        pub chapters: HashMap<String, Option<Chapter>>,
    }

    impl FakeSource {
        pub(crate) fn with(mut self, manga: &str, title: &str, chapter: Option<(&str, &str)>) -> Self {
            self.titles.insert(manga.to_string(), title.to_string());
            let chapter = chapter.map(|(id, number)| Chapter {
                id: id.to_string(),
                number: Some(number.to_string()),
            });
            self.chapters.insert(manga.to_string(), chapter);
            self
        }
    }

    #[async_trait]
    impl ChapterSource for FakeSource {
        async fn manga_title(&self, id: &MangaId) -> Result<String, BotError> {
            self.titles
                .get(id.as_str())
                .cloned()
                .ok_or_else(|| BotError::MangaDex {
                    path: id.to_string(),
                    reason: "missing".to_string(),
                })
        }

        async fn latest_chapter(&self, id: &MangaId) -> Result<Option<Chapter>, BotError> {
            self.chapters
                .get(id.as_str())
                .cloned()
                .ok_or_else(|| BotError::MangaDex {
                    path: id.to_string(),
                    reason: "missing".to_string(),
                })
        }

        fn chapter_link(&self, chapter: &Chapter) -> String {
            format!("https://mangadex.test/chapter/{}", chapter.id)
        }
    }

    fn list(ids: &[&str]) -> TrackingList {
        let mut list = TrackingList::default();
        list.merge(ids.iter().map(|id| MangaId::from(id.to_string())));
        list
    }

    #[test]
    fn update_message_format() {
        let update = ChapterUpdate {
            manga_id: MangaId::from("m".to_string()),
            title: "Frieren".to_string(),
            chapter: Some("120".to_string()),
            chapter_id: "c".to_string(),
            link: "https://mangadex.org/chapter/c".to_string(),
        };
        assert_eq!(
            update.to_string(),
            "**Frieren** - Chapter 120\nRead here: https://mangadex.org/chapter/c"
        );

        let oneshot = ChapterUpdate {
            chapter: None,
            ..update
        };
        assert!(oneshot.to_string().contains("Chapter Oneshot"));
    }

    #[tokio::test]
    async fn failures_and_empty_feeds_are_skipped() {
        let source = FakeSource::default()
            .with("a", "Alpha", Some(("a-1", "3")))
            .with("b", "Beta", None)
            .with("d", "Delta", Some(("d-9", "9")));

        let updates = fetch_updates(&source, &list(&["a", "b", "c", "d"])).await;
        let titles: Vec<&str> = updates.iter().map(|u| u.title.as_str()).collect();
        assert_eq!(titles, ["Alpha", "Delta"]);
        assert_eq!(updates[1].link, "https://mangadex.test/chapter/d-9");
    }

    #[tokio::test]
    async fn missing_title_is_unknown() {
        let mut source = FakeSource::default().with("a", "Alpha", Some(("a-1", "1")));
        source.titles.clear();

        let update = fetch_update(&source, &MangaId::from("a".to_string())).await.unwrap();
        assert_eq!(update.title, UNKNOWN_TITLE);
    }

    #[tokio::test]
    async fn titles_keep_order_and_fill_unknown() {
        let source = FakeSource::default()
            .with("a", "Alpha", None)
            .with("b", "Beta", None);

        let titles = manga_titles(&source, &list(&["b", "x", "a"])).await;
        assert_eq!(titles, ["Beta", UNKNOWN_TITLE, "Alpha"]);
    }

    #[tokio::test]
    async fn check_only_reports_new_chapters() {
        let store = temp_store().await;
        let key = ListKey::Shared;
        store.import(&key, vec![MangaId::from("a".to_string())]).await.unwrap();

        let tracker = Tracker::new(store, FakeSource::default().with("a", "Alpha", Some(("a-1", "1"))));
        let updates = tracker.check(&key).await.unwrap();
        assert_eq!(updates.len(), 1);

        assert_eq!(tracker.deliver(&key, &updates, &Recorder::default()).await, 1);
        assert!(tracker.check(&key).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn checks_run_on_spawned_tasks() {
        let store = temp_store().await;
        let key = ListKey::Shared;
        store.import(&key, vec![MangaId::from("a".to_string())]).await.unwrap();
        let tracker = Tracker::new(store, FakeSource::default().with("a", "Alpha", Some(("a-1", "1"))));

        let task = tokio::spawn(async move {
            let titles = tracker.titles(&key).await?;
            let sent = tracker.check_and_notify(&key, &Recorder::default()).await?;
            Ok::<_, BotError>((titles, sent))
        });

        let (titles, sent) = task.await.unwrap().unwrap();
        assert_eq!(titles, ["Alpha"]);
        assert_eq!(sent, 1);
    }

    #[tokio::test]
    async fn undelivered_updates_are_retried() {
        let store = temp_store().await;
        let key = ListKey::Shared;
        store.import(&key, vec![MangaId::from("a".to_string())]).await.unwrap();

        // The recorder refuses updates of manga titled `fail`.
        let source = FakeSource::default().with("a", "fail", Some(("a-1", "1")));
        let tracker = Tracker::new(store, source);
        let recorder = Recorder::default();

        assert_eq!(tracker.check_and_notify(&key, &recorder).await.unwrap(), 0);
        assert!(recorder.sent().is_empty());

        let pending = tracker.check(&key).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].chapter_id, "a-1");
    }

    #[tokio::test]
    async fn check_and_notify_sends_each_update() {
        let store = temp_store().await;
        let key = ListKey::Shared;
        let ids = ["a", "b"].map(|id| MangaId::from(id.to_string())).to_vec();
        store.import(&key, ids).await.unwrap();

        let source = FakeSource::default()
            .with("a", "Alpha", Some(("a-1", "1")))
            .with("b", "Beta", Some(("b-1", "7")));
        let tracker = Tracker::new(store, source);
        let recorder = Recorder::default();

        assert_eq!(tracker.check_and_notify(&key, &recorder).await.unwrap(), 2);
        assert_eq!(recorder.sent().len(), 2);
        assert_eq!(tracker.check_and_notify(&key, &recorder).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_list_has_no_updates() {
        let tracker = Tracker::new(temp_store().await, FakeSource::default());
        assert!(tracker.check(&ListKey::Shared).await.unwrap().is_empty());
        assert!(tracker.titles(&ListKey::Shared).await.unwrap().is_empty());
    }
}
