//! Persisted tracking lists, one JSON array of manga ids per file.

use std::fmt::Display;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use delegate::delegate;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::instrument;

use super::ListKey;
use crate::error::BotError;
use crate::serenity;

/// File name of the shared list.
const SHARED_FILE: &str = "manga.json";

/// A MangaDex manga id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MangaId(String);

impl MangaId {
    /// Extracts the id from a MangaDex title url,
    /// e.g. `https://mangadex.org/title/<id>/<slug>`.
    ///
    /// The scheme may be left out. Input that isn't a url but
    /// contains `title/<id>` is accepted too.
    pub fn from_url(input: &str) -> Option<Self> {
        let input = input.trim();
        Self::from_parsed_url(input).or_else(|| {
            let (_, rest) = input.split_once("title/")?;
            Self::from_prefix(rest)
        })
    }

    fn from_parsed_url(input: &str) -> Option<Self> {
        let parsed = url::Url::parse(input).or_else(|_| url::Url::parse(&format!("https://{input}")));
        let url = parsed.ok()?;

        let mut segments = url.path_segments()?;
        segments.find(|s| *s == "title")?;
        Self::from_prefix(segments.next()?)
    }

    /// The leading run of id characters.
    fn from_prefix(segment: &str) -> Option<Self> {
        let id: String = segment
            .chars()
            .take_while(|c| matches!(c, 'a'..='f' | '0'..='9' | '-'))
            .collect();

        (!id.is_empty()).then_some(MangaId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MangaId {
    fn from(id: String) -> Self {
        MangaId(id)
    }
}

impl Display for MangaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, duplicate free list of tracked manga.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingList {
    #[allow(clippy::missing_docs_in_private_items)]
    ids: Vec<MangaId>,
}

impl TrackingList {
    delegate! {
        to self.ids {
            pub fn len(&self) -> usize;
            pub fn is_empty(&self) -> bool;
            pub fn contains(&self, id: &MangaId) -> bool;
            pub fn iter(&self) -> std::slice::Iter<'_, MangaId>;
        }
    }

    /// Returns `false` if the id was already present.
    pub fn insert(&mut self, id: MangaId) -> bool {
        if self.contains(&id) {
            false
        } else {
            self.ids.push(id);
            true
        }
    }

    /// Returns `false` if the id wasn't present.
    pub fn remove(&mut self, id: &MangaId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|tracked| tracked != id);
        before != self.ids.len()
    }

    /// Set union, keeping existing ids first. Returns how many ids were new.
    pub fn merge(&mut self, ids: impl IntoIterator<Item = MangaId>) -> usize {
        ids.into_iter().map(|id| self.insert(id)).filter(|&new| new).count()
    }
}

impl<'a> IntoIterator for &'a TrackingList {
    type Item = &'a MangaId;
    type IntoIter = std::slice::Iter<'a, MangaId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

/// Reads and writes tracking lists in a directory.
/// Internally uses an [Arc], so it's cheap to clone.
#[derive(Debug, Clone)]
pub struct TrackingStore {
    /// Directory of the list files.
    dir: Arc<PathBuf>,
    /// Serializes read-modify-write cycles.
    write_lock: Arc<Mutex<()>>,
}

impl TrackingStore {
    /// Use `dir` for storage, creating it if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, BotError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| storage_error(&dir, source))?;

        tracing::debug!("Tracking lists stored in {}", dir.display());
        Ok(Self {
            dir: Arc::new(dir),
            write_lock: Arc::default(),
        })
    }

    /// The file backing the list of `key`.
    pub fn path(&self, key: &ListKey) -> PathBuf {
        match key {
            ListKey::User(user) => self.dir.join(format!("{user}.json")),
            ListKey::Shared => self.dir.join(SHARED_FILE),
        }
    }

    /// Read a list, a missing file is an empty list.
    pub async fn load(&self, key: &ListKey) -> Result<TrackingList, BotError> {
        let path = self.path(key);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(TrackingList::default()),
            Err(e) => return Err(storage_error(&path, e)),
        };

        let mut de = serde_json::Deserializer::from_slice(&content);
        let ids: Vec<MangaId> =
            serde_path_to_error::deserialize(&mut de).map_err(|e| BotError::CorruptList {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        // Older files may contain duplicates.
        let mut list = TrackingList::default();
        list.merge(ids);
        Ok(list)
    }

    /// Overwrite a list.
    pub async fn save(&self, key: &ListKey, list: &TrackingList) -> Result<(), BotError> {
        let path = self.path(key);
        let content = to_json(list)?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| storage_error(&path, source))
    }

    /// Track a manga. Returns `false` if it was already tracked.
    #[instrument(skip(self))]
    pub async fn add(&self, key: &ListKey, id: MangaId) -> Result<bool, BotError> {
        self.modify(key, |list| list.insert(id)).await
    }

    /// Stop tracking a manga. Returns `false` if it wasn't tracked.
    #[instrument(skip(self))]
    pub async fn remove(&self, key: &ListKey, id: &MangaId) -> Result<bool, BotError> {
        self.modify(key, |list| list.remove(id)).await
    }

    /// Merge `ids` into a list. Returns how many were new.
    #[instrument(skip(self, ids))]
    pub async fn import(&self, key: &ListKey, ids: Vec<MangaId>) -> Result<usize, BotError> {
        self.modify(key, |list| list.merge(ids)).await
    }

    /// The list as pretty printed JSON.
    pub async fn export(&self, key: &ListKey) -> Result<Vec<u8>, BotError> {
        let list = self.load(key).await?;
        to_json(&list)
    }

    /// Every list that has a file.
    pub async fn keys(&self) -> Result<Vec<ListKey>, BotError> {
        let mut entries = tokio::fs::read_dir(self.dir.as_path())
            .await
            .map_err(|source| storage_error(&self.dir, source))?;

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| storage_error(&self.dir, source))?
        {
            if let Some(key) = key_from_file_name(&entry.file_name().to_string_lossy()) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Load, change and save a list while holding the write lock.
    /// Only saves when `change` reports a modification.
    async fn modify<T>(
        &self,
        key: &ListKey,
        change: impl FnOnce(&mut TrackingList) -> T,
    ) -> Result<T, BotError>
    where
        T: Changed,
    {
        let _guard = self.write_lock.lock().await;
        let mut list = self.load(key).await?;
        let result = change(&mut list);
        if result.changed() {
            self.save(key, &list).await?;
        }
        Ok(result)
    }
}

/// Whether a list modification did anything.
trait Changed {
    fn changed(&self) -> bool;
}

impl Changed for bool {
    fn changed(&self) -> bool {
        *self
    }
}

impl Changed for usize {
    fn changed(&self) -> bool {
        *self > 0
    }
}

fn key_from_file_name(name: &str) -> Option<ListKey> {
    if name == SHARED_FILE {
        return Some(ListKey::Shared);
    }
    let stem = name.strip_suffix(".json")?;
    let id: std::num::NonZeroU64 = stem.parse().ok()?;
    Some(ListKey::User(serenity::UserId::from(id)))
}

fn to_json(list: &TrackingList) -> Result<Vec<u8>, BotError> {
    serde_json::to_vec_pretty(list).map_err(|e| BotError::CorruptList {
        path: "<serialize>".to_string(),
        reason: e.to_string(),
    })
}

fn storage_error(path: &Path, source: std::io::Error) -> BotError {
    BotError::Storage {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::serenity::UserId;

    /// A store in a fresh directory under the system temp dir.
    pub(crate) async fn temp_store() -> TrackingStore {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "manga-tracker-test-{}-{n}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        TrackingStore::open(dir).await.unwrap()
    }

    fn id(s: &str) -> MangaId {
        MangaId(s.to_string())
    }

    fn alice() -> ListKey {
        ListKey::User(UserId::new(1001))
    }

    #[test]
    fn id_from_full_url() {
        let url = "https://mangadex.org/title/a96676e5-8ae2-425e-b549-7f15dd34a6d8/komi-san";
        assert_eq!(
            MangaId::from_url(url),
            Some(id("a96676e5-8ae2-425e-b549-7f15dd34a6d8"))
        );
    }

    #[test]
    fn id_from_url_without_scheme() {
        assert_eq!(
            MangaId::from_url("mangadex.org/title/0aef-12"),
            Some(id("0aef-12"))
        );
    }

    #[test]
    fn id_stops_at_first_foreign_char() {
        assert_eq!(
            MangaId::from_url("https://mangadex.org/title/abc123XYZ"),
            Some(id("abc123"))
        );
    }

    #[test]
    fn id_from_text_around_a_link() {
        assert_eq!(MangaId::from_url("title/0aef-12"), Some(id("0aef-12")));
        assert_eq!(
            MangaId::from_url("<https://mangadex.org/title/0aef-12/slug>"),
            Some(id("0aef-12"))
        );
        assert_eq!(
            MangaId::from_url("read https://mangadex.org/title/0aef-12 now"),
            Some(id("0aef-12"))
        );
    }

    #[test]
    fn invalid_urls() {
        assert_eq!(MangaId::from_url("https://mangadex.org/chapter/abc"), None);
        assert_eq!(MangaId::from_url("https://mangadex.org/title/"), None);
        assert_eq!(MangaId::from_url("https://mangadex.org/title/XYZ"), None);
        assert_eq!(MangaId::from_url("not a url at all"), None);
    }

    #[test]
    fn merge_keeps_order_and_skips_duplicates() {
        let mut list = TrackingList::default();
        list.insert(id("b"));
        list.insert(id("a"));
        let added = list.merge([id("a"), id("c"), id("c"), id("d")]);
        assert_eq!(added, 2);
        let ids: Vec<&str> = list.iter().map(MangaId::as_str).collect();
        assert_eq!(ids, ["b", "a", "c", "d"]);
    }

    #[tokio::test]
    async fn missing_list_is_empty() {
        let store = temp_store().await;
        assert!(store.load(&alice()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_then_remove() {
        let store = temp_store().await;

        assert!(store.add(&alice(), id("abc")).await.unwrap());
        assert!(!store.add(&alice(), id("abc")).await.unwrap());
        assert_eq!(store.load(&alice()).await.unwrap().len(), 1);

        assert!(store.remove(&alice(), &id("abc")).await.unwrap());
        assert!(!store.remove(&alice(), &id("abc")).await.unwrap());
        assert!(store.load(&alice()).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_are_all_kept() {
        let store = temp_store().await;

        let tasks: Vec<_> = (0..32)
            .map(|n| {
                let store = store.clone();
                tokio::spawn(async move { store.add(&alice(), id(&format!("{n:x}"))).await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().unwrap());
        }

        assert_eq!(store.load(&alice()).await.unwrap().len(), 32);
    }

    #[tokio::test]
    async fn lists_are_separate_files() {
        let store = temp_store().await;
        store.add(&alice(), id("abc")).await.unwrap();
        store.add(&ListKey::Shared, id("def")).await.unwrap();

        assert!(store.path(&alice()).ends_with("1001.json"));
        assert!(store.path(&ListKey::Shared).ends_with("manga.json"));
        assert!(!store.load(&ListKey::Shared).await.unwrap().contains(&id("abc")));
    }

    #[tokio::test]
    async fn export_is_pretty_json_array() {
        let store = temp_store().await;
        store.import(&alice(), vec![id("a"), id("b")]).await.unwrap();

        let exported = store.export(&alice()).await.unwrap();
        assert_eq!(String::from_utf8(exported).unwrap(), "[\n  \"a\",\n  \"b\"\n]");
    }

    #[tokio::test]
    async fn load_deduplicates_old_files() {
        let store = temp_store().await;
        std::fs::write(store.path(&alice()), r#"["a", "b", "a"]"#).unwrap();
        assert_eq!(store.load(&alice()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let store = temp_store().await;
        std::fs::write(store.path(&alice()), r#"{"not": "a list"}"#).unwrap();
        assert!(matches!(
            store.load(&alice()).await,
            Err(BotError::CorruptList { .. })
        ));
    }

    #[tokio::test]
    async fn keys_lists_users_and_shared() {
        let store = temp_store().await;
        store.add(&alice(), id("a")).await.unwrap();
        store.add(&ListKey::Shared, id("b")).await.unwrap();
        std::fs::write(store.dir.join("notes.txt"), "ignored").unwrap();
        std::fs::write(store.dir.join("bob.json"), "[]").unwrap();

        assert_eq!(store.keys().await.unwrap(), vec![alice(), ListKey::Shared]);
    }
}
