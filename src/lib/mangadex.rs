//! Functionality for interfacing with the MangaDex REST api.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::instrument;

use super::updates::ChapterSource;
use super::updates::UNKNOWN_TITLE;
use crate::data::MangaId;
use crate::error::BotError;

/// A chapter as listed in a manga's feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    /// MangaDex chapter id.
    pub id: String,
    /// Chapter number, missing for oneshots.
    pub number: Option<String>,
}

/// A MangaDex api client.
#[derive(Debug, Clone, bon::Builder)]
#[builder(on(String, into))]
pub struct MangaDex {
    /// Shared http client.
    client: Client,
    /// e.g. `https://api.mangadex.org`
    api_url: String,
    /// e.g. `https://mangadex.org`
    site_url: String,
    /// Only chapters translated to this language are considered.
    #[builder(default = "en".to_string())]
    language: String,
    /// Sent as a bearer token when present.
    token: Option<String>,
}

impl MangaDex {
    /// The underlying http client.
    pub fn http_client(&self) -> Client {
        self.client.clone()
    }

    /// `GET` an api path and decode the JSON body.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, BotError> {
        let url = format!("{}{path}", self.api_url.trim_end_matches('/'));

        let mut request = self.client.get(&url).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?.error_for_status()?;
        let body = response.bytes().await?;
        decode(path, &body)
    }
}

#[async_trait]
impl ChapterSource for MangaDex {
    #[instrument(skip(self), fields(manga = %id))]
    async fn manga_title(&self, id: &MangaId) -> Result<String, BotError> {
        let path = format!("/manga/{id}");
        let manga: Envelope<MangaData> = self.get(&path, &[]).await?;
        Ok(manga.data.attributes.best_title())
    }

    #[instrument(skip(self), fields(manga = %id))]
    async fn latest_chapter(&self, id: &MangaId) -> Result<Option<Chapter>, BotError> {
        let path = format!("/manga/{id}/feed");
        let query = [
            ("limit", "1"),
            ("order[chapter]", "desc"),
            ("translatedLanguage[]", self.language.as_str()),
        ];
        let feed: Envelope<Vec<ChapterData>> = self.get(&path, &query).await?;
        Ok(feed.data.into_iter().next().map(Chapter::from))
    }

    fn chapter_link(&self, chapter: &Chapter) -> String {
        format!("{}/chapter/{}", self.site_url.trim_end_matches('/'), chapter.id)
    }
}

/// Decode a response body, errors point at the offending field.
fn decode<T: DeserializeOwned>(path: &str, body: &[u8]) -> Result<T, BotError> {
    let mut de = serde_json::Deserializer::from_slice(body);
    serde_path_to_error::deserialize(&mut de).map_err(|e| BotError::MangaDex {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// Every MangaDex response wraps its payload in `data`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct MangaData {
    attributes: MangaAttributes,
}

#[derive(Debug, Deserialize)]
struct MangaAttributes {
    /// Language code to title.
    #[serde(default)]
    title: BTreeMap<String, String>,
}

impl MangaAttributes {
    /// The english title, otherwise any title.
    fn best_title(self) -> String {
        let MangaAttributes { mut title } = self;
        title
            .remove("en")
            .or_else(|| title.into_values().next())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ChapterData {
    id: String,
    attributes: ChapterAttributes,
}

#[derive(Debug, Deserialize)]
struct ChapterAttributes {
    chapter: Option<String>,
}

impl From<ChapterData> for Chapter {
    fn from(data: ChapterData) -> Self {
        Chapter {
            id: data.id,
            number: data.attributes.chapter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> MangaDex {
        MangaDex::builder()
            .client(Client::new())
            .api_url("https://api.mangadex.org/")
            .site_url("https://mangadex.org/")
            .build()
    }

    #[test]
    fn english_title_preferred() {
        let body = br#"{"result":"ok","data":{"id":"x","type":"manga","attributes":{
            "title":{"ja-ro":"Komi-san wa, Komyushou desu.","en":"Komi Can't Communicate"}}}}"#;
        let manga: Envelope<MangaData> = decode("/manga/x", body).unwrap();
        assert_eq!(manga.data.attributes.best_title(), "Komi Can't Communicate");
    }

    #[test]
    fn falls_back_to_other_language() {
        let body = br#"{"data":{"attributes":{"title":{"ja-ro":"Oshi no Ko"}}}}"#;
        let manga: Envelope<MangaData> = decode("/manga/x", body).unwrap();
        assert_eq!(manga.data.attributes.best_title(), "Oshi no Ko");
    }

    #[test]
    fn no_title_is_unknown() {
        let body = br#"{"data":{"attributes":{"title":{}}}}"#;
        let manga: Envelope<MangaData> = decode("/manga/x", body).unwrap();
        assert_eq!(manga.data.attributes.best_title(), UNKNOWN_TITLE);
    }

    #[test]
    fn feed_decodes_first_chapter() {
        let body = br#"{"result":"ok","response":"collection","data":[
            {"id":"c-1","type":"chapter","attributes":{"chapter":"112","title":"","volume":null}}
        ],"limit":1,"offset":0,"total":120}"#;
        let feed: Envelope<Vec<ChapterData>> = decode("/manga/x/feed", body).unwrap();
        let chapter = feed.data.into_iter().next().map(Chapter::from).unwrap();
        assert_eq!(
            chapter,
            Chapter {
                id: "c-1".to_string(),
                number: Some("112".to_string()),
            }
        );
    }

    #[test]
    fn oneshot_has_no_number() {
        let body = br#"{"data":[{"id":"c-2","attributes":{"chapter":null,"title":"Oneshot"}}]}"#;
        let feed: Envelope<Vec<ChapterData>> = decode("/feed", body).unwrap();
        assert_eq!(feed.data[0].attributes.chapter, None);
    }

    #[test]
    fn bad_body_names_the_field() {
        let body = br#"{"data":[{"id":5}]}"#;
        let err = decode::<Envelope<Vec<ChapterData>>>("/manga/x/feed", body).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("/manga/x/feed"), "{message}");
        assert!(message.contains("data[0].id"), "{message}");
    }

    #[test]
    fn chapter_links_use_site_url() {
        let chapter = Chapter {
            id: "abc".to_string(),
            number: None,
        };
        assert_eq!(
            client().chapter_link(&chapter),
            "https://mangadex.org/chapter/abc"
        );
    }
}
