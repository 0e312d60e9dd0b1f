//! Remote content source
//!
//! Talks to the alquran.cloud REST API. Every response is wrapped in a
//! `{ code, status, data }` envelope; only `data` is of interest here.

use crate::error::FetchError;
use crate::models::{Chapter, SearchMatch, Verse, VerseKey};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_BASE_URL: &str = "https://api.alquran.cloud/v1";
pub const DEFAULT_TRANSLATION: &str = "bn.bengali";

/// Where chapters, verses and search matches come from.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// All chapters, in order.
    async fn chapters(&self) -> Result<Vec<Chapter>, FetchError>;

    /// Metadata for a single chapter.
    async fn chapter(&self, number: u16) -> Result<Chapter, FetchError>;

    /// Up to `limit` verses of `chapter`, skipping the first `offset`.
    async fn verses(&self, chapter: u16, offset: u16, limit: u16) -> Result<Vec<Verse>, FetchError>;

    /// Translation text for one verse.
    async fn translation(&self, key: VerseKey) -> Result<String, FetchError>;

    /// Verses whose translation contains `query`. An unknown query yields
    /// an empty list, not an error.
    async fn search(&self, query: &str) -> Result<Vec<SearchMatch>, FetchError>;
}

/// Fetch a single verse through any source.
pub async fn fetch_verse(source: &dyn ContentSource, key: VerseKey) -> Result<Verse, FetchError> {
    source
        .verses(key.chapter, key.verse.saturating_sub(1), 1)
        .await?
        .into_iter()
        .find(|v| v.key == key)
        .ok_or_else(|| FetchError::NotFound(format!("verse {}", key)))
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAyah {
    number: u32,
    text: String,
    number_in_surah: u16,
}

#[derive(Debug, Deserialize)]
struct ApiSurahWithAyahs {
    #[serde(flatten)]
    chapter: Chapter,
    ayahs: Vec<ApiAyah>,
}

#[derive(Debug, Deserialize)]
struct ApiEdition {
    identifier: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSurahRef {
    number: u16,
    english_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSearchMatch {
    number: u32,
    text: String,
    number_in_surah: u16,
    surah: ApiSurahRef,
    edition: Option<ApiEdition>,
}

#[derive(Debug, Deserialize)]
struct ApiSearchResults {
    #[serde(default)]
    matches: Vec<ApiSearchMatch>,
}

impl From<ApiSearchMatch> for SearchMatch {
    fn from(m: ApiSearchMatch) -> Self {
        SearchMatch {
            key: VerseKey::new(m.surah.number, m.number_in_surah),
            number: m.number,
            text: m.text,
            chapter_english_name: m.surah.english_name,
            edition: m.edition.map(|e| e.identifier),
        }
    }
}

/// Join Arabic verses with their translations by verse number.
fn join_translations(chapter: u16, arabic: Vec<ApiAyah>, translated: Option<Vec<ApiAyah>>) -> Vec<Verse> {
    let mut translations: HashMap<u16, String> = translated
        .unwrap_or_default()
        .into_iter()
        .map(|a| (a.number_in_surah, a.text))
        .collect();

    arabic
        .into_iter()
        .map(|a| Verse {
            key: VerseKey::new(chapter, a.number_in_surah),
            number: a.number,
            arabic_text: a.text,
            translation: translations.remove(&a.number_in_surah),
        })
        .collect()
}

pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    translation: String,
}

impl ApiClient {
    pub fn new(base_url: &str, translation: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            translation: translation.to_string(),
        })
    }

    pub fn translation_id(&self) -> &str {
        &self.translation
    }

    fn url(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| FetchError::Network(format!("Invalid API URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Network(format!("Invalid API URL {}", self.base_url)))?
            .extend(segments);
        Ok(url)
    }

    async fn get_data<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        debug!(%url, "GET");
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.path().to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        Ok(envelope.data)
    }

    fn with_page(mut url: Url, offset: u16, limit: u16) -> Url {
        url.query_pairs_mut()
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &limit.to_string());
        url
    }
}

#[async_trait]
impl ContentSource for ApiClient {
    async fn chapters(&self) -> Result<Vec<Chapter>, FetchError> {
        self.get_data(self.url(&["surah"])?).await
    }

    async fn chapter(&self, number: u16) -> Result<Chapter, FetchError> {
        let url = Self::with_page(self.url(&["surah", &number.to_string()])?, 0, 1);
        let surah: ApiSurahWithAyahs = self.get_data(url).await?;
        Ok(surah.chapter)
    }

    async fn verses(&self, chapter: u16, offset: u16, limit: u16) -> Result<Vec<Verse>, FetchError> {
        let chapter_segment = chapter.to_string();
        let arabic_url = Self::with_page(self.url(&["surah", &chapter_segment])?, offset, limit);
        let translated_url = Self::with_page(
            self.url(&["surah", &chapter_segment, &self.translation])?,
            offset,
            limit,
        );

        let (arabic, translated) = tokio::join!(
            self.get_data::<ApiSurahWithAyahs>(arabic_url),
            self.get_data::<ApiSurahWithAyahs>(translated_url),
        );
        let arabic = arabic?;
        let translated = match translated {
            Ok(surah) => Some(surah.ayahs),
            Err(e) => {
                warn!(chapter, offset, limit, error = %e, "translation fetch failed, verses left untranslated");
                None
            }
        };

        Ok(join_translations(chapter, arabic.ayahs, translated))
    }

    async fn translation(&self, key: VerseKey) -> Result<String, FetchError> {
        let url = Self::with_page(
            self.url(&["surah", &key.chapter.to_string(), &self.translation])?,
            key.verse.saturating_sub(1),
            1,
        );
        let surah: ApiSurahWithAyahs = self.get_data(url).await?;
        surah
            .ayahs
            .into_iter()
            .find(|a| a.number_in_surah == key.verse)
            .map(|a| a.text)
            .ok_or_else(|| FetchError::NotFound(format!("translation of {}", key)))
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchMatch>, FetchError> {
        let url = self.url(&["search", query, "all", &self.translation])?;
        match self.get_data::<ApiSearchResults>(url).await {
            Ok(results) => Ok(results.matches.into_iter().map(SearchMatch::from).collect()),
            // The API answers an unmatched query with 404
            Err(FetchError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}
