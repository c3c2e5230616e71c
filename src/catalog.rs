// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::config::CatalogConfig;
use crate::error::{BotError, Result};
use crate::models::{Episode, MovieDetail, MovieSummary, Server};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

pub const DEFAULT_SEARCH_LIMIT: usize = 6;

/// Remote movie catalog as seen by the bot.
#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    /// Filtered, truncated search results for a free-text keyword.
    async fn search(&self, keyword: &str) -> Result<Vec<MovieSummary>>;

    /// Full server and episode structure for one movie.
    async fn detail(&self, movie_id: &str) -> Result<MovieDetail>;
}

fn deserialize_null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    let value: Option<T> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Option<SearchData>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SearchData {
    #[serde(default, deserialize_with = "deserialize_null_as_default")]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailResponse {
    #[serde(default)]
    pub movie: Option<ApiMovie>,
    // Absent when the catalog has not published episodes yet
    #[serde(default)]
    pub episodes: Option<Vec<ApiServer>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMovie {
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_null_as_default")]
    pub poster_url: String,
    #[serde(default, deserialize_with = "deserialize_null_as_default")]
    pub thumb_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiServer {
    #[serde(default, deserialize_with = "deserialize_null_as_default")]
    pub server_name: String,
    #[serde(default, deserialize_with = "deserialize_null_as_default")]
    pub server_data: Vec<ApiEpisode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiEpisode {
    #[serde(default, deserialize_with = "deserialize_null_as_default")]
    pub link_m3u8: String,
    #[serde(default, deserialize_with = "deserialize_null_as_default")]
    pub link_embed: String,
}

/// Case-fold, strip diacritics (NFD minus combining marks) and trim.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Accent-insensitive substring filter, truncated after filtering.
pub fn filter_results(keyword: &str, items: Vec<SearchItem>, limit: usize) -> Vec<MovieSummary> {
    let needle = normalize(keyword);
    items
        .into_iter()
        .filter(|item| normalize(&item.name).contains(&needle))
        .take(limit)
        .map(|item| MovieSummary {
            id: item.slug,
            title: item.name,
        })
        .collect()
}

/// Turn a raw detail response into a [`MovieDetail`].
pub fn detail_from_response(
    movie_id: &str,
    response: DetailResponse,
    image_base: &Url,
) -> Result<MovieDetail> {
    let servers = response
        .episodes
        .ok_or_else(|| BotError::MovieNotFound(format!("{}: no episodes structure", movie_id)))?;

    if servers.is_empty() {
        return Err(BotError::MovieNotFound(format!(
            "{}: no servers published",
            movie_id
        )));
    }

    let movie = response
        .movie
        .ok_or_else(|| BotError::MovieNotFound(format!("{}: no movie record", movie_id)))?;

    let poster = if movie.poster_url.is_empty() {
        &movie.thumb_url
    } else {
        &movie.poster_url
    };

    let servers = servers
        .into_iter()
        .map(|server| Server {
            name: server.server_name,
            episodes: server
                .server_data
                .into_iter()
                .enumerate()
                .map(|(index, episode)| Episode {
                    index,
                    playback_url: if episode.link_m3u8.is_empty() {
                        episode.link_embed
                    } else {
                        episode.link_m3u8
                    },
                })
                .collect(),
        })
        .collect();

    Ok(MovieDetail {
        id: movie_id.to_string(),
        title: movie.name,
        poster_url: resolve_poster(image_base, poster),
        servers,
    })
}

/// Map a search response onto results or the error taxonomy.
pub fn parse_search(
    keyword: &str,
    status: StatusCode,
    text: &str,
    limit: usize,
) -> Result<Vec<MovieSummary>> {
    if !status.is_success() {
        return Err(BotError::CatalogUnavailable(format!(
            "Search failed with status: {}",
            status
        )));
    }

    let response: SearchResponse = serde_json::from_str(text).map_err(|e| {
        warn!("JSON parsing error for search: {}", e);
        warn!("Response content: {}", truncate_for_log(text));
        BotError::CatalogUnavailable(format!("Failed to parse search response: {}", e))
    })?;

    let items = response.data.map(|d| d.items).unwrap_or_default();
    let total = items.len();
    let results = filter_results(keyword, items, limit);

    debug!(
        "Search {:?}: {} candidates, {} kept",
        keyword,
        total,
        results.len()
    );
    Ok(results)
}

/// Map a detail response onto a [`MovieDetail`] or the error taxonomy.
///
/// A 404 means the slug is gone; any other failure is the catalog's fault.
pub fn parse_detail(
    movie_id: &str,
    status: StatusCode,
    text: &str,
    image_base: &Url,
) -> Result<MovieDetail> {
    if status == StatusCode::NOT_FOUND {
        return Err(BotError::MovieNotFound(format!(
            "{}: catalog returned 404",
            movie_id
        )));
    }
    if !status.is_success() {
        return Err(BotError::CatalogUnavailable(format!(
            "Detail request failed with status: {}",
            status
        )));
    }

    let response: DetailResponse = serde_json::from_str(text).map_err(|e| {
        warn!("JSON parsing error for movie {}: {}", movie_id, e);
        warn!("Response content: {}", truncate_for_log(text));
        BotError::CatalogUnavailable(format!("Failed to parse movie detail: {}", e))
    })?;

    detail_from_response(movie_id, response, image_base)
}

fn resolve_poster(image_base: &Url, poster: &str) -> String {
    if poster.starts_with("http") {
        return poster.to_string();
    }
    match image_base.join(poster.trim_start_matches('/')) {
        Ok(url) => url.to_string(),
        Err(e) => {
            warn!("Could not resolve poster path {:?}: {}", poster, e);
            poster.to_string()
        }
    }
}

#[derive(Debug)]
pub struct CatalogClient {
    client: Client,
    base_url: Url,
    image_base: Url,
    search_limit: usize,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let base_url = with_trailing_slash(&config.base_url)
            .with_context(|| format!("Invalid catalog URL: {}", config.base_url))?;

        let image_base = match &config.image_base_url {
            Some(url) => with_trailing_slash(url)
                .with_context(|| format!("Invalid image base URL: {}", url))?,
            None => base_url.clone(),
        };

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .user_agent("Mozilla/5.0")
                .build()?,
            base_url,
            image_base,
            search_limit: config.search_limit,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn search_url(&self, keyword: &str) -> Result<Url> {
        let mut url = self
            .base_url
            .join("v1/api/tim-kiem")
            .map_err(|e| BotError::CatalogUnavailable(format!("Bad search URL: {}", e)))?;
        url.query_pairs_mut().append_pair("keyword", keyword);
        Ok(url)
    }

    fn detail_url(&self, movie_id: &str) -> Result<Url> {
        let mut url = self
            .base_url
            .join("phim/")
            .map_err(|e| BotError::CatalogUnavailable(format!("Bad detail URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| BotError::CatalogUnavailable("Catalog URL cannot be a base".into()))?
            .pop_if_empty()
            .push(movie_id);
        Ok(url)
    }

    async fn fetch_text(&self, url: Url) -> Result<(StatusCode, String)> {
        debug!("Requesting: {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| BotError::CatalogUnavailable(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            BotError::CatalogUnavailable(format!("Failed to read response from {}: {}", url, e))
        })?;

        debug!("Response from {}: {} ({} bytes)", url, status, text.len());
        Ok((status, text))
    }
}

fn with_trailing_slash(raw: &str) -> std::result::Result<Url, url::ParseError> {
    if raw.ends_with('/') {
        Url::parse(raw)
    } else {
        Url::parse(&format!("{}/", raw))
    }
}

fn truncate_for_log(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait::async_trait]
impl Catalog for CatalogClient {
    async fn search(&self, keyword: &str) -> Result<Vec<MovieSummary>> {
        let (status, text) = self.fetch_text(self.search_url(keyword)?).await?;
        parse_search(keyword, status, &text, self.search_limit)
    }

    async fn detail(&self, movie_id: &str) -> Result<MovieDetail> {
        let (status, text) = self.fetch_text(self.detail_url(movie_id)?).await?;
        parse_detail(movie_id, status, &text, &self.image_base)
    }
}
