// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::catalog::Catalog;
use crate::error::{BotError, Result};
use crate::history::HistoryStore;
use crate::keyboard::{self, Keyboard};
use crate::messages;
use crate::models::{MovieDetail, Server, WatchPosition};
use crate::movie_cache::MovieCache;
use crate::token::NavigationToken;
use std::sync::Arc;
use tracing::debug;

/// What the transport should do in response to an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Message { text: String, keyboard: Keyboard },
    Photo {
        photo_url: String,
        caption: String,
        keyboard: Keyboard,
    },
    /// Replace the buttons of the message that was pressed.
    EditKeyboard(Keyboard),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Message {
            text: text.into(),
            keyboard: Keyboard::new(),
        }
    }

    pub fn keyboard(&self) -> &Keyboard {
        match self {
            Self::Message { keyboard, .. }
            | Self::Photo { keyboard, .. }
            | Self::EditKeyboard(keyboard) => keyboard,
        }
    }
}

/// Stateless dispatcher for button presses.
///
/// Everything it needs between presses lives in the movie cache and the
/// history store.
pub struct CallbackRouter {
    catalog: Arc<dyn Catalog>,
    cache: Arc<dyn MovieCache>,
    history: Arc<HistoryStore>,
}

impl CallbackRouter {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        cache: Arc<dyn MovieCache>,
        history: Arc<HistoryStore>,
    ) -> Self {
        Self {
            catalog,
            cache,
            history,
        }
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    /// Decode a raw callback payload and dispatch it.
    pub async fn handle_callback(&self, user_id: &str, raw: &str) -> Result<Reply> {
        let token = NavigationToken::parse(raw)?;
        self.dispatch(user_id, &token).await
    }

    pub async fn dispatch(&self, user_id: &str, token: &NavigationToken) -> Result<Reply> {
        debug!("User {} pressed {}", user_id, token);

        match token {
            NavigationToken::Detail { movie_id } => self.open_movie(movie_id).await,
            NavigationToken::Server { movie_id, server } => self.choose_server(movie_id, *server),
            NavigationToken::Page {
                movie_id,
                server,
                page,
            } => self.change_page(movie_id, *server, *page),
            NavigationToken::Play {
                movie_id,
                server,
                episode,
            } => self.play(user_id, movie_id, *server, *episode).await,
        }
    }

    async fn open_movie(&self, movie_id: &str) -> Result<Reply> {
        let detail = self.ensure_detail(movie_id).await?;

        Ok(Reply::Photo {
            photo_url: detail.poster_url.clone(),
            caption: messages::movie_caption(&detail.title),
            keyboard: keyboard::server_list(&detail),
        })
    }

    fn choose_server(&self, movie_id: &str, server: usize) -> Result<Reply> {
        self.change_page(movie_id, server, 0)
    }

    fn change_page(&self, movie_id: &str, server: usize, page: usize) -> Result<Reply> {
        let detail = self.cached(movie_id)?;
        let count = server_at(&detail, server)?.episode_count();

        Ok(Reply::EditKeyboard(keyboard::episode_page(
            movie_id, server, page, count,
        )))
    }

    async fn play(
        &self,
        user_id: &str,
        movie_id: &str,
        server: usize,
        episode: usize,
    ) -> Result<Reply> {
        let detail = self.cached(movie_id)?;
        let playback_url = server_at(&detail, server)?
            .episode(episode)
            .ok_or_else(|| {
                BotError::InvalidSelection(format!(
                    "{}: episode {} out of range on server {}",
                    movie_id, episode, server
                ))
            })?
            .playback_url
            .clone();

        // Must be durable before the user is told anything
        self.record(user_id, WatchPosition::new(movie_id, server, episode))
            .await?;

        Ok(Reply::Message {
            text: messages::now_watching(episode),
            keyboard: keyboard::watch_now(&playback_url),
        })
    }

    /// Message for the `/continue` command.
    pub async fn resume(&self, user_id: &str) -> Result<Reply> {
        let Some(position) = self.history.resume(user_id) else {
            return Ok(Reply::text(messages::NO_HISTORY));
        };

        let detail = self.ensure_detail(&position.movie_id).await?;
        let server = server_at(&detail, position.server_index)?;
        let episode = server.episode(position.episode_index).ok_or_else(|| {
            BotError::InvalidSelection(format!(
                "{}: stored episode {} no longer exists",
                position.movie_id, position.episode_index
            ))
        })?;

        Ok(Reply::Message {
            text: messages::resume_text(&detail.title, &server.name, position.episode_index),
            keyboard: keyboard::resume(
                &detail.id,
                position.server_index,
                position.episode_index,
                &episode.playback_url,
            ),
        })
    }

    /// File writes run on the blocking pool so a slow disk doesn't hold up
    /// other users' presses.
    async fn record(&self, user_id: &str, position: WatchPosition) -> Result<()> {
        let history = Arc::clone(&self.history);
        let user_id = user_id.to_string();

        tokio::task::spawn_blocking(move || history.record(&user_id, position))
            .await
            .map_err(|e| BotError::PersistenceFailure(format!("history writer failed: {}", e)))?
    }

    fn cached(&self, movie_id: &str) -> Result<Arc<MovieDetail>> {
        self.cache
            .get(movie_id)
            .ok_or_else(|| BotError::SessionExpired(movie_id.to_string()))
    }

    async fn ensure_detail(&self, movie_id: &str) -> Result<Arc<MovieDetail>> {
        if let Some(detail) = self.cache.get(movie_id) {
            return Ok(detail);
        }

        let detail = self.catalog.detail(movie_id).await?;
        debug!(
            "Cached {} ({} servers, {} cached movies)",
            movie_id,
            detail.servers.len(),
            self.cache.len() + 1
        );
        Ok(self.cache.put(movie_id, detail))
    }
}

fn server_at(detail: &MovieDetail, index: usize) -> Result<&Server> {
    detail.server(index).ok_or_else(|| {
        BotError::InvalidSelection(format!(
            "{}: server {} out of range ({} servers)",
            detail.id,
            index,
            detail.servers.len()
        ))
    })
}
