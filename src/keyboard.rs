// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

//! Transport-neutral inline keyboards.

use crate::messages;
use crate::models::{MovieDetail, MovieSummary};
use crate::token::{NavigationToken, TokenError};

pub const EPISODES_PER_PAGE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Callback(NavigationToken),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn callback(label: impl Into<String>, token: NavigationToken) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(token),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }

    pub fn token(&self) -> Option<&NavigationToken> {
        match &self.action {
            ButtonAction::Callback(token) => Some(token),
            ButtonAction::Url(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_row(&mut self, row: Vec<Button>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }

    /// Check every callback payload fits the transport limit.
    pub fn validate(&self) -> Result<(), TokenError> {
        for token in self.buttons().filter_map(Button::token) {
            token.encode_checked()?;
        }
        Ok(())
    }
}

/// One page of episodes for a server, followed by an optional navigation row.
///
/// Episodes `page*10 .. min(page*10+10, episode_count)` each get their own row.
/// The navigation row holds "previous" when `page > 0` and "next" when more
/// episodes follow this page, and is left out when it would be empty.
pub fn episode_page(movie_id: &str, server: usize, page: usize, episode_count: usize) -> Keyboard {
    let start = page.saturating_mul(EPISODES_PER_PAGE);
    let end = start.saturating_add(EPISODES_PER_PAGE).min(episode_count);

    let mut keyboard = Keyboard::new();

    for episode in start..end {
        keyboard.push_row(vec![Button::callback(
            messages::episode_label(episode),
            NavigationToken::Play {
                movie_id: movie_id.to_string(),
                server,
                episode,
            },
        )]);
    }

    let mut nav = Vec::new();

    if page > 0 {
        nav.push(Button::callback(
            messages::PREVIOUS_PAGE,
            NavigationToken::Page {
                movie_id: movie_id.to_string(),
                server,
                page: page - 1,
            },
        ));
    }

    if start.saturating_add(EPISODES_PER_PAGE) < episode_count {
        nav.push(Button::callback(
            messages::NEXT_PAGE,
            NavigationToken::Page {
                movie_id: movie_id.to_string(),
                server,
                page: page + 1,
            },
        ));
    }

    if !nav.is_empty() {
        keyboard.push_row(nav);
    }

    keyboard
}

/// Page index that contains the given episode.
pub fn page_of(episode: usize) -> usize {
    episode / EPISODES_PER_PAGE
}

pub fn search_results(movies: &[MovieSummary]) -> Keyboard {
    Keyboard {
        rows: movies
            .iter()
            .map(|movie| {
                vec![Button::callback(
                    movie.title.clone(),
                    NavigationToken::Detail {
                        movie_id: movie.id.clone(),
                    },
                )]
            })
            .collect(),
    }
}

pub fn server_list(detail: &MovieDetail) -> Keyboard {
    Keyboard {
        rows: detail
            .servers
            .iter()
            .enumerate()
            .map(|(index, server)| {
                vec![Button::callback(
                    messages::server_label(&server.name),
                    NavigationToken::Server {
                        movie_id: detail.id.clone(),
                        server: index,
                    },
                )]
            })
            .collect(),
    }
}

pub fn watch_now(playback_url: &str) -> Keyboard {
    Keyboard {
        rows: vec![vec![Button::url(messages::WATCH_NOW, playback_url)]],
    }
}

/// "Watch now" plus a shortcut back to the page holding the episode.
pub fn resume(movie_id: &str, server: usize, episode: usize, playback_url: &str) -> Keyboard {
    let mut keyboard = watch_now(playback_url);
    keyboard.push_row(vec![Button::callback(
        messages::EPISODE_LIST,
        NavigationToken::Page {
            movie_id: movie_id.to_string(),
            server,
            page: page_of(episode),
        },
    )]);
    keyboard
}
