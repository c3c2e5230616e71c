// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use serde::{Deserialize, Serialize};

/// A search hit. `id` is the catalog slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub index: usize,
    pub playback_url: String,
}

/// One playback source (e.g. subtitled or dubbed) with its own episode list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub name: String,
    pub episodes: Vec<Episode>,
}

/// Full movie structure. Server order is catalog order and is addressed by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieDetail {
    pub id: String,
    pub title: String,
    pub poster_url: String,
    pub servers: Vec<Server>,
}

impl MovieDetail {
    pub fn server(&self, index: usize) -> Option<&Server> {
        self.servers.get(index)
    }
}

impl Server {
    pub fn episode(&self, index: usize) -> Option<&Episode> {
        self.episodes.get(index)
    }

    pub fn episode_count(&self) -> usize {
        self.episodes.len()
    }
}

impl std::fmt::Display for MovieSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Last played episode for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchPosition {
    pub movie_id: String,
    pub server_index: usize,
    pub episode_index: usize,
}

impl WatchPosition {
    pub fn new(movie_id: impl Into<String>, server_index: usize, episode_index: usize) -> Self {
        Self {
            movie_id: movie_id.into(),
            server_index,
            episode_index,
        }
    }
}
