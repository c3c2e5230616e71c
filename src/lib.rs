// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

pub mod bot;
pub mod catalog;
pub mod config;
pub mod error;
pub mod history;
pub mod keyboard;
pub mod messages;
pub mod models;
pub mod movie_cache;
pub mod router;
pub mod search;
pub mod telegram;
pub mod token;

pub use bot::Bot;
pub use catalog::{Catalog, CatalogClient};
pub use config::Config;
pub use error::BotError;
pub use history::HistoryStore;
pub use movie_cache::{MovieCache, SessionCache};
pub use router::{CallbackRouter, Reply};
pub use telegram::TelegramApi;
pub use token::NavigationToken;
