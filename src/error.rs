// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::messages;
use crate::token::TokenError;

/// Failures that can end a single user interaction.
///
/// None of these are fatal to the process. The dispatcher turns each one into
/// a transient acknowledgement via [`BotError::user_notice`].
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Movie has no playable content: {0}")]
    MovieNotFound(String),

    #[error("Session expired for movie: {0}")]
    SessionExpired(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Failed to persist watch history: {0}")]
    PersistenceFailure(String),
}

impl BotError {
    /// Short text shown to the user in the callback alert or reply.
    pub fn user_notice(&self) -> &'static str {
        match self {
            Self::CatalogUnavailable(_) => messages::CATALOG_ERROR,
            Self::MovieNotFound(_) => messages::NO_EPISODES,
            Self::SessionExpired(_) => messages::SESSION_EXPIRED,
            Self::InvalidSelection(_) => messages::INVALID_SELECTION,
            Self::PersistenceFailure(_) => messages::HISTORY_ERROR,
        }
    }

    pub fn is_durability_concern(&self) -> bool {
        matches!(self, Self::PersistenceFailure(_))
    }
}

impl From<TokenError> for BotError {
    fn from(err: TokenError) -> Self {
        Self::InvalidSelection(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
