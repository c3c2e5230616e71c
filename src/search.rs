// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::catalog::Catalog;
use crate::error::Result;
use crate::keyboard;
use crate::messages;
use crate::router::Reply;

/// Search the catalog and build the list of movies to pick from.
pub async fn search(catalog: &dyn Catalog, keyword: &str) -> Result<Reply> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Ok(Reply::text(messages::SEARCH_USAGE));
    }

    let movies = catalog.search(keyword).await?;
    if movies.is_empty() {
        return Ok(Reply::text(messages::NO_RESULTS));
    }

    Ok(Reply::Message {
        text: messages::search_header(keyword),
        keyboard: keyboard::search_results(&movies),
    })
}
