// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{CommandContext, OutputFormat};
use anyhow::Result;
use moviebot::Catalog;
use serde_json::json;

pub struct SearchCommand {
    pub keyword: String,
    pub format: OutputFormat,
}

impl SearchCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        let catalog = context.catalog()?;
        eprintln!("Searching {}...", catalog.base_url());

        let results = catalog.search(&self.keyword).await?;

        match self.format {
            OutputFormat::Json => {
                let items: Vec<_> = results
                    .iter()
                    .map(|m| json!({ "id": m.id, "title": m.title }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&items)?);
            }
            OutputFormat::Text => {
                if results.is_empty() {
                    println!("No results found for '{}'", self.keyword);
                } else {
                    for movie in results {
                        println!("{} ({})", movie.title, movie.id);
                    }
                }
            }
        }

        Ok(())
    }
}
