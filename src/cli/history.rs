// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{CommandContext, OutputFormat};
use anyhow::Result;
use moviebot::history::HistoryData;

pub struct HistoryCommand {
    pub user: Option<String>,
    pub format: OutputFormat,
}

impl HistoryCommand {
    pub fn execute(self, context: CommandContext) -> Result<()> {
        let store = context.history();
        eprintln!("Reading {}", store.path().display());

        let entries: HistoryData = match &self.user {
            Some(user) => store
                .resume(user)
                .map(|position| HistoryData::from([(user.clone(), position)]))
                .unwrap_or_default(),
            None => store.snapshot(),
        };

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            }
            OutputFormat::Text => {
                if entries.is_empty() {
                    println!("No watch history");
                }
                for (user, position) in entries {
                    println!(
                        "{:>12}  {}  server {}  episode {}",
                        user,
                        position.movie_id,
                        position.server_index,
                        position.episode_index + 1
                    );
                }
            }
        }

        Ok(())
    }
}
