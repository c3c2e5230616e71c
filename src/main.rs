// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::Result;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use moviebot::{Bot, CallbackRouter, CatalogClient, Config, HistoryStore, SessionCache, TelegramApi};

mod cli;
use cli::{CommandContext, HistoryCommand, OutputFormat, SearchCommand};

fn cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Cyan.on_default())
}

#[derive(Parser)]
#[command(name = "moviebot")]
#[command(about = "Telegram bot for searching and resuming movies from an online catalog")]
#[command(version)]
#[command(styles = cargo_style())]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging to file (moviebot_debug.log)
    #[arg(long, global = true)]
    debug_log: bool,

    /// Path to config.toml (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (default if no command given)
    Run,

    /// Search the catalog from the terminal
    Search {
        /// Search keyword
        #[arg(required = true)]
        keyword: Vec<String>,
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Write a default config file to edit
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show stored watch positions
    History {
        /// Only show this user's resume point
        #[arg(short, long)]
        user: Option<String>,
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn init_logging(cli: &Cli) -> Result<()> {
    if cli.debug_log {
        let file = File::create("moviebot_debug.log")?;
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_level(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(file_layer)
            .with(
                EnvFilter::from_default_env()
                    .add_directive("moviebot=debug".parse()?)
                    .add_directive("hyper_util=error".parse()?),
            )
            .init();
    } else if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env()
                    .add_directive(tracing::Level::DEBUG.into())
                    .add_directive("hyper_util=error".parse()?),
            )
            .init();
    } else if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("hyper_util=error".parse()?),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("moviebot=info,hyper_util=error"))
            .init();
    }

    Ok(())
}

/// An explicit --config must parse; the default location falls back quietly.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Ok(Config::load_or_default(Config::default_path())),
    }
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => Config::ensure_config_dir()?.join("config.toml"),
    };

    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    Config::default().save(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn run_bot(config: Config) -> Result<()> {
    let token = config.bot_token(std::env::var("BOT_TOKEN").ok())?;

    let api = Arc::new(TelegramApi::new(
        &config.bot.api_url,
        token,
        config.bot.poll_timeout_secs,
    )?);
    let me = api.get_me().await?;
    tracing::info!(
        "Logged in as @{}",
        me.username.as_deref().unwrap_or("unknown")
    );

    let catalog = Arc::new(CatalogClient::new(&config.catalog)?);
    tracing::info!("Catalog: {}", catalog.base_url());

    let history = Arc::new(HistoryStore::load(config.history_path()));
    tracing::info!(
        "Watch history: {} ({} users)",
        history.path().display(),
        history.len()
    );

    let router = Arc::new(CallbackRouter::new(
        catalog,
        Arc::new(SessionCache::new()),
        history,
    ));

    tracing::info!("🚀 Movie bot running");
    Arc::new(Bot::new(api, router).with_username(me.username))
        .run()
        .await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    match cli.command {
        Some(Commands::Run) | None => run_bot(load_config(cli.config.as_deref())?).await?,

        Some(Commands::Search { keyword, format }) => {
            let cmd = SearchCommand {
                keyword: keyword.join(" "),
                format: OutputFormat::from_str(&format)?,
            };
            let config = load_config(cli.config.as_deref())?;
            cmd.execute(CommandContext::new(config)).await?;
        }

        Some(Commands::History { user, format }) => {
            let cmd = HistoryCommand {
                user,
                format: OutputFormat::from_str(&format)?,
            };
            let config = load_config(cli.config.as_deref())?;
            cmd.execute(CommandContext::new(config))?;
        }

        Some(Commands::InitConfig { force }) => init_config(cli.config, force)?,
    }

    Ok(())
}
