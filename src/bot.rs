// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::error::BotError;
use crate::messages;
use crate::router::{CallbackRouter, Reply};
use crate::search;
use crate::telegram::{CallbackQuery, Message, Transport, Update, UpdateSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Search(String),
    Continue,
}

/// Recognise `/start`, `/s <keyword>` and `/continue`, with or without a
/// `@botname` suffix. Commands addressed to another bot are ignored, as is
/// anything else. Without a known username every suffix is accepted.
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let text = text.trim_start();
    if !text.starts_with('/') {
        return None;
    }

    let (head, rest) = match text.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (text, ""),
    };
    let name = match head.split_once('@') {
        Some((name, mention)) => {
            if bot_username.is_some_and(|me| !mention.eq_ignore_ascii_case(me)) {
                return None;
            }
            name
        }
        None => head,
    };

    match name {
        "/start" => Some(Command::Start),
        "/s" => Some(Command::Search(rest.to_string())),
        "/continue" => Some(Command::Continue),
        _ => None,
    }
}

/// Connects incoming updates to the search flow and the callback router.
pub struct Bot<T> {
    transport: Arc<T>,
    router: Arc<CallbackRouter>,
    username: Option<String>,
}

impl<T: Transport + 'static> Bot<T> {
    pub fn new(transport: Arc<T>, router: Arc<CallbackRouter>) -> Self {
        Self {
            transport,
            router,
            username: None,
        }
    }

    /// The bot's own username, used to skip commands meant for other bots.
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    pub async fn handle_update(&self, update: Update) {
        if let Some(query) = update.callback_query {
            self.handle_callback(query).await;
        } else if let Some(message) = update.message {
            self.handle_message(message).await;
        }
    }

    async fn handle_message(&self, message: Message) {
        let Some(command) = message
            .text
            .as_deref()
            .and_then(|text| parse_command(text, self.username.as_deref()))
        else {
            return;
        };
        let chat_id = message.chat.id;
        let user_id = message
            .from
            .as_ref()
            .map(|u| u.id)
            .unwrap_or(chat_id)
            .to_string();

        debug!("Command from {}: {:?}", user_id, command);

        let result = match command {
            Command::Start => Ok(Reply::text(messages::WELCOME)),
            Command::Search(keyword) => search::search(self.router.catalog(), &keyword).await,
            Command::Continue => self.router.resume(&user_id).await,
        };

        let reply = match result.and_then(checked) {
            Ok(reply) => reply,
            Err(err) => {
                report(&user_id, &err);
                Reply::text(err.user_notice())
            }
        };

        if let Err(e) = self.deliver(chat_id, None, reply).await {
            warn!("Failed to reply to {}: {:#}", chat_id, e);
        }
    }

    async fn handle_callback(&self, query: CallbackQuery) {
        let user_id = query.from.id.to_string();
        let data = query.data.as_deref().unwrap_or_default();

        let Some(message) = query.message.as_ref() else {
            // Nothing to reply to without the originating message
            self.answer(&query.id, Some(messages::INVALID_SELECTION)).await;
            return;
        };

        let result = self
            .router
            .handle_callback(&user_id, data)
            .await
            .and_then(checked);

        match result {
            Ok(reply) => {
                match self
                    .deliver(message.chat.id, Some(message.message_id), reply)
                    .await
                {
                    Ok(()) => self.answer(&query.id, None).await,
                    Err(e) => {
                        warn!("Failed to apply {:?} for {}: {:#}", data, user_id, e);
                        self.answer(&query.id, Some(messages::INVALID_SELECTION))
                            .await;
                    }
                }
            }
            Err(err) => {
                report(&user_id, &err);
                self.answer(&query.id, Some(err.user_notice())).await;
            }
        }
    }

    async fn deliver(
        &self,
        chat_id: i64,
        message_id: Option<i64>,
        reply: Reply,
    ) -> anyhow::Result<()> {
        match reply {
            Reply::Message { text, keyboard } => {
                self.transport.send_message(chat_id, &text, &keyboard).await
            }
            Reply::Photo {
                photo_url,
                caption,
                keyboard,
            } => {
                self.transport
                    .send_photo(chat_id, &photo_url, &caption, &keyboard)
                    .await
            }
            Reply::EditKeyboard(keyboard) => match message_id {
                Some(message_id) => {
                    self.transport
                        .edit_keyboard(chat_id, message_id, &keyboard)
                        .await
                }
                None => anyhow::bail!("No message to edit in chat {}", chat_id),
            },
        }
    }

    async fn answer(&self, query_id: &str, alert: Option<&str>) {
        if let Err(e) = self.transport.answer_callback(query_id, alert).await {
            warn!("Failed to answer callback {}: {:#}", query_id, e);
        }
    }
}

impl<T: Transport + UpdateSource + 'static> Bot<T> {
    /// Long-poll for updates until Ctrl-C, handling each on its own task.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        let mut offset = 0;
        info!("Polling for updates...");

        loop {
            let updates = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down");
                    return Ok(());
                }
                result = self.transport.next_updates(offset) => result,
            };

            match updates {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        let bot = Arc::clone(&self);
                        tokio::spawn(async move {
                            bot.handle_update(update).await;
                        });
                    }
                }
                Err(e) => {
                    warn!("Polling failed: {:#}", e);
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                }
            }
        }
    }
}

/// Refuse replies whose buttons the transport would reject.
fn checked(reply: Reply) -> Result<Reply, BotError> {
    reply.keyboard().validate()?;
    Ok(reply)
}

fn report(user_id: &str, err: &BotError) {
    if err.is_durability_concern() {
        error!("Watch history not saved for {}: {}", user_id, err);
    } else {
        warn!("Interaction failed for {}: {}", user_id, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryStore;
    use crate::keyboard::Keyboard;
    use crate::models::WatchPosition;
    use crate::movie_cache::SessionCache;
    use crate::router::tests::{FakeCatalog, movie};
    use crate::telegram::reply_markup;
    use serde_json::Value;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Sent {
        Message(i64, String, Value),
        Photo(i64, String),
        Edit(i64, i64, Value),
        Answer(String, Option<String>),
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<Sent>>,
        reject_photos: bool,
    }

    impl RecordingTransport {
        fn take(&self) -> Vec<Sent> {
            std::mem::take(&mut *self.sent.lock().unwrap())
        }
    }

    #[async_trait::async_trait]
    impl Transport for RecordingTransport {
        async fn send_message(
            &self,
            chat_id: i64,
            text: &str,
            keyboard: &Keyboard,
        ) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(Sent::Message(
                chat_id,
                text.to_string(),
                reply_markup(keyboard),
            ));
            Ok(())
        }

        async fn send_photo(
            &self,
            chat_id: i64,
            photo_url: &str,
            _caption: &str,
            _keyboard: &Keyboard,
        ) -> anyhow::Result<()> {
            if self.reject_photos {
                anyhow::bail!("Bad Request: wrong file identifier/HTTP URL specified");
            }
            self.sent
                .lock()
                .unwrap()
                .push(Sent::Photo(chat_id, photo_url.to_string()));
            Ok(())
        }

        async fn edit_keyboard(
            &self,
            chat_id: i64,
            message_id: i64,
            keyboard: &Keyboard,
        ) -> anyhow::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push(Sent::Edit(chat_id, message_id, reply_markup(keyboard)));
            Ok(())
        }

        async fn answer_callback(&self, query_id: &str, alert: Option<&str>) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(Sent::Answer(
                query_id.to_string(),
                alert.map(str::to_string),
            ));
            Ok(())
        }
    }

    struct Harness {
        bot: Bot<RecordingTransport>,
        transport: Arc<RecordingTransport>,
        history: Arc<HistoryStore>,
        _dir: tempfile::TempDir,
    }

    fn harness(catalog: FakeCatalog) -> Harness {
        harness_with(catalog, RecordingTransport::default())
    }

    fn harness_with(catalog: FakeCatalog, transport: RecordingTransport) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let history = Arc::new(HistoryStore::load(dir.path().join("watch_history.json")));
        let router = Arc::new(CallbackRouter::new(
            Arc::new(catalog),
            Arc::new(SessionCache::new()),
            history.clone(),
        ));
        let transport = Arc::new(transport);
        Harness {
            bot: Bot::new(transport.clone(), router).with_username(Some("MovieBot".into())),
            transport,
            history,
            _dir: dir,
        }
    }

    fn with_movies(movies: Vec<crate::models::MovieDetail>) -> FakeCatalog {
        FakeCatalog {
            movies: movies.into_iter().map(|m| (m.id.clone(), m)).collect(),
            ..Default::default()
        }
    }

    fn text_update(text: &str) -> Update {
        serde_json::from_value(serde_json::json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "chat": {"id": 500},
                "from": {"id": 42},
                "text": text,
            }
        }))
        .unwrap()
    }

    fn callback_update(data: &str) -> Update {
        serde_json::from_value(serde_json::json!({
            "update_id": 2,
            "callback_query": {
                "id": "q",
                "from": {"id": 42},
                "message": {"message_id": 11, "chat": {"id": 500}},
                "data": data,
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_command() {
        let me = Some("MovieBot");
        assert_eq!(parse_command("/start", me), Some(Command::Start));
        assert_eq!(
            parse_command("/s  phim ma ", me),
            Some(Command::Search("phim ma".into()))
        );
        assert_eq!(
            parse_command("/s@MovieBot tay du ky", me),
            Some(Command::Search("tay du ky".into()))
        );
        assert_eq!(
            parse_command("/continue@moviebot", me),
            Some(Command::Continue)
        );
        assert_eq!(parse_command("/s", me), Some(Command::Search(String::new())));
        assert_eq!(parse_command("/continue", me), Some(Command::Continue));
        assert_eq!(parse_command("/search x", me), None);
        assert_eq!(parse_command("hello", me), None);
    }

    #[test]
    fn test_commands_for_other_bots_are_ignored() {
        assert_eq!(parse_command("/s@OtherBot tay du ky", Some("MovieBot")), None);
        assert_eq!(parse_command("/start@OtherBot", Some("MovieBot")), None);
        // username unknown
        assert_eq!(
            parse_command("/s@OtherBot x", None),
            Some(Command::Search("x".into()))
        );
    }

    #[tokio::test]
    async fn test_group_command_for_other_bot_gets_no_reply() {
        let h = harness(FakeCatalog::default());
        h.bot.handle_update(text_update("/start@OtherBot")).await;
        assert!(h.transport.take().is_empty());

        h.bot.handle_update(text_update("/start@MovieBot")).await;
        assert_eq!(h.transport.take().len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_answers_with_alert() {
        let h = harness_with(
            with_movies(vec![movie("M", &[3])]),
            RecordingTransport {
                reject_photos: true,
                ..Default::default()
            },
        );
        h.bot.handle_update(callback_update("detail|M")).await;

        assert_eq!(
            h.transport.take(),
            vec![Sent::Answer(
                "q".into(),
                Some(messages::INVALID_SELECTION.to_string())
            )]
        );
    }

    #[tokio::test]
    async fn test_start_sends_welcome() {
        let h = harness(FakeCatalog::default());
        h.bot.handle_update(text_update("/start")).await;

        let sent = h.transport.take();
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0], Sent::Message(500, text, _) if text == messages::WELCOME));
    }

    #[tokio::test]
    async fn test_search_failure_sends_notice() {
        let h = harness(FakeCatalog {
            unavailable: true,
            ..Default::default()
        });
        h.bot.handle_update(text_update("/s phim")).await;

        let sent = h.transport.take();
        assert!(
            matches!(&sent[0], Sent::Message(500, text, _) if text == messages::CATALOG_ERROR)
        );
    }

    #[tokio::test]
    async fn test_full_navigation_flow() {
        let h = harness(with_movies(vec![movie("M", &[25])]));

        h.bot.handle_update(callback_update("detail|M")).await;
        assert_eq!(
            h.transport.take(),
            vec![
                Sent::Photo(500, "https://img/M.jpg".into()),
                Sent::Answer("q".into(), None)
            ]
        );

        h.bot.handle_update(callback_update("server|M|0")).await;
        let sent = h.transport.take();
        let Sent::Edit(500, 11, markup) = &sent[0] else {
            panic!("expected edit, got {:?}", sent);
        };
        assert_eq!(markup["inline_keyboard"].as_array().unwrap().len(), 11);

        h.bot.handle_update(callback_update("play|M|0|3")).await;
        let sent = h.transport.take();
        let Sent::Message(500, _, markup) = &sent[0] else {
            panic!("expected message, got {:?}", sent);
        };
        assert_eq!(markup["inline_keyboard"][0][0]["url"], "https://cdn/M/0/3.m3u8");
        assert_eq!(h.history.resume("42"), Some(WatchPosition::new("M", 0, 3)));
    }

    #[tokio::test]
    async fn test_unsaved_play_sends_no_link() {
        let h = harness(with_movies(vec![movie("M", &[10])]));
        h.bot.handle_update(callback_update("detail|M")).await;
        h.bot.handle_update(callback_update("play|M|0|1")).await;
        h.transport.take();

        let path = h.history.path().to_path_buf();
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        h.bot.handle_update(callback_update("play|M|0|3")).await;
        assert_eq!(
            h.transport.take(),
            vec![Sent::Answer(
                "q".into(),
                Some(messages::HISTORY_ERROR.to_string())
            )]
        );
        assert_eq!(h.history.resume("42"), Some(WatchPosition::new("M", 0, 1)));
    }

    #[tokio::test]
    async fn test_stale_token_answers_with_alert() {
        let h = harness(FakeCatalog::default());
        h.bot.handle_update(callback_update("server|unknownId|0")).await;

        assert_eq!(
            h.transport.take(),
            vec![Sent::Answer(
                "q".into(),
                Some(messages::SESSION_EXPIRED.to_string())
            )]
        );
    }

    #[tokio::test]
    async fn test_oversized_tokens_are_refused() {
        let long_id = "x".repeat(70);
        let h = harness(with_movies(vec![movie(&long_id, &[3])]));
        let data = format!("detail|{}", long_id);
        h.bot.handle_update(callback_update(&data)).await;

        assert_eq!(
            h.transport.take(),
            vec![Sent::Answer(
                "q".into(),
                Some(messages::INVALID_SELECTION.to_string())
            )]
        );
    }

    #[tokio::test]
    async fn test_continue_after_play() {
        let h = harness(with_movies(vec![movie("M", &[12])]));
        h.history
            .record("42", WatchPosition::new("M", 0, 11))
            .unwrap();

        h.bot.handle_update(text_update("/continue")).await;
        let sent = h.transport.take();
        let Sent::Message(500, text, markup) = &sent[0] else {
            panic!("expected message, got {:?}", sent);
        };
        assert!(text.contains("Tập 12"));
        assert_eq!(markup["inline_keyboard"][1][0]["callback_data"], "page|M|0|1");
    }
}
