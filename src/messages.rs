// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

//! User-facing text. Kept in one place so the routing code stays readable.

pub const WELCOME: &str = "🎬 <b>MOVIE BOT PRO MAX</b>\n\n🔎 /s tên phim\n📌 /continue";
pub const SEARCH_USAGE: &str = "🔎 Cách dùng: /s tên phim";
pub const NO_RESULTS: &str = "❌ Không tìm thấy phim.";
pub const NO_HISTORY: &str = "📭 Bạn chưa xem phim nào.";

pub const CATALOG_ERROR: &str = "⚠️ Lỗi tìm phim.";
pub const NO_EPISODES: &str = "⚠️ Phim chưa có tập.";
pub const SESSION_EXPIRED: &str = "⌛ Phiên đã hết hạn, hãy tìm lại phim.";
pub const INVALID_SELECTION: &str = "❌ Lỗi xử lý.";
pub const HISTORY_ERROR: &str = "⚠️ Không lưu được lịch sử xem.";

pub const PREVIOUS_PAGE: &str = "⬅ Trang trước";
pub const NEXT_PAGE: &str = "Trang sau ➡";
pub const WATCH_NOW: &str = "▶️ XEM NGAY";
pub const EPISODE_LIST: &str = "📃 Danh sách tập";

pub fn search_header(keyword: &str) -> String {
    format!("🎬 Kết quả cho: <b>{}</b>", escape_html(keyword))
}

pub fn movie_caption(title: &str) -> String {
    format!("🎬 <b>{}</b>\n\nChọn phiên bản:", escape_html(title))
}

pub fn server_label(name: &str) -> String {
    format!("🎧 {}", name)
}

pub fn episode_label(index: usize) -> String {
    format!("▶️ Tập {}", index + 1)
}

pub fn now_watching(index: usize) -> String {
    format!("🎬 Bạn đang xem tập {}", index + 1)
}

pub fn resume_text(title: &str, server_name: &str, index: usize) -> String {
    format!(
        "📌 Xem tiếp <b>{}</b>\n🎧 {} · Tập {}",
        escape_html(title),
        escape_html(server_name),
        index + 1
    )
}

/// Escape the three characters Telegram's HTML parse mode cares about.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
