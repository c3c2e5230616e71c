// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

//! Callback payloads attached to inline buttons.
//!
//! Wire format is `action|field|field...`. Inside a field a backslash is
//! written `\\` and a pipe is written `\|`, so ids containing either character
//! still split unambiguously. Numeric fields are plain unsigned decimal.

use std::fmt;
use std::str::FromStr;

/// Telegram rejects `callback_data` longer than this.
pub const MAX_TOKEN_BYTES: usize = 64;

const SEPARATOR: char = '|';
const ESCAPE: char = '\\';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Empty callback token")]
    Empty,

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Action '{action}' expects {expected} fields, got {found}")]
    FieldCount {
        action: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Empty movie id")]
    EmptyMovieId,

    #[error("Invalid number: {0:?}")]
    InvalidNumber(String),

    #[error("Unknown escape sequence: \\{0}")]
    BadEscape(char),

    #[error("Dangling escape at end of token")]
    DanglingEscape,

    #[error("Token is {len} bytes, limit is {limit}")]
    TooLong { len: usize, limit: usize },
}

/// Navigation state carried by a button press.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NavigationToken {
    Detail {
        movie_id: String,
    },
    Server {
        movie_id: String,
        server: usize,
    },
    Page {
        movie_id: String,
        server: usize,
        page: usize,
    },
    Play {
        movie_id: String,
        server: usize,
        episode: usize,
    },
}

impl NavigationToken {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Detail { .. } => "detail",
            Self::Server { .. } => "server",
            Self::Page { .. } => "page",
            Self::Play { .. } => "play",
        }
    }

    pub fn movie_id(&self) -> &str {
        match self {
            Self::Detail { movie_id }
            | Self::Server { movie_id, .. }
            | Self::Page { movie_id, .. }
            | Self::Play { movie_id, .. } => movie_id,
        }
    }

    pub fn encode(&self) -> String {
        let mut out = String::from(self.action());
        push_field(&mut out, self.movie_id());

        match self {
            Self::Detail { .. } => {}
            Self::Server { server, .. } => {
                push_field(&mut out, &server.to_string());
            }
            Self::Page { server, page, .. } => {
                push_field(&mut out, &server.to_string());
                push_field(&mut out, &page.to_string());
            }
            Self::Play {
                server, episode, ..
            } => {
                push_field(&mut out, &server.to_string());
                push_field(&mut out, &episode.to_string());
            }
        }

        out
    }

    /// Encode and enforce the transport's payload limit.
    pub fn encode_checked(&self) -> Result<String, TokenError> {
        let encoded = self.encode();
        if encoded.len() > MAX_TOKEN_BYTES {
            return Err(TokenError::TooLong {
                len: encoded.len(),
                limit: MAX_TOKEN_BYTES,
            });
        }
        Ok(encoded)
    }

    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        if raw.is_empty() {
            return Err(TokenError::Empty);
        }

        let fields = split_fields(raw)?;
        let (action, rest) = fields.split_first().ok_or(TokenError::Empty)?;

        let (name, expected): (&'static str, usize) = match action.as_str() {
            "detail" => ("detail", 1),
            "server" => ("server", 2),
            "page" => ("page", 3),
            "play" => ("play", 3),
            other => return Err(TokenError::UnknownAction(other.to_string())),
        };

        if rest.len() != expected {
            return Err(TokenError::FieldCount {
                action: name,
                expected,
                found: rest.len(),
            });
        }

        let movie_id = rest[0].clone();
        if movie_id.is_empty() {
            return Err(TokenError::EmptyMovieId);
        }

        let token = match name {
            "detail" => Self::Detail { movie_id },
            "server" => Self::Server {
                movie_id,
                server: parse_index(&rest[1])?,
            },
            "page" => Self::Page {
                movie_id,
                server: parse_index(&rest[1])?,
                page: parse_index(&rest[2])?,
            },
            _ => Self::Play {
                movie_id,
                server: parse_index(&rest[1])?,
                episode: parse_index(&rest[2])?,
            },
        };

        Ok(token)
    }
}

impl fmt::Display for NavigationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for NavigationToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn push_field(out: &mut String, value: &str) {
    out.push(SEPARATOR);
    for c in value.chars() {
        if c == SEPARATOR || c == ESCAPE {
            out.push(ESCAPE);
        }
        out.push(c);
    }
}

fn split_fields(raw: &str) -> Result<Vec<String>, TokenError> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            ESCAPE => match chars.next() {
                Some(next @ (SEPARATOR | ESCAPE)) => current.push(next),
                Some(other) => return Err(TokenError::BadEscape(other)),
                None => return Err(TokenError::DanglingEscape),
            },
            SEPARATOR => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);

    Ok(fields)
}

fn parse_index(field: &str) -> Result<usize, TokenError> {
    // usize::from_str accepts a leading '+', which never appears in our output
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TokenError::InvalidNumber(field.to_string()));
    }
    field
        .parse()
        .map_err(|_| TokenError::InvalidNumber(field.to_string()))
}
