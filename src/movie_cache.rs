// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::models::MovieDetail;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Movie details that outstanding buttons can refer to by id.
///
/// A miss is not an error here. Callers treat it as an expired session.
pub trait MovieCache: Send + Sync {
    fn get(&self, movie_id: &str) -> Option<Arc<MovieDetail>>;
    fn put(&self, movie_id: &str, detail: MovieDetail) -> Arc<MovieDetail>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unbounded in-memory cache that lives as long as the process.
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: RwLock<HashMap<String, Arc<MovieDetail>>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MovieCache for SessionCache {
    fn get(&self, movie_id: &str) -> Option<Arc<MovieDetail>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(movie_id)
            .cloned()
    }

    fn put(&self, movie_id: &str, detail: MovieDetail) -> Arc<MovieDetail> {
        let detail = Arc::new(detail);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(movie_id.to_string(), Arc::clone(&detail));
        detail
    }

    fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
