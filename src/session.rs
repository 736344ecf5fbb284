use std::collections::{HashMap, VecDeque};

use axum::http::{HeaderMap, header};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Most-recent searches kept per session.
pub const HISTORY_LIMIT: usize = 10;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sid";

/// Per-session state, passed explicitly into and out of handlers rather
/// than living in ambient globals.
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    /// Monotonic visit counter, bumped on each home page load.
    pub num_visits: u64,
    /// Up to [`HISTORY_LIMIT`] most recently looked-up addresses, oldest
    /// first.
    pub search_history: VecDeque<String>,
}

impl SessionData {
    /// Record an address lookup. An address already in the history is left
    /// where it is; a new one is appended, evicting the oldest entry once
    /// the history exceeds [`HISTORY_LIMIT`].
    pub fn record_search(&mut self, address: &str) {
        if self.search_history.iter().any(|a| a == address) {
            return;
        }
        self.search_history.push_back(address.to_string());
        if self.search_history.len() > HISTORY_LIMIT {
            self.search_history.pop_front();
        }
    }
}

/// In-memory session store keyed by a UUID carried in the `sid` cookie.
#[derive(Debug, Default)]
pub struct Sessions {
    inner: RwLock<HashMap<String, SessionData>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    fn id_from_cookies(headers: &HeaderMap) -> Option<String> {
        let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
        cookies
            .split(';')
            .map(str::trim)
            .find_map(|cookie| cookie.strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
            .map(str::to_string)
    }

    /// Resolve the session for a request, creating one when the cookie is
    /// missing or not a UUID. Returns the session id to echo back in the
    /// `Set-Cookie` header.
    pub async fn open(&self, headers: &HeaderMap) -> String {
        let id = Self::id_from_cookies(headers)
            .filter(|id| Uuid::parse_str(id).is_ok())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        self.inner.write().await.entry(id.clone()).or_default();
        id
    }

    /// Mutate a session's data under the write lock.
    pub async fn update<F, R>(&self, id: &str, f: F) -> R
    where
        F: FnOnce(&mut SessionData) -> R,
    {
        let mut sessions = self.inner.write().await;
        let data = sessions.entry(id.to_string()).or_default();
        f(data)
    }

    pub async fn get(&self, id: &str) -> Option<SessionData> {
        self.inner.read().await.get(id).cloned()
    }
}
