use axum::http::{header, HeaderMap, HeaderValue};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use crate::constants::{SESSION_COOKIE, SESSION_MAX_ENTRIES, SESSION_TTL_SECS};
use crate::ordering::SortOrder;

#[derive(Debug, Clone, Default)]
pub struct SessionData {
    pub order: Option<SortOrder>,
}

#[derive(Debug)]
struct Entry {
    data: SessionData,
    last_seen: Instant,
}

/// Process-local session storage keyed by the `dbms_session` cookie.
///
/// Entries idle for longer than `ttl` are treated as absent and dropped on
/// the next eviction pass; the map never holds more than `max_entries`.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Entry>>>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(Duration::from_secs(SESSION_TTL_SECS), SESSION_MAX_ENTRIES)
    }
}

/// Session resolved for one request
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub data: SessionData,
    /// No valid cookie was presented, a `Set-Cookie` must go out
    pub is_new: bool,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    fn expired(&self, entry: &Entry, now: Instant) -> bool {
        now.duration_since(entry.last_seen) >= self.ttl
    }

    /// Resolve the session from request headers, creating a fresh one when
    /// the cookie is missing or unknown
    pub fn load(&self, headers: &HeaderMap) -> Session {
        if let Some(id) = session_id_from_headers(headers) {
            let sessions = self.inner.read().unwrap_or_else(|p| p.into_inner());
            if let Some(entry) = sessions.get(&id) {
                if !self.expired(entry, Instant::now()) {
                    return Session {
                        id,
                        data: entry.data.clone(),
                        is_new: false,
                    };
                }
            }
        }
        Session {
            id: Uuid::new_v4(),
            data: SessionData::default(),
            is_new: true,
        }
    }

    pub fn save(&self, id: Uuid, data: SessionData) {
        let now = Instant::now();
        let mut sessions = self.inner.write().unwrap_or_else(|p| p.into_inner());
        sessions.insert(
            id,
            Entry {
                data,
                last_seen: now,
            },
        );
        if sessions.len() > self.max_entries {
            self.evict(&mut sessions, now);
        }
    }

    /// Drop every expired session
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.inner.write().unwrap_or_else(|p| p.into_inner());
        let before = sessions.len();
        sessions.retain(|_, entry| !self.expired(entry, now));
        before - sessions.len()
    }

    fn evict(&self, sessions: &mut HashMap<Uuid, Entry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| !self.expired(entry, now));
        if sessions.len() > self.max_entries {
            // Still over the cap: drop the least recently used
            let mut by_age: Vec<(Instant, Uuid)> =
                sessions.iter().map(|(id, e)| (e.last_seen, *id)).collect();
            by_age.sort_unstable();
            let excess = sessions.len() - self.max_entries;
            for (_, id) in by_age.into_iter().take(excess) {
                sessions.remove(&id);
            }
        }
        debug!(evicted = before - sessions.len(), remaining = sessions.len(), "sessions evicted");
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn set_cookie_header(id: Uuid) -> (header::HeaderName, HeaderValue) {
    let value = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
    // A hyphenated UUID and fixed attributes are always valid header bytes
    let value = HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static(""));
    (header::SET_COOKIE, value)
}

fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}
