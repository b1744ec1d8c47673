//! Per-browser session storage.
//!
//! The browser holds an opaque id in a cookie; the server holds the
//! [`SessionData`]. The pipeline loads it at the start of a request and saves
//! it at the end. Two overlapping requests from the same browser race, and
//! the last save wins; nothing here adds locking beyond the map itself.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::handler::BoxFuture;
use crate::value::SessionData;

/// How long a session lives after its last save.
pub const SESSION_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 4);

/// Cookie name for a service: a fixed prefix plus the hex bytes of its name,
/// so two prototypes on one host never share a session.
pub fn session_name(service_name: &str) -> String {
    format!("nhsuk-prototype-kit-{}", hex::encode(service_name.as_bytes()))
}

/// A fresh, unguessable session id.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// `set-cookie` value carrying a session id.
pub fn session_cookie(name: &str, id: &str) -> String {
    format!("{name}={id}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax", SESSION_MAX_AGE.as_secs())
}

/// Where session data lives between requests.
pub trait SessionStore: Send + Sync + 'static {
    /// Data saved under `id`, or `None` if there is none or it has expired.
    fn load<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Option<SessionData>>;

    fn save<'a>(&'a self, id: &'a str, data: SessionData) -> BoxFuture<'a, ()>;
}

struct Entry {
    data: SessionData,
    saved: Instant,
}

/// In-process [`SessionStore`]. Sessions vanish on restart.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_ttl(SESSION_MAX_AGE)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self { entries: RwLock::new(HashMap::new()), ttl }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self { Self::new() }
}

impl SessionStore for MemoryStore {
    fn load<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Option<SessionData>> {
        Box::pin(async move {
            let entries = self.entries.read().await;
            let entry = entries.get(id)?;
            if entry.saved.elapsed() > self.ttl {
                debug!(session = id, "session expired");
                return None;
            }
            Some(entry.data.clone())
        })
    }

    fn save<'a>(&'a self, id: &'a str, data: SessionData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let mut entries = self.entries.write().await;
            let ttl = self.ttl;
            entries.retain(|_, entry| entry.saved.elapsed() <= ttl);
            entries.insert(id.to_owned(), Entry { data, saved: Instant::now() });
        })
    }
}
