use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::Lidnr;

/// Cookie carrying the server-side session id.
pub const SESSION_ID_COOKIE: &str = "GEWISSESSID";

/// Server-side session value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub lidnr: Lidnr,
    /// Whether a long-lived token was issued alongside this session.
    pub remember: bool,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<SessionRecord>, anyhow::Error>;
    /// Store `record` under `id`; it is gone after `expiry_seconds`.
    async fn put(
        &self,
        id: &str,
        record: SessionRecord,
        expiry_seconds: i64,
    ) -> Result<(), anyhow::Error>;
    async fn remove(&self, id: &str) -> Result<(), anyhow::Error>;
}

/// 32 random bytes, hex encoded.
pub fn new_session_id() -> String {
    hex::encode(rand::thread_rng().gen::<[u8; 32]>())
}

#[derive(Debug, Clone, Copy)]
struct StoredSession {
    record: SessionRecord,
    expires_at: DateTime<Utc>,
}

impl StoredSession {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// In-process session store. Sessions do not survive a restart; the
/// long-lived token cookie restores them. Expired sessions read as absent
/// and are evicted on the next read of their id or the next write.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, StoredSession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn purge_expired(&self, now: DateTime<Utc>) {
        self.sessions.retain(|_, stored| stored.is_live(now));
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &str) -> Result<Option<SessionRecord>, anyhow::Error> {
        let now = Utc::now();
        let Some(stored) = self.sessions.get(id).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        if stored.is_live(now) {
            return Ok(Some(stored.record));
        }
        self.sessions.remove_if(id, |_, stored| !stored.is_live(now));
        tracing::debug!(lidnr = stored.record.lidnr, "Server-side session expired");
        Ok(None)
    }

    async fn put(
        &self,
        id: &str,
        record: SessionRecord,
        expiry_seconds: i64,
    ) -> Result<(), anyhow::Error> {
        let now = Utc::now();
        self.purge_expired(now);
        self.sessions.insert(
            id.to_string(),
            StoredSession {
                record,
                expires_at: now + Duration::seconds(expiry_seconds),
            },
        );
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), anyhow::Error> {
        self.sessions.remove(id);
        Ok(())
    }
}
