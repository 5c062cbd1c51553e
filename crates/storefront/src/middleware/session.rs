//! Session middleware configuration.
//!
//! Sessions hold the cart and pending toasts only; identity lives in the
//! token cookie. Records are kept in a bounded moka cache so abandoned
//! sessions are evicted once idle past the expiry, and the least recently
//! used go first when the store is full.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use tower_sessions::cookie::time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "rimline_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Most sessions held at once.
const MAX_SESSIONS: u64 = 100_000;

/// Session store backed by a bounded in-memory cache.
#[derive(Debug, Clone)]
pub struct MokaSessionStore {
    cache: Cache<Id, Record>,
}

impl MokaSessionStore {
    /// Store holding at most `max_sessions`, each evicted after `idle`
    /// without a save.
    #[must_use]
    pub fn new(max_sessions: u64, idle: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_sessions)
                .eviction_policy(EvictionPolicy::lru())
                .time_to_idle(idle)
                .build(),
        }
    }
}

#[async_trait]
impl SessionStore for MokaSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        while self.cache.contains_key(&record.id) {
            record.id = Id::default();
        }
        self.cache.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.cache.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        Ok(self
            .cache
            .get(session_id)
            .await
            .filter(|record| record.expiry_date > OffsetDateTime::now_utc()))
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.cache.invalidate(session_id).await;
        Ok(())
    }
}

/// Create the session layer with a bounded in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MokaSessionStore> {
    let store = MokaSessionStore::new(
        MAX_SESSIONS,
        Duration::from_secs(SESSION_EXPIRY_SECONDS.unsigned_abs()),
    );

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower_sessions::cookie::time::Duration as TimeDuration;

    use super::*;

    fn record(expires_in: TimeDuration) -> Record {
        Record {
            id: Id::default(),
            data: Default::default(),
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    fn store() -> MokaSessionStore {
        MokaSessionStore::new(10, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_create_load_delete() {
        let store = store();
        let mut record = record(TimeDuration::minutes(30));
        store.create(&mut record).await.unwrap();
        assert_eq!(store.load(&record.id).await.unwrap(), Some(record.clone()));

        store.delete(&record.id).await.unwrap();
        assert_eq!(store.load(&record.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_record_is_not_loaded() {
        let store = store();
        let record = record(TimeDuration::minutes(-1));
        store.save(&record).await.unwrap();
        assert_eq!(store.load(&record.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_is_bounded() {
        let store = MokaSessionStore::new(3, Duration::from_secs(60));
        for _ in 0..20 {
            let mut record = record(TimeDuration::minutes(30));
            store.create(&mut record).await.unwrap();
        }
        store.cache.run_pending_tasks().await;
        assert!(store.cache.entry_count() <= 3);
    }

    #[tokio::test]
    async fn test_create_replaces_colliding_id() {
        let store = store();
        let mut first = record(TimeDuration::minutes(30));
        store.create(&mut first).await.unwrap();

        let mut second = record(TimeDuration::minutes(30));
        second.id = first.id;
        store.create(&mut second).await.unwrap();
        assert_ne!(first.id, second.id);
    }
}
