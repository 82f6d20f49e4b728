use std::sync::Arc;

use rand::{distributions::Alphanumeric, Rng};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use super::store::{Session, SessionStore};

const TOKEN_LEN: usize = 48;

pub type Clock = Arc<dyn Fn() -> OffsetDateTime + Send + Sync>;

/// Session lifecycle over a pluggable store.
///
/// Lifetime is fixed from creation (not sliding). Expiry is detected lazily:
/// a lookup at or past `expires_at` reaps the record and reports it absent.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
    clock: Clock,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self::with_clock(store, ttl, Arc::new(OffsetDateTime::now_utc))
    }

    pub fn with_clock(store: Arc<dyn SessionStore>, ttl: Duration, clock: Clock) -> Self {
        Self { store, ttl, clock }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn create(&self, user_id: Uuid, user_name: &str) -> anyhow::Result<Session> {
        let session = Session {
            id: new_token(),
            user_id,
            user_name: user_name.to_string(),
            expires_at: (self.clock)() + self.ttl,
        };
        self.store.insert(session.clone()).await?;
        debug!(user_id = %user_id, "session created");
        Ok(session)
    }

    pub async fn get(&self, id: &str) -> anyhow::Result<Option<Session>> {
        let Some(session) = self.store.get(id).await? else {
            return Ok(None);
        };
        if session.is_expired((self.clock)()) {
            debug!(user_id = %session.user_id, "session expired");
            if let Err(e) = self.store.remove(id).await {
                warn!(error = %e, "failed to reap expired session");
            }
            return Ok(None);
        }
        Ok(Some(session))
    }

    pub async fn destroy(&self, id: &str) -> anyhow::Result<()> {
        self.store.remove(id).await
    }

    pub async fn purge_expired(&self) -> anyhow::Result<u64> {
        self.store.purge_expired((self.clock)()).await
    }

    pub async fn close(&self) {
        self.store.close().await;
    }
}

fn new_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}
