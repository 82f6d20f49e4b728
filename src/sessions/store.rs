use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Server-side record of an authenticated client.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: Uuid,
    pub user_name: String,
    pub expires_at: OffsetDateTime,
}

impl Session {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

/// Keyed session backing (token -> record).
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: Session) -> anyhow::Result<()>;
    async fn get(&self, id: &str) -> anyhow::Result<Option<Session>>;
    /// Removing an unknown id is not an error.
    async fn remove(&self, id: &str) -> anyhow::Result<()>;
    /// Drop every session expired at `now`; returns how many were removed.
    async fn purge_expired(&self, now: OffsetDateTime) -> anyhow::Result<u64>;
    async fn close(&self) {}
}

/// Single-process backing.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: Session) -> anyhow::Result<()> {
        self.inner.write().await.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<Session>> {
        Ok(self.inner.read().await.get(id).cloned())
    }

    async fn remove(&self, id: &str) -> anyhow::Result<()> {
        self.inner.write().await.remove(id);
        Ok(())
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> anyhow::Result<u64> {
        let mut map = self.inner.write().await;
        let before = map.len();
        map.retain(|_, s| !s.is_expired(now));
        Ok((before - map.len()) as u64)
    }
}

/// Multi-process backing on the `sessions` table.
#[derive(Clone)]
pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: Session) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, user_name, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(&session.user_name)
        .bind(session.expires_at)
        .execute(&self.db)
        .await
        .context("insert session")?;
        Ok(())
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<Session>> {
        let row = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, user_name, expires_at
              FROM sessions
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("select session")?;
        Ok(row)
    }

    async fn remove(&self, id: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete session")?;
        Ok(())
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.db)
            .await
            .context("purge expired sessions")?;
        Ok(res.rows_affected())
    }

    async fn close(&self) {
        self.db.close().await;
    }
}
