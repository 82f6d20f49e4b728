use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::auth::repo_types::{NewUser, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Persistence of user identity records.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Find a user by normalized email.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    /// Insert a new user. Fails with `StoreError::Conflict` if the email is taken.
    async fn create(&self, user: NewUser<'_>) -> Result<User, StoreError>;
    async fn close(&self) {}
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password AS password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("select user by email")?;
        Ok(user)
    }

    async fn create(&self, user: NewUser<'_>) -> Result<User, StoreError> {
        let res = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password AS password_hash, created_at
            "#,
        )
        .bind(user.name)
        .bind(user.email)
        .bind(user.password_hash)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(u) => Ok(u),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StoreError::Conflict),
            Err(e) => Err(anyhow::Error::new(e).context("insert user").into()),
        }
    }

    async fn close(&self) {
        self.db.close().await;
    }
}

#[cfg(test)]
pub mod fakes {
    use super::*;
    use time::OffsetDateTime;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    /// In-memory user store keyed on the normalized email.
    #[derive(Default)]
    pub struct MemoryUserRepo {
        pub(crate) users: Mutex<Vec<User>>,
        /// Every lookup fails.
        pub fail_lookup: bool,
        /// Every insert fails with a non-conflict error.
        pub fail_create: bool,
        /// Every insert reports a unique-key conflict, as when another
        /// request registered the same email first.
        pub conflict_on_create: bool,
    }

    impl MemoryUserRepo {
        pub fn failing() -> Self {
            Self {
                fail_lookup: true,
                ..Self::default()
            }
        }

        /// Store `user` as-is, hash included.
        pub async fn seed(&self, user: User) {
            self.users.lock().await.push(user);
        }

        pub async fn len(&self) -> usize {
            self.users.lock().await.len()
        }
    }

    #[async_trait]
    impl UserRepo for MemoryUserRepo {
        async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
            if self.fail_lookup {
                anyhow::bail!("connection refused");
            }
            let users = self.users.lock().await;
            Ok(users.iter().find(|u| u.email == email).cloned())
        }

        async fn create(&self, user: NewUser<'_>) -> Result<User, StoreError> {
            if self.fail_create {
                return Err(anyhow::anyhow!("connection reset").into());
            }
            if self.conflict_on_create {
                return Err(StoreError::Conflict);
            }
            let mut users = self.users.lock().await;
            if users.iter().any(|u| u.email == user.email) {
                return Err(StoreError::Conflict);
            }
            let created = User {
                id: Uuid::new_v4(),
                name: user.name.to_string(),
                email: user.email.to_string(),
                password_hash: user.password_hash.to_string(),
                created_at: OffsetDateTime::now_utc(),
            };
            users.push(created.clone());
            Ok(created)
        }
    }
}
