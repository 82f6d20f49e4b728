use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use anyhow::Context;
use tokio::sync::OnceCell;
use tracing::{error, warn};

/// Salted bcrypt hashing with a fixed work factor.
///
/// Both operations are CPU-bound and run on the blocking pool.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    /// Hash at the same cost, verified against when no real hash exists.
    dummy: Arc<OnceCell<String>>,
    verifications: Arc<AtomicU64>,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            dummy: Arc::new(OnceCell::new()),
            verifications: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let plain = plain.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
            .await
            .context("hash task panicked")?
            .map_err(|e| {
                error!(error = %e, "bcrypt hash error");
                anyhow::anyhow!(e.to_string())
            })
    }

    /// Constant-time comparison is left to bcrypt.
    pub async fn verify(&self, plain: &str, hash: &str) -> anyhow::Result<bool> {
        self.verifications.fetch_add(1, Ordering::Relaxed);
        let plain = plain.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
            .await
            .context("verify task panicked")?
            .map_err(|e| {
                error!(error = %e, "bcrypt parse hash error");
                anyhow::anyhow!(e.to_string())
            })
    }

    /// Build the placeholder hash ahead of the first unknown-email login.
    pub async fn warm_up(&self) -> anyhow::Result<()> {
        self.dummy
            .get_or_try_init(|| self.hash("placeholder-password"))
            .await?;
        Ok(())
    }

    /// Spend one verify worth of work with nothing to compare against, so an
    /// unknown account costs the same as a wrong password.
    pub async fn verify_dummy(&self, plain: &str) {
        let dummy = match self
            .dummy
            .get_or_try_init(|| self.hash("placeholder-password"))
            .await
        {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "placeholder hash unavailable");
                return;
            }
        };
        let _ = self.verify(plain, dummy).await;
    }

    #[cfg(test)]
    pub fn verifications(&self) -> u64 {
        self.verifications.load(Ordering::Relaxed)
    }
}
