mod manager;
mod store;

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[cfg(test)]
pub(crate) use manager::test_clock;
pub use manager::SessionManager;
pub use store::{MemorySessionStore, PgSessionStore, Session, SessionStore};

/// Periodically drop expired sessions. Lookups already ignore them; this only
/// keeps the backing store from growing.
pub fn spawn_sweeper(manager: SessionManager, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            match manager.purge_expired().await {
                Ok(0) => {}
                Ok(n) => debug!(removed = n, "expired sessions purged"),
                Err(e) => warn!(error = %e, "session sweep failed"),
            }
        }
    })
}
