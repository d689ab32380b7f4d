use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::models::notification::{NewNotification, Notification};

pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    /// No connection could be obtained from the pool.
    #[error("database connection not available: {0}")]
    Unavailable(sqlx::Error),

    #[error("database operation failed: {0}")]
    Operation(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(e),
            other => StoreError::Operation(other),
        }
    }
}

/// Persistence contract for the notification inbox.
///
/// Implementations return API-shaped [`Notification`]s with the title/message
/// coalescing already applied; raw rows never leave the store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Insert an unread notification owned by `user_id`.
    async fn create(
        &self,
        notification: &NewNotification,
        user_id: i64,
    ) -> Result<Notification, StoreError>;

    /// `Ok(None)` when no row has this id.
    async fn find_by_id(&self, id: i64) -> Result<Option<Notification>, StoreError>;

    /// Newest first. Empty when the user has no notifications.
    async fn list_by_user_id(&self, user_id: i64) -> Result<Vec<Notification>, StoreError>;

    /// Set `read = true` regardless of the current state. Returns whether a
    /// row with this id exists.
    async fn mark_as_read(&self, id: i64) -> Result<bool, StoreError>;

    /// Returns the number of rows that moved from unread to read.
    async fn mark_all_as_read(&self, user_id: i64) -> Result<u64, StoreError>;

    async fn count_unread_by_user_id(&self, user_id: i64) -> Result<i64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Applies the embedded schema.
#[async_trait]
pub trait Migrator: Send + Sync {
    async fn migrate(&self) -> anyhow::Result<()>;
}

/// Run migrations once. A failure is logged, not returned: the service keeps
/// serving and storage errors surface per request until the database is back.
/// Returns whether the schema was applied.
pub async fn apply_migrations(migrator: &dyn Migrator) -> bool {
    match migrator.migrate().await {
        Ok(()) => {
            tracing::info!("migrations applied");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to apply migrations, starting degraded");
            false
        }
    }
}

/// Keep retrying migrations every `every` until one succeeds.
pub fn spawn_migration_retry(migrator: Arc<dyn Migrator>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if apply_migrations(&*migrator).await {
                break;
            }
        }
    })
}
