use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;
use crate::models::notification::{NewNotification, Notification, NotificationRow};
use crate::store::{Migrator, NotificationRepository, StoreError};

const NOTIFICATION_COLUMNS: &str = "id, user_id, title, message, type, read, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Build the pool without opening a connection. A database that is down at
    /// startup surfaces as per-request storage errors instead of a crash.
    pub fn connect_lazy(cfg: &Config) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(cfg.db_max_connections)
            .acquire_timeout(Duration::from_secs(cfg.db_acquire_timeout_secs))
            .connect_lazy(&cfg.database_url)?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Migrator for PgStore {
    /// Run pending migrations from the migrations/ directory.
    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationRepository for PgStore {
    async fn create(
        &self,
        notification: &NewNotification,
        user_id: i64,
    ) -> Result<Notification, StoreError> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"INSERT INTO notifications (user_id, title, message, type, read)
               VALUES ($1, $2, $3, $4, false)
               RETURNING {NOTIFICATION_COLUMNS}"#
        ))
        .bind(user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.r#type)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(id = row.id, user_id, "notification inserted");
        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Notification>, StoreError> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Notification::from))
    }

    async fn list_by_user_id(&self, user_id: i64) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"SELECT {NOTIFICATION_COLUMNS}
               FROM notifications
               WHERE user_id = $1
               ORDER BY created_at DESC, id DESC"#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn mark_as_read(&self, id: i64) -> Result<bool, StoreError> {
        // Postgres counts matched rows, so an already-read row still reports 1.
        let result = sqlx::query(r#"UPDATE notifications SET read = true WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_as_read(&self, user_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"UPDATE notifications SET read = true WHERE user_id = $1 AND read = false"#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn count_unread_by_user_id(&self, user_id: i64) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = false"#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
