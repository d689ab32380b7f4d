//! Shared fixtures: an in-memory repository and router builders.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use tokio::sync::RwLock;
use tower::ServiceExt;

use notification_service::config::Config;
use notification_service::middleware::identity::AuthClient;
use notification_service::models::notification::{NewNotification, Notification, NotificationRow};
use notification_service::service::{IdentityDefaults, NotificationService};
use notification_service::store::{Migrator, NotificationRepository, StoreError};
use notification_service::{api, AppState};

pub const PLACEHOLDER_SENDER: i64 = 1;
pub const DEMO_USER: i64 = 1;

/// In-memory stand-in for the `notifications` table.
#[derive(Default)]
pub struct InMemoryRepo {
    rows: RwLock<Vec<NotificationRow>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row verbatim, nullable columns included.
    pub async fn insert_raw(
        &self,
        user_id: i64,
        title: Option<&str>,
        message: Option<&str>,
        kind: Option<&str>,
    ) -> i64 {
        let mut rows = self.rows.write().await;
        let id = rows.len() as i64 + 1;
        rows.push(NotificationRow {
            id,
            user_id,
            title: title.map(String::from),
            message: message.map(String::from),
            r#type: kind.map(String::from),
            read: false,
            created_at: Utc::now(),
        });
        id
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryRepo {
    async fn create(
        &self,
        notification: &NewNotification,
        user_id: i64,
    ) -> Result<Notification, StoreError> {
        let mut rows = self.rows.write().await;
        let row = NotificationRow {
            id: rows.len() as i64 + 1,
            user_id,
            title: notification.title.clone(),
            message: notification.message.clone(),
            r#type: notification.r#type.clone(),
            read: false,
            created_at: Utc::now(),
        };
        rows.push(row.clone());
        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Notification>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|r| r.id == id).cloned().map(Notification::from))
    }

    async fn list_by_user_id(&self, user_id: i64) -> Result<Vec<Notification>, StoreError> {
        let rows = self.rows.read().await;
        let mut matching: Vec<NotificationRow> =
            rows.iter().filter(|r| r.user_id == user_id).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matching.into_iter().map(Notification::from).collect())
    }

    async fn mark_as_read(&self, id: i64) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|r| r.id == id) {
            Some(row) => {
                row.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_as_read(&self, user_id: i64) -> Result<u64, StoreError> {
        let mut rows = self.rows.write().await;
        let mut updated = 0;
        for row in rows.iter_mut().filter(|r| r.user_id == user_id && !r.read) {
            row.read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn count_unread_by_user_id(&self, user_id: i64) -> Result<i64, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|r| r.user_id == user_id && !r.read).count() as i64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Repository whose every call fails as if the pool could not connect.
pub struct DownRepo;

#[async_trait]
impl Migrator for DownRepo {
    async fn migrate(&self) -> anyhow::Result<()> {
        Err(sqlx::Error::PoolTimedOut.into())
    }
}

#[async_trait]
impl NotificationRepository for DownRepo {
    async fn create(&self, _: &NewNotification, _: i64) -> Result<Notification, StoreError> {
        Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut))
    }

    async fn find_by_id(&self, _: i64) -> Result<Option<Notification>, StoreError> {
        Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut))
    }

    async fn list_by_user_id(&self, _: i64) -> Result<Vec<Notification>, StoreError> {
        Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut))
    }

    async fn mark_as_read(&self, _: i64) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut))
    }

    async fn mark_all_as_read(&self, _: i64) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut))
    }

    async fn count_unread_by_user_id(&self, _: i64) -> Result<i64, StoreError> {
        Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut))
    }
}

pub fn state(
    repo: Arc<dyn NotificationRepository>,
    auth_service_url: Option<String>,
    allow_demo_identity: bool,
) -> Arc<AppState> {
    let config = Config {
        auth_service_url: auth_service_url.clone(),
        allow_demo_identity,
        demo_user_id: DEMO_USER,
        placeholder_sender_user_id: PLACEHOLDER_SENDER,
        ..Config::default()
    };
    Arc::new(AppState {
        service: NotificationService::new(
            repo,
            IdentityDefaults {
                placeholder_sender_user_id: PLACEHOLDER_SENDER,
                default_user_id: DEMO_USER,
            },
        ),
        auth: AuthClient::new(auth_service_url, Duration::from_secs(2)).unwrap(),
        config,
    })
}

/// Full app in demo mode with no auth service.
pub fn demo_app(repo: Arc<dyn NotificationRepository>) -> Router {
    api::app(state(repo, None, true))
}

pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn patch(uri: &str) -> Request<Body> {
    Request::builder()
        .method("PATCH")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
