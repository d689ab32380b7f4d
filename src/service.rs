//! Validation and orchestration over [`NotificationRepository`].
//!
//! The service never touches the pool directly; it is handed a repository at
//! startup and is otherwise stateless.

use std::sync::Arc;

use crate::errors::AppError;
use crate::models::notification::{NewNotification, Notification, SendEmailRequest, SendSmsRequest};
use crate::store::NotificationRepository;

/// Recipient value used by clients to simulate a delivery failure.
pub const FAILURE_SENTINEL_RECIPIENT: &str = "invalid";

/// How a raw identity string becomes a user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityPolicy {
    /// Unparseable or empty identities fall back to the default user.
    Permissive,
    /// Empty, unparseable or non-positive identities are rejected.
    Strict,
}

/// Resolve `raw` to a user id under `policy`.
pub fn resolve_user_id(raw: &str, policy: IdentityPolicy, default_user_id: i64) -> Result<i64, AppError> {
    let parsed = raw.trim().parse::<i64>().ok();
    match policy {
        IdentityPolicy::Permissive => Ok(parsed.unwrap_or(default_user_id)),
        IdentityPolicy::Strict => match parsed {
            Some(id) if id > 0 => Ok(id),
            _ => Err(AppError::InvalidIdentity),
        },
    }
}

/// User ids the service falls back on.
#[derive(Debug, Clone, Copy)]
pub struct IdentityDefaults {
    /// Owner of simulated email/SMS sends.
    pub placeholder_sender_user_id: i64,
    /// Used by the permissive policy when the caller's identity is unusable.
    pub default_user_id: i64,
}

#[derive(Clone)]
pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
    identities: IdentityDefaults,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>, identities: IdentityDefaults) -> Self {
        Self { repo, identities }
    }

    /// Record an email notification. No mail is actually sent.
    #[tracing::instrument(skip(self, req))]
    pub async fn send_email(&self, req: &SendEmailRequest) -> Result<Notification, AppError> {
        let to = req.to.trim();
        if to.is_empty() || to == FAILURE_SENTINEL_RECIPIENT {
            tracing::warn!(to = %req.to, "rejecting email with invalid recipient");
            return Err(AppError::InvalidRecipient);
        }

        let notification = self
            .repo
            .create(
                &NewNotification::email(&req.subject),
                self.identities.placeholder_sender_user_id,
            )
            .await?;

        tracing::info!(notification_id = notification.id, "email notification recorded");
        Ok(notification)
    }

    /// Record an SMS notification. The recipient is not validated.
    #[tracing::instrument(skip(self, req))]
    pub async fn send_sms(&self, req: &SendSmsRequest) -> Result<Notification, AppError> {
        let notification = self
            .repo
            .create(
                &NewNotification::sms(&req.message),
                self.identities.placeholder_sender_user_id,
            )
            .await?;

        tracing::info!(notification_id = notification.id, "sms notification recorded");
        Ok(notification)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>, AppError> {
        let uid = resolve_user_id(
            user_id,
            IdentityPolicy::Permissive,
            self.identities.default_user_id,
        )?;
        let notifications = self.repo.list_by_user_id(uid).await?;
        tracing::debug!(user_id = uid, count = notifications.len(), "notifications listed");
        Ok(notifications)
    }

    /// Unparseable ids and missing rows are both `NotFound`.
    #[tracing::instrument(skip(self))]
    pub async fn get_notification(&self, id: &str) -> Result<Notification, AppError> {
        let id = parse_notification_id(id)?;
        self.repo.find_by_id(id).await?.ok_or(AppError::NotFound)
    }

    /// Mark one notification read and return its current state. Marking an
    /// already-read notification succeeds without changing anything.
    #[tracing::instrument(skip(self))]
    pub async fn mark_as_read(&self, id: &str) -> Result<Notification, AppError> {
        let id = parse_notification_id(id)?;
        if !self.repo.mark_as_read(id).await? {
            return Err(AppError::NotFound);
        }
        // Separate round trip; a concurrent writer may interleave.
        self.repo.find_by_id(id).await?.ok_or(AppError::NotFound)
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_all_as_read(&self, user_id: &str) -> Result<u64, AppError> {
        let uid = resolve_user_id(
            user_id,
            IdentityPolicy::Permissive,
            self.identities.default_user_id,
        )?;
        let updated = self.repo.mark_all_as_read(uid).await?;
        tracing::info!(user_id = uid, updated, "marked all notifications read");
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    pub async fn count_unread(&self, user_id: &str) -> Result<i64, AppError> {
        let uid = resolve_user_id(user_id, IdentityPolicy::Strict, self.identities.default_user_id)?;
        Ok(self.repo.count_unread_by_user_id(uid).await?)
    }

    /// Storage round trip for readiness checks.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn ping(&self) -> Result<(), AppError> {
        Ok(self.repo.ping().await?)
    }
}

fn parse_notification_id(raw: &str) -> Result<i64, AppError> {
    raw.trim().parse::<i64>().map_err(|_| {
        tracing::debug!(id = raw, "unparseable notification id");
        AppError::NotFound
    })
}
