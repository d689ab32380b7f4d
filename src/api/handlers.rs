use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::errors::AppError;
use crate::middleware::identity::Identity;
use crate::models::notification::{Notification, SendEmailRequest, SendSmsRequest};
use crate::AppState;

// ── Response DTOs ────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkAllResponse {
    pub updated: u64,
}

// ── Request validation ───────────────────────────────────────

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidRequestBody(format!(
            "field `{}` is required",
            field
        )));
    }
    Ok(())
}

fn validate_email_request(req: &SendEmailRequest) -> Result<(), AppError> {
    require("to", &req.to)?;
    require("subject", &req.subject)?;
    require("body", &req.body)?;
    if !EMAIL_RE.is_match(req.to.trim()) {
        return Err(AppError::InvalidRequestBody(
            "field `to` must be an email address".into(),
        ));
    }
    Ok(())
}

fn validate_sms_request(req: &SendSmsRequest) -> Result<(), AppError> {
    require("to", &req.to)?;
    require("message", &req.message)
}

fn body_rejection(rejection: JsonRejection) -> AppError {
    tracing::warn!("invalid request body: {}", rejection.body_text());
    AppError::InvalidRequestBody(rejection.body_text())
}

// ── Send Handlers ────────────────────────────────────────────

/// POST /api/v1/notify/email : record a simulated email
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SendEmailRequest>, JsonRejection>,
) -> Result<Json<Notification>, AppError> {
    let Json(req) = payload.map_err(body_rejection)?;
    validate_email_request(&req)?;

    let notification = state.service.send_email(&req).await.map_err(|e| {
        tracing::error!("send_email failed: {}", e);
        e
    })?;
    Ok(Json(notification))
}

/// POST /api/v1/notify/sms : record a simulated SMS
pub async fn send_sms(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SendSmsRequest>, JsonRejection>,
) -> Result<Json<Notification>, AppError> {
    let Json(req) = payload.map_err(body_rejection)?;
    validate_sms_request(&req)?;

    let notification = state.service.send_sms(&req).await.map_err(|e| {
        tracing::error!("send_sms failed: {}", e);
        e
    })?;
    Ok(Json(notification))
}

// ── Inbox Handlers ───────────────────────────────────────────

/// GET /api/v1/notifications : the caller's inbox, newest first
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    identity: Option<Extension<Identity>>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let user_id = identity.map(|Extension(i)| i.user_id).unwrap_or_default();
    let notifications = state.service.list_notifications(&user_id).await?;
    tracing::info!(count = notifications.len(), "notifications listed");
    Ok(Json(notifications))
}

/// GET /api/v1/notifications/count : unread count
pub async fn count_unread_notifications(
    State(state): State<Arc<AppState>>,
    identity: Option<Extension<Identity>>,
) -> Result<Json<CountResponse>, AppError> {
    let Some(Extension(identity)) = identity else {
        tracing::warn!("missing identity in request context");
        return Err(AppError::Unauthorized);
    };

    let count = state.service.count_unread(&identity.user_id).await?;
    Ok(Json(CountResponse { count }))
}

/// GET /api/v1/notifications/:id
pub async fn get_notification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Notification>, AppError> {
    let notification = state.service.get_notification(&id).await?;
    Ok(Json(notification))
}

/// PATCH /api/v1/notifications/:id : mark as read
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Notification>, AppError> {
    let notification = state.service.mark_as_read(&id).await?;
    tracing::info!(notification_id = notification.id, "notification marked as read");
    Ok(Json(notification))
}

/// POST /api/v1/notifications/read-all : mark the caller's inbox read
pub async fn mark_all_notifications_read(
    State(state): State<Arc<AppState>>,
    identity: Option<Extension<Identity>>,
) -> Result<Json<MarkAllResponse>, AppError> {
    let user_id = identity.map(|Extension(i)| i.user_id).unwrap_or_default();
    let updated = state.service.mark_all_as_read(&user_id).await?;
    Ok(Json(MarkAllResponse { updated }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: &str, subject: &str, body: &str) -> SendEmailRequest {
        SendEmailRequest {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    #[test]
    fn test_email_shape() {
        assert!(validate_email_request(&email("a@example.com", "s", "b")).is_ok());
        for to in ["invalid", "a@b", "a b@example.com", "@example.com"] {
            assert!(
                matches!(
                    validate_email_request(&email(to, "s", "b")),
                    Err(AppError::InvalidRequestBody(_))
                ),
                "accepted '{}'",
                to
            );
        }
    }

    #[test]
    fn test_email_required_fields() {
        let err = validate_email_request(&email("a@example.com", "", "b")).unwrap_err();
        assert!(err.to_string().contains("subject"));
        let err = validate_email_request(&email("a@example.com", "s", "  ")).unwrap_err();
        assert!(err.to_string().contains("body"));
    }

    #[test]
    fn test_sms_required_fields() {
        let ok = SendSmsRequest {
            to: "+15550100".into(),
            message: "hi".into(),
        };
        assert!(validate_sms_request(&ok).is_ok());

        let missing = SendSmsRequest {
            to: "+15550100".into(),
            message: String::new(),
        };
        assert!(matches!(
            validate_sms_request(&missing),
            Err(AppError::InvalidRequestBody(_))
        ));
    }
}
