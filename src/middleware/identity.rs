//! Caller identity resolution.
//!
//! A bearer token is exchanged with the external auth service
//! (`GET {AUTH_SERVICE_URL}/api/v1/auth/me`) for the caller's user id. When
//! that fails for any reason the request either proceeds as the configured
//! demo user or is rejected with 401, depending on
//! `NOTIFY_ALLOW_DEMO_IDENTITY`.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use serde::Deserialize;
use thiserror::Error;

use crate::errors::AppError;
use crate::AppState;

// ── Types ────────────────────────────────────────────────────

/// Where the request's identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    AuthService,
    DemoFallback,
}

/// Resolved caller, attached to the request as an extension.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub username: Option<String>,
    pub source: IdentitySource,
}

impl IdentitySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentitySource::AuthService => "auth_service",
            IdentitySource::DemoFallback => "demo_fallback",
        }
    }
}

impl Identity {
    pub fn demo(user_id: i64) -> Self {
        Self {
            user_id: user_id.to_string(),
            username: None,
            source: IdentitySource::DemoFallback,
        }
    }
}

/// User record returned by the auth service.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub username: Option<String>,
}

/// The auth service has emitted ids both as strings and as numbers.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum UserId {
    Text(String),
    Number(i64),
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserId::Text(s) => f.write_str(s),
            UserId::Number(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("missing Authorization header")]
    MissingToken,

    #[error("malformed Authorization header")]
    MalformedHeader,

    #[error("no auth service configured")]
    NotConfigured,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("auth service error: {status} - {body}")]
    Service { status: StatusCode, body: String },

    #[error("request auth service: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("decode response: {0}")]
    Decode(#[source] reqwest::Error),
}

// ── Auth Client ──────────────────────────────────────────────

#[derive(Clone)]
pub struct AuthClient {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl AuthClient {
    pub fn new(base_url: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
        })
    }

    /// Look up the user that owns `token`.
    pub async fn get_me(&self, token: &str) -> Result<AuthUser, IdentityError> {
        let base = self.base_url.as_deref().ok_or(IdentityError::NotConfigured)?;

        let resp = self
            .client
            .get(format!("{}/api/v1/auth/me", base))
            .bearer_auth(token)
            .send()
            .await
            .map_err(IdentityError::Transport)?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(IdentityError::InvalidToken);
        }
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(IdentityError::Service { status, body });
        }

        resp.json::<AuthUser>().await.map_err(IdentityError::Decode)
    }

    /// Resolve the identity carried by `headers`.
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<Identity, IdentityError> {
        let token = bearer_token(headers)?;
        let user = self.get_me(token).await?;
        Ok(Identity {
            user_id: user.id.to_string(),
            username: user.username,
            source: IdentitySource::AuthService,
        })
    }
}

/// Extract `<token>` from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, IdentityError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(IdentityError::MissingToken)?
        .to_str()
        .map_err(|_| IdentityError::MalformedHeader)?;

    match value.strip_prefix("Bearer ").map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(IdentityError::MalformedHeader),
    }
}

// ── Middleware ───────────────────────────────────────────────

/// Middleware: attaches an [`Identity`] to every request, or rejects it with
/// 401 when resolution fails and the demo fallback is disabled.
pub async fn resolve_identity(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = match state.auth.resolve(req.headers()).await {
        Ok(identity) => identity,
        Err(e) if state.config.allow_demo_identity => {
            if matches!(e, IdentityError::MissingToken) {
                tracing::debug!("no token provided, using demo identity");
            } else {
                tracing::warn!(error = %e, "identity resolution failed, using demo identity");
            }
            Identity::demo(state.config.demo_user_id)
        }
        Err(e) => {
            tracing::warn!(error = %e, "identity resolution failed");
            return Err(AppError::Unauthorized);
        }
    };

    tracing::debug!(
        user_id = %identity.user_id,
        username = identity.username.as_deref().unwrap_or("-"),
        source = identity.source.as_str(),
        "identity resolved"
    );
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

// ── Tests ─────────────────────────────────────────────────────
