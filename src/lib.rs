//! Notification service: simulated email/SMS sends recorded into a per-user
//! inbox, with listing, unread counts and read-state updates over HTTP.

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod service;
pub mod store;

use middleware::identity::AuthClient;
use service::NotificationService;

/// Shared application state passed to handlers and middleware.
/// Built once in `main` and shared as `Arc<AppState>` for the process lifetime.
pub struct AppState {
    pub service: NotificationService,
    pub auth: AuthClient,
    pub config: config::Config,
}
