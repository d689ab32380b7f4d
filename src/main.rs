use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notification_service::cli;
use notification_service::config::{self, Config};
use notification_service::middleware::identity::AuthClient;
use notification_service::models::notification::NewNotification;
use notification_service::service::{IdentityDefaults, NotificationService};
use notification_service::store::postgres::PgStore;
use notification_service::store::{self, NotificationRepository};
use notification_service::{api, AppState};

const MIGRATION_RETRY_SECS: u64 = 15;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load()?;
    init_tracing(&cfg)?;

    let args = cli::Cli::parse();

    match args.command {
        Some(cli::Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(cli::Commands::Notification { command }) => {
            let db = PgStore::connect_lazy(&cfg)?;
            handle_notification_command(&db, command).await
        }
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    }
}

fn init_tracing(cfg: &Config) -> anyhow::Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    // Export spans over OTLP only when a collector is configured.
    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "notification-service"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .context("failed to install OpenTelemetry tracer")?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    let (json_layer, text_layer) = if cfg.json_logs {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "notification_service=debug,tower_http=debug".into()),
        ))
        .with(json_layer)
        .with(text_layer)
        .with(telemetry_layer)
        .init();

    Ok(())
}

async fn run_server(cfg: Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Connecting to database...");
    let db = Arc::new(PgStore::connect_lazy(&cfg)?);

    if cfg.run_migrations {
        tracing::info!("Running migrations...");
        if !store::apply_migrations(&*db).await {
            store::spawn_migration_retry(
                db.clone(),
                Duration::from_secs(MIGRATION_RETRY_SECS),
            );
        }
    }

    if cfg.allow_demo_identity {
        tracing::warn!(
            demo_user_id = cfg.demo_user_id,
            "demo identity fallback is enabled; unauthenticated requests act as the demo user"
        );
    }

    let auth = AuthClient::new(
        cfg.auth_service_url.clone(),
        Duration::from_secs(cfg.auth_timeout_secs),
    )?;

    let service = NotificationService::new(
        db,
        IdentityDefaults {
            placeholder_sender_user_id: cfg.placeholder_sender_user_id,
            default_user_id: cfg.demo_user_id,
        },
    );

    let state = Arc::new(AppState {
        service,
        auth,
        config: cfg,
    });

    let app = api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("notification service listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("notification service stopped");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = signal::ctrl_c() => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

async fn handle_notification_command(
    db: &PgStore,
    cmd: cli::NotificationCommands,
) -> anyhow::Result<()> {
    match cmd {
        cli::NotificationCommands::Create {
            user_id,
            title,
            message,
            kind,
        } => {
            let new = NewNotification {
                r#type: kind,
                title,
                message,
            };
            let created = db
                .create(&new, user_id)
                .await
                .context("failed to insert notification")?;
            println!(
                "Notification created:\n  ID:      {}\n  User:    {}\n  Type:    {}\n  Title:   {}\n  Created: {}",
                created.id,
                created.user_id,
                created.r#type.as_deref().unwrap_or("-"),
                created.title,
                created.created_at.to_rfc3339()
            );
        }
        cli::NotificationCommands::List { user_id } => {
            let notifications = db
                .list_by_user_id(user_id)
                .await
                .context("failed to list notifications")?;
            if notifications.is_empty() {
                println!("No notifications found.");
                return Ok(());
            }

            println!(
                "{:<8} {:<16} {:<6} {:<30} CREATED",
                "ID", "TYPE", "READ", "TITLE"
            );
            for n in notifications {
                let title = if n.title.chars().count() > 30 {
                    format!("{}...", n.title.chars().take(27).collect::<String>())
                } else {
                    n.title.clone()
                };
                println!(
                    "{:<8} {:<16} {:<6} {:<30} {}",
                    n.id,
                    n.r#type.as_deref().unwrap_or("-"),
                    n.read,
                    title,
                    n.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        cli::NotificationCommands::Read { id } => {
            let found = db
                .mark_as_read(id)
                .await
                .context("failed to update notification")?;
            if found {
                println!("Notification {} marked as read.", id);
            } else {
                println!("Notification {} not found.", id);
            }
        }
        cli::NotificationCommands::Unread { user_id } => {
            let count = db
                .count_unread_by_user_id(user_id)
                .await
                .context("failed to count unread notifications")?;
            println!("{}", count);
        }
    }
    Ok(())
}
