use clap::{Parser, Subcommand};

/// Notification service: simulated email/SMS sends and per-user inboxes
#[derive(Parser)]
#[command(name = "notification-service", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind (defaults to NOTIFY_PORT)
        #[arg(short, long, env = "NOTIFY_PORT")]
        port: Option<u16>,
    },

    /// Inspect and modify notification inboxes directly
    Notification {
        #[command(subcommand)]
        command: NotificationCommands,
    },
}

#[derive(Subcommand)]
pub enum NotificationCommands {
    /// Insert a notification for a user
    Create {
        #[arg(long)]
        user_id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        message: Option<String>,
        /// Free-form tag, e.g. order_shipped or promotion
        #[arg(long = "type")]
        kind: Option<String>,
    },
    /// List a user's notifications, newest first
    List {
        #[arg(long)]
        user_id: i64,
    },
    /// Mark a notification as read
    Read {
        #[arg(long)]
        id: i64,
    },
    /// Print a user's unread count
    Unread {
        #[arg(long)]
        user_id: i64,
    },
}
