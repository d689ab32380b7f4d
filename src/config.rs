#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Apply the embedded schema migration at startup.
    pub run_migrations: bool,
    /// Base URL of the identity service. When unset every lookup fails and
    /// the demo fallback (if allowed) applies.
    pub auth_service_url: Option<String>,
    pub auth_timeout_secs: u64,
    /// Substitute `demo_user_id` when identity resolution fails instead of
    /// rejecting the request. Must be off in production.
    pub allow_demo_identity: bool,
    pub demo_user_id: i64,
    /// Owner of notifications created by the simulated email/SMS sends.
    /// Sends are not attributed to the caller yet.
    pub placeholder_sender_user_id: i64,
    pub json_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: "postgres://localhost/notifications".into(),
            db_max_connections: 10,
            db_acquire_timeout_secs: 5,
            run_migrations: true,
            auth_service_url: None,
            auth_timeout_secs: 5,
            allow_demo_identity: true,
            demo_user_id: 1,
            placeholder_sender_user_id: 1,
            json_logs: false,
        }
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Build a [`Config`] from an arbitrary key lookup. `load` passes the process
/// environment; tests pass a map.
pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = Config::default();

    let production = lookup("NOTIFY_ENV")
        .or_else(|| lookup("RUST_ENV"))
        .map(|v| v == "production")
        .unwrap_or(false);

    let allow_demo_identity = match lookup("NOTIFY_ALLOW_DEMO_IDENTITY") {
        Some(v) => parse_bool("NOTIFY_ALLOW_DEMO_IDENTITY", &v)?,
        None => !production,
    };

    if production && allow_demo_identity {
        anyhow::bail!(
            "NOTIFY_ALLOW_DEMO_IDENTITY is enabled in production. \
             Unauthenticated requests would be attributed to the demo user."
        );
    }

    let auth_service_url = lookup("AUTH_SERVICE_URL")
        .map(|u| u.trim().trim_end_matches('/').to_string())
        .filter(|u| !u.is_empty());

    if auth_service_url.is_none() && !allow_demo_identity {
        anyhow::bail!("AUTH_SERVICE_URL must be set when NOTIFY_ALLOW_DEMO_IDENTITY is disabled");
    }

    let run_migrations = match lookup("NOTIFY_RUN_MIGRATIONS") {
        Some(v) => parse_bool("NOTIFY_RUN_MIGRATIONS", &v)?,
        None => defaults.run_migrations,
    };

    Ok(Config {
        port: parse_var(&lookup, "NOTIFY_PORT", defaults.port)?,
        database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
        db_max_connections: parse_var(&lookup, "NOTIFY_DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
        db_acquire_timeout_secs: parse_var(
            &lookup,
            "NOTIFY_DB_ACQUIRE_TIMEOUT_SECS",
            defaults.db_acquire_timeout_secs,
        )?,
        run_migrations,
        auth_service_url,
        auth_timeout_secs: parse_var(&lookup, "NOTIFY_AUTH_TIMEOUT_SECS", defaults.auth_timeout_secs)?,
        allow_demo_identity,
        demo_user_id: parse_var(&lookup, "NOTIFY_DEMO_USER_ID", defaults.demo_user_id)?,
        placeholder_sender_user_id: parse_var(
            &lookup,
            "NOTIFY_PLACEHOLDER_SENDER_USER_ID",
            defaults.placeholder_sender_user_id,
        )?,
        json_logs: lookup("NOTIFY_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false),
    })
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value for {}: '{}' ({})", key, raw, e)),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("invalid boolean for {}: '{}'", key, raw),
    }
}
