use anyhow::Result;

pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub notification: NotificationConfig,
    pub sweep: SweepConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        let database = DatabaseConfig {
            host: std::env::var("DATABASE_HOST")?,
            port: std::env::var("DATABASE_PORT")?.parse::<u16>()?,
            username: std::env::var("DATABASE_USERNAME")?,
            password: std::env::var("DATABASE_PASSWORD")?,
            database: std::env::var("DATABASE_NAME")?,
        };
        let server = ServerConfig {
            port: optional_var("SERVER_PORT")?.unwrap_or(8080),
        };
        let notification = NotificationConfig {
            webhook_url: std::env::var("NOTIFICATION_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.is_empty()),
        };
        let sweep = SweepConfig {
            interval_secs: optional_var("SWEEP_INTERVAL_SECS")?.unwrap_or(60),
        };
        Ok(Self {
            database,
            server,
            notification,
            sweep,
        })
    }
}

fn optional_var<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => Ok(Some(v.parse::<T>()?)),
        Err(_) => Ok(None),
    }
}

pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

pub struct ServerConfig {
    pub port: u16,
}

pub struct NotificationConfig {
    // 未設定ならログ出力のみ
    pub webhook_url: Option<String>,
}

pub struct SweepConfig {
    pub interval_secs: u64,
}
