use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Root directory for stored image files.
    pub storage_root: String,
    /// Base URL prefixed to storage keys when building public image URLs.
    pub public_url_base: String,
    /// Rolling-window upload rate limit, per user.
    pub upload_max_requests: u32,
    pub upload_window: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let storage_root = env::var("STORAGE_ROOT").unwrap_or_else(|_| "./storage".to_string());
        let public_url_base = env::var("PUBLIC_URL_BASE")
            .unwrap_or_else(|_| format!("http://{host}:{port}/files"));
        let upload_max_requests = env::var("UPLOAD_MAX_REQUESTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(30);
        let upload_window_secs = env::var("UPLOAD_WINDOW_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);
        Ok(Self {
            database_url,
            host,
            port,
            storage_root,
            public_url_base,
            upload_max_requests,
            upload_window: Duration::from_secs(upload_window_secs),
        })
    }
}
