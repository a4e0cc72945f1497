/// Runtime configuration, read from the environment (and `.env` when present)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub metrics_port: u16,
    pub enable_metrics: bool,
    pub low_stock_threshold: i32,
    /// Seconds between store reachability checks behind `/health`
    pub health_check_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparsable values fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            metrics_port: lookup("METRICS_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(9090),
            enable_metrics: lookup("ENABLE_METRICS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            low_stock_threshold: lookup("LOW_STOCK_THRESHOLD")
                .and_then(|v| v.parse().ok())
                .filter(|t: &i32| *t >= 0)
                .unwrap_or(10),
            health_check_secs: lookup("HEALTH_CHECK_SECS")
                .and_then(|v| v.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .unwrap_or(30),
        }
    }

    pub fn uses_database(&self) -> bool {
        self.database_url.is_some()
    }
}
