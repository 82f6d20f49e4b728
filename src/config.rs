#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub backend: SessionBackend,
    pub ttl_hours: i64,
    pub sweep_secs: u64,
    pub cookie_secure: bool,
}

/// Fixed-window limit applied per client address.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub session: SessionConfig,
    pub rate_limit: RateLimitConfig,
    pub bcrypt_cost: u32,
    /// When set, a failed measurement insert fails the request instead of
    /// only being logged.
    pub strict_health_persist: bool,
    pub static_dir: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let backend = match std::env::var("SESSION_BACKEND")
            .unwrap_or_else(|_| "memory".into())
            .to_lowercase()
            .as_str()
        {
            "memory" => SessionBackend::Memory,
            "postgres" => SessionBackend::Postgres,
            other => anyhow::bail!("unknown SESSION_BACKEND: {other}"),
        };
        let session = SessionConfig {
            backend,
            ttl_hours: env_parse("SESSION_TTL_HOURS", 24),
            sweep_secs: env_parse("SESSION_SWEEP_SECS", 0),
            cookie_secure: env_flag("SESSION_COOKIE_SECURE"),
        };
        let rate_limit = RateLimitConfig {
            max_requests: env_parse("RATE_LIMIT_MAX", 100),
            window_secs: env_parse("RATE_LIMIT_WINDOW_SECS", 15 * 60),
        };
        Ok(Self {
            database_url,
            session,
            rate_limit,
            bcrypt_cost: env_parse("BCRYPT_COST", 10),
            strict_health_persist: env_flag("STRICT_HEALTH_PERSIST"),
            static_dir: std::env::var("STATIC_DIR").unwrap_or_else(|_| "public".into()),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
