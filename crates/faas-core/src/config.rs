use std::time::Duration;

/// Process-wide configuration, read once at startup the way `faas-bin`
/// reads `FAAS_API_HOST`/`FAAS_API_PORT` from the environment: explicit
/// `std::env::var` reads with defaults, no layered config file.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub invoker_id: String,
    /// Total memory budget (MB) across the free, busy, and prewarm-starting pools.
    pub user_memory_mb: u32,
    /// Per-container model-memory budget; fixed at 2047 MB.
    pub model_memory_budget_mb: u32,
    pub default_unused_timeout: Duration,
    pub prewarm_expiration_check_interval: Duration,
    pub prewarm_expiration_check_variance: Duration,
    pub health_check_period: Duration,
    pub health_check_max_fails: u32,
    pub redis: RedisConfig,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
    pub max_pool_size: usize,
    pub connect_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
            db: 0,
            max_pool_size: 300,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl RedisConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("FAAS_REDIS_HOST").unwrap_or(defaults.host),
            port: std::env::var("FAAS_REDIS_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            password: std::env::var("FAAS_REDIS_PASSWORD").ok(),
            db: std::env::var("FAAS_REDIS_DB")
                .ok()
                .and_then(|d| d.parse().ok())
                .unwrap_or(defaults.db),
            max_pool_size: std::env::var("FAAS_REDIS_MAX_POOL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_pool_size),
            connect_timeout: std::env::var("FAAS_REDIS_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            invoker_id: "invoker0".to_string(),
            user_memory_mb: 4096,
            model_memory_budget_mb: 2047,
            default_unused_timeout: Duration::from_secs(10 * 60),
            prewarm_expiration_check_interval: Duration::from_secs(60),
            prewarm_expiration_check_variance: Duration::from_secs(10),
            health_check_period: Duration::from_secs(5),
            health_check_max_fails: 3,
            redis: RedisConfig::default(),
        }
    }
}

impl CoreConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            invoker_id: std::env::var("FAAS_INVOKER_ID").unwrap_or(defaults.invoker_id),
            user_memory_mb: std::env::var("FAAS_USER_MEMORY_MB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.user_memory_mb),
            model_memory_budget_mb: defaults.model_memory_budget_mb,
            default_unused_timeout: std::env::var("FAAS_KEEP_ALIVE_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(|m: u64| Duration::from_secs(m * 60))
                .unwrap_or(defaults.default_unused_timeout),
            prewarm_expiration_check_interval: defaults.prewarm_expiration_check_interval,
            prewarm_expiration_check_variance: defaults.prewarm_expiration_check_variance,
            health_check_period: defaults.health_check_period,
            health_check_max_fails: defaults.health_check_max_fails,
            redis: RedisConfig::from_env(),
        }
    }
}
