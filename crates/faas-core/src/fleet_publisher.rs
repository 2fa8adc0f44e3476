use deadpool_redis::{redis::AsyncCommands, Config as PoolConfig, Pool, Runtime, Timeouts};
use tracing::{error, warn};

use crate::config::RedisConfig;

const INVOKER_ID_HASH: &str = "invokerId";
const PRE_LOADED_ACTION_HASH: &str = "preLoadedAction";
const BUSY_POOL_SIZE_HASH: &str = "busyPoolSize";

/// Write-only client to the external shared key/value store used to
/// publish fleet-wide liveness for a controller-side load balancer.
/// Writes are best-effort: errors are logged and never propagated, because
/// a store hiccup must never fail an activation.
pub struct FleetStatePublisher {
    pool: Pool,
}

impl FleetStatePublisher {
    pub fn connect(config: &RedisConfig) -> crate::error::Result<Self> {
        let url = match &config.password {
            Some(password) => format!(
                "redis://:{password}@{host}:{port}/{db}",
                password = password,
                host = config.host,
                port = config.port,
                db = config.db
            ),
            None => format!("redis://{}:{}/{}", config.host, config.port, config.db),
        };
        let mut pool_cfg = PoolConfig::from_url(url);
        pool_cfg.pool = Some(deadpool_redis::PoolConfig {
            max_size: config.max_pool_size,
            timeouts: Timeouts {
                create: Some(config.connect_timeout),
                ..Default::default()
            },
            ..Default::default()
        });
        let pool = pool_cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| crate::error::CoreError::Store(e.to_string()))?;
        Ok(Self { pool })
    }

    pub async fn publish_invoker_host(&self, host_ip: &str, invoker_id: &str) {
        self.hset(INVOKER_ID_HASH, host_ip, invoker_id).await;
    }

    pub async fn publish_pre_loaded_actions(&self, invoker_id: &str, action_names: &[String]) {
        let mut distinct: Vec<&String> = action_names.iter().collect();
        distinct.sort();
        distinct.dedup();
        let joined = distinct
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",");
        self.hset(PRE_LOADED_ACTION_HASH, invoker_id, &joined).await;
    }

    pub async fn publish_busy_pool_size(&self, invoker_id: &str, size: usize) {
        self.hset(BUSY_POOL_SIZE_HASH, invoker_id, &size.to_string())
            .await;
    }

    /// Reads back the host this invoker published under `publish_invoker_host`.
    pub async fn get_invoker_host(&self, invoker_id: &str) -> Option<String> {
        self.hget(INVOKER_ID_HASH, invoker_id).await
    }

    /// Reads back the comma-joined action list an invoker last published
    /// under `publish_pre_loaded_actions`.
    pub async fn get_pre_loaded_actions(&self, invoker_id: &str) -> Option<Vec<String>> {
        let joined = self.hget(PRE_LOADED_ACTION_HASH, invoker_id).await?;
        Some(joined.split(',').filter(|s| !s.is_empty()).map(str::to_string).collect())
    }

    /// Reads back an invoker's last-published busy-pool size.
    pub async fn get_busy_pool_size(&self, invoker_id: &str) -> Option<usize> {
        self.hget(BUSY_POOL_SIZE_HASH, invoker_id).await?.parse().ok()
    }

    async fn hget(&self, hash: &str, field: &str) -> Option<String> {
        let mut conn = match self.pool.get().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, hash, "failed to acquire fleet-state redis connection");
                return None;
            }
        };
        match conn.hget::<_, _, Option<String>>(hash, field).await {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, hash, field, "fleet-state read failed");
                None
            }
        }
    }

    async fn hset(&self, hash: &str, field: &str, value: &str) {
        let mut conn = match self.pool.get().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, hash, "failed to acquire fleet-state redis connection");
                return;
            }
        };
        if let Err(e) = conn.hset::<_, _, _, ()>(hash, field, value).await {
            error!(error = %e, hash, field, "fleet-state publish failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_key_names_match_the_contract() {
        assert_eq!(INVOKER_ID_HASH, "invokerId");
        assert_eq!(PRE_LOADED_ACTION_HASH, "preLoadedAction");
        assert_eq!(BUSY_POOL_SIZE_HASH, "busyPoolSize");
    }
}
