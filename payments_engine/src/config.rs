use std::env;
use std::time::Duration;

use crate::domain::breaker::BreakerConfig;

/// Typed startup configuration, read once in each binary's `main`.
/// Required variables fail fast with a clear message, matching the
/// teacher's `env::var("DATABASE_URL").expect("DATABASE_URL must be set")`
/// idiom rather than deferring to a panic deep inside a handler.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub http_bind_address: String,
    pub worker_consumer_name: String,
    pub lock_ttl: Duration,
    pub breaker: BreakerConfig,
    pub shutdown_grace_period: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            redis_url: env::var("REDIS_URL").expect("REDIS_URL must be set"),
            http_bind_address: env::var("HTTP_BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            worker_consumer_name: env::var("WORKER_CONSUMER_NAME").unwrap_or_else(|_| format!("worker-{}", uuid::Uuid::new_v4())),
            lock_ttl: Duration::from_secs(parse_env_u64("LOCK_TTL_SECONDS", 30)),
            breaker: BreakerConfig::default(),
            shutdown_grace_period: Duration::from_secs(parse_env_u64("SHUTDOWN_GRACE_PERIOD_SECONDS", 30)),
        }
    }
}

fn parse_env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|raw| raw.parse().ok()).unwrap_or(default)
}
