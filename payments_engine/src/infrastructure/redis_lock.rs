use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::lock::{DistributedLock, LockHandle};

/// `SET key token NX PX ttl` / a compare-and-del Lua script for release
/// (spec.md §3, §5) — the classic single-instance Redis mutex. Good enough
/// for one Redis primary; a Redlock-style quorum would be the next step if
/// this ever needs to survive a Redis failover mid-lock.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

pub struct RedisDistributedLock {
    client: redis::Client,
}

impl RedisDistributedLock {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    fn lock_key(name: &str) -> String {
        format!("payments_engine:lock:{name}")
    }
}

#[async_trait]
impl DistributedLock for RedisDistributedLock {
    async fn try_acquire(&self, name: &str, ttl: Duration) -> Result<Option<LockHandle>, DomainError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| DomainError::Internal(format!("redis connection error: {e}")))?;

        let owner_token = Uuid::new_v4().to_string();
        let key = Self::lock_key(name);

        let acquired: bool = conn
            .set_options(
                &key,
                owner_token.clone(),
                redis::SetOptions::default()
                    .conditional_set(redis::ExistenceCheck::NX)
                    .with_expiration(redis::SetExpiry::PX(ttl.as_millis() as usize)),
            )
            .await
            .map_err(|e| DomainError::Internal(format!("redis SET NX error: {e}")))?;

        if !acquired {
            return Ok(None);
        }

        Ok(Some(LockHandle {
            name: name.to_string(),
            owner_token,
        }))
    }

    async fn release(&self, handle: &LockHandle) -> Result<bool, DomainError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| DomainError::Internal(format!("redis connection error: {e}")))?;

        let key = Self::lock_key(&handle.name);
        let deleted: i32 = redis::Script::new(RELEASE_SCRIPT)
            .key(&key)
            .arg(&handle.owner_token)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| DomainError::Internal(format!("redis release script error: {e}")))?;

        Ok(deleted == 1)
    }
}
