use async_trait::async_trait;
use std::time::Duration;

use super::error::DomainError;

/// A held lock. Only the process holding the matching `owner_token` may
/// release it (spec.md §3, §5).
#[derive(Debug, Clone)]
pub struct LockHandle {
    pub name: String,
    pub owner_token: String,
}

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait DistributedLock: Send + Sync {
    /// `SET name owner_token NX PX ttl` semantics: returns `None` if
    /// another owner already holds the lock.
    async fn try_acquire(&self, name: &str, ttl: Duration) -> Result<Option<LockHandle>, DomainError>;
    /// Releases only if `owner_token` still matches the stored value.
    /// Returns `false` if the lock had already expired or been stolen.
    async fn release(&self, handle: &LockHandle) -> Result<bool, DomainError>;
}
