pub mod persistence;
pub mod provider;
pub mod redis_lock;
pub mod stream;
pub mod tx;
