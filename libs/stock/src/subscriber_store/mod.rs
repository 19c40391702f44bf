mod json_file;
mod redis;

use anyhow::Error;
use async_trait::async_trait;

pub use json_file::JsonFileStore;
pub use redis::RedisStore;

/// Set of platform user ids that receive scheduled pushes.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Add a subscriber
    /// Returns true if it was newly added
    async fn add(&self, user_id: &str) -> Result<bool, Error>;

    /// Get all subscribers
    async fn list(&self) -> Result<Vec<String>, Error>;
}
