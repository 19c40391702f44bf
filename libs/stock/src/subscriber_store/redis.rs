use std::time::Duration;

use anyhow::Error;
use async_trait::async_trait;
use fred::prelude::*;
use tracing::error;

use super::SubscriberStore;

/// Subscribers kept in a Redis set, for deployments without a persistent disk.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    key_prefix: String,
}

impl RedisStore {
    pub async fn new(redis_url: &str, key: impl Into<String>) -> Result<Self, Error> {
        let config = Config::from_url(redis_url)?;

        let client = Builder::from_config(config)
            .with_connection_config(|config| {
                config.connection_timeout = Duration::from_secs(5);
                config.tcp = TcpConfig {
                    nodelay: Some(true),
                    ..Default::default()
                };
            })
            .build()?;

        client.on_error(|(error, server)| async move {
            error!(?server, ?error, "redis connection error");
            Ok(())
        });

        client.connect();
        client.wait_for_connect().await?;

        Ok(Self {
            client,
            key_prefix: key.into(),
        })
    }

    fn subscribers_key(&self) -> String {
        subscribers_key(&self.key_prefix)
    }
}

fn subscribers_key(prefix: &str) -> String {
    format!("{prefix}:subscribers")
}

/// `SADD` replies with how many members were new; zero means already present.
fn newly_added(sadd_reply: i64) -> bool {
    sadd_reply > 0
}

#[async_trait]
impl SubscriberStore for RedisStore {
    async fn add(&self, user_id: &str) -> Result<bool, Error> {
        let reply: i64 = self.client.sadd(self.subscribers_key(), user_id).await?;
        Ok(newly_added(reply))
    }

    async fn list(&self) -> Result<Vec<String>, Error> {
        self.client
            .smembers(self.subscribers_key())
            .await
            .map_err(Error::from)
    }
}
