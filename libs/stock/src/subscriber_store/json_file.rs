use std::path::PathBuf;

use anyhow::{Context, Error};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::SubscriberStore;

/// Subscribers kept as a JSON array of ids in a single file.
///
/// Writers are serialized through a mutex and the file is replaced with
/// write-temp-then-rename, so readers only ever see a complete array.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn read(&self) -> Result<Vec<String>, Error> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::new(e).context(format!("read {}", self.path.display())));
            }
        };

        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&raw).with_context(|| format!("parse {}", self.path.display()))
    }

    async fn write(&self, ids: &[String]) -> Result<(), Error> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let body = serde_json::to_vec_pretty(ids)?;
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replace {}", self.path.display()))?;

        Ok(())
    }
}

#[async_trait]
impl SubscriberStore for JsonFileStore {
    async fn add(&self, user_id: &str) -> Result<bool, Error> {
        let _guard = self.lock.lock().await;

        let mut ids = self.read().await?;
        if ids.iter().any(|id| id == user_id) {
            debug!(user_id, "already subscribed");
            return Ok(false);
        }

        ids.push(user_id.to_string());
        self.write(&ids).await?;

        Ok(true)
    }

    async fn list(&self) -> Result<Vec<String>, Error> {
        let _guard = self.lock.lock().await;
        self.read().await
    }
}
