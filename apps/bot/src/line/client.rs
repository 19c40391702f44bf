use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::Serialize;
use tracing::debug;

use super::{Message, ReplyToken};

/// Outbound side of the messaging platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Answer one event; the token is spent whether or not this succeeds.
    async fn reply(&self, token: ReplyToken, messages: Vec<Message>) -> Result<()>;

    async fn push(&self, to: &str, messages: Vec<Message>) -> Result<()>;
}

#[derive(Clone)]
pub struct LineClient {
    client: Client,
    base_api: String,
}

impl LineClient {
    pub fn new(base_api: String, access_token: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .context("channel access token is not a valid header value")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base_api })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_api.trim_end_matches('/'), path)
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<()> {
        let res = self.client.post(self.url(path)).json(body).send().await?;

        let status = res.status();
        if !status.is_success() {
            let detail = res.text().await.unwrap_or_default();
            anyhow::bail!("{path} returned {status}: {detail}");
        }

        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: &'a [Message],
}

#[derive(Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: &'a [Message],
}

#[async_trait]
impl Messenger for LineClient {
    async fn reply(&self, token: ReplyToken, messages: Vec<Message>) -> Result<()> {
        debug!(count = messages.len(), "reply");
        self.post(
            "/v2/bot/message/reply",
            &ReplyRequest {
                reply_token: token.as_str(),
                messages: &messages,
            },
        )
        .await
    }

    async fn push(&self, to: &str, messages: Vec<Message>) -> Result<()> {
        debug!(to, count = messages.len(), "push");
        self.post(
            "/v2/bot/message/push",
            &PushRequest {
                to,
                messages: &messages,
            },
        )
        .await
    }
}
