use serde::Deserialize;

//
// Match LINE webhook JSON
// https://developers.line.biz/en/reference/messaging-api/#webhook-event-objects
//
#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub destination: Option<String>,

    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    Message {
        #[serde(rename = "replyToken")]
        reply_token: ReplyToken,
        source: Source,
        message: MessageContent,
    },
    Follow {
        #[serde(rename = "replyToken")]
        reply_token: ReplyToken,
        source: Source,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessageContent {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub user_id: Option<String>,
}

/// Single-use token for answering one event. Deliberately not `Clone`:
/// sending a reply consumes it.
#[derive(Debug, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ReplyToken(String);

impl ReplyToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
