use serde::Serialize;

/// Outbound message object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        original_content_url: String,
        preview_image_url: String,
    },
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Message::Text { text: text.into() }
    }

    /// The same URL doubles as the preview.
    pub fn image(url: impl Into<String>) -> Self {
        let url = url.into();
        Message::Image {
            original_content_url: url.clone(),
            preview_image_url: url,
        }
    }
}
