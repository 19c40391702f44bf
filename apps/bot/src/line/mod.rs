mod client;
mod event;
mod message;

pub mod signature;

pub use client::{LineClient, Messenger};
pub use event::{Event, MessageContent, ReplyToken, Source, WebhookBody};
pub use message::Message;
