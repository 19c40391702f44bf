mod chart;
mod follow;
mod quote;

use stock::Ticker;
use tracing::{debug, info};

use crate::line::{Event, Message, MessageContent};
use crate::{AppContext, Error};

pub use chart::chart_reply;
pub use follow::{WELCOME, on_follow};
pub use quote::{failure_text, quote_text};

/// Exact (normalized) phrases that ask for the caller's own id
const ID_PHRASES: [&str; 3] = ["MY ID", "MYID", "我的ID"];

/// Substrings that turn a message into a chart request. Longer forms first so
/// stripping `走勢圖` does not leave a stray `圖`.
const CHART_KEYWORDS: [&str; 6] = ["走勢圖", "CHART", "TREND", "走勢", "趨勢", "圖表"];

pub const USAGE: &str = "請輸入股票代號查詢，例如：2330 或 TSLA\n查看走勢圖請輸入：2330 走勢圖 或 TSLA chart";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    WhoAmI,
    Chart(Option<Ticker>),
    Quote(Option<Ticker>),
}

impl Command {
    pub fn parse(text: &str) -> Self {
        let normalized = text.trim().to_uppercase();

        if ID_PHRASES.contains(&normalized.as_str()) {
            return Command::WhoAmI;
        }

        if CHART_KEYWORDS.iter().any(|k| normalized.contains(*k)) {
            let stripped = CHART_KEYWORDS
                .iter()
                .fold(normalized, |acc, k| acc.replace(*k, ""));
            let symbol: String = stripped
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            return Command::Chart(Ticker::parse(&symbol));
        }

        Command::Quote(Ticker::parse(&normalized))
    }
}

/// Route one webhook event and send its reply with the event's token.
pub async fn dispatch(ctx: &AppContext, event: Event) -> Result<(), Error> {
    match event {
        Event::Message {
            reply_token,
            source,
            message: MessageContent::Text { text },
        } => {
            let reply = on_text(ctx, source.user_id.as_deref(), &text).await;
            ctx.messenger.reply(reply_token, vec![reply]).await
        }
        Event::Message { source, .. } => {
            debug!(source = %source.kind, "ignoring non-text message");
            Ok(())
        }
        Event::Follow {
            reply_token,
            source,
        } => {
            let reply = on_follow(ctx, source.user_id.as_deref()).await;
            ctx.messenger.reply(reply_token, vec![reply]).await
        }
        Event::Unsupported => {
            debug!("ignoring unsupported event");
            Ok(())
        }
    }
}

pub async fn on_text(ctx: &AppContext, user_id: Option<&str>, text: &str) -> Message {
    let command = Command::parse(text);
    info!(user_id = user_id.unwrap_or("-"), ?command, "text command");

    match command {
        Command::WhoAmI => Message::text(user_id.unwrap_or("無法取得使用者 ID")),
        Command::Chart(Some(ticker)) => chart_reply(ctx, &ticker).await,
        Command::Quote(Some(ticker)) => Message::text(quote_text(ctx.market.as_ref(), &ticker).await),
        Command::Chart(None) | Command::Quote(None) => Message::text(USAGE),
    }
}
