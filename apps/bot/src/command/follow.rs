use tracing::{debug, error, info, warn};

use crate::AppContext;
use crate::line::Message;

pub const WELCOME: &str = "感謝加入！\n\
輸入台股代號（例如 2330）或美股代號（例如 TSLA）查詢即時股價。\n\
輸入「2330 走勢圖」或「TSLA chart」查看近30日走勢圖。\n\
每天 11:00 與 17:30 會推播市場摘要與走勢圖。\n\
輸入「我的ID」查看你的使用者 ID。";

/// Subscribe the new follower (idempotent) and greet them.
pub async fn on_follow(ctx: &AppContext, user_id: Option<&str>) -> Message {
    match user_id {
        Some(id) => match ctx.subscribers.add(id).await {
            Ok(true) => info!(user_id = id, "subscriber added"),
            Ok(false) => debug!(user_id = id, "subscriber already known"),
            Err(e) => error!(user_id = id, error = ?e, "subscriber store add failed"),
        },
        None => warn!("follow event without user id"),
    }

    Message::text(WELCOME)
}
