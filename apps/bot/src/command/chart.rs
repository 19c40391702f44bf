use stock::Ticker;
use tracing::{info, warn};

use crate::AppContext;
use crate::line::Message;

pub async fn chart_reply(ctx: &AppContext, ticker: &Ticker) -> Message {
    match ctx.charts.generate(ctx.market.as_ref(), ticker).await {
        Ok(path) => {
            let url = ctx.config.chart_url(ticker.symbol());
            info!(symbol = %ticker, path = %path.display(), %url, "chart ready");
            Message::image(url)
        }
        Err(e) => {
            warn!(symbol = %ticker, error = %e, "chart generation failed");
            Message::text(format!("{ticker} 走勢圖產生失敗"))
        }
    }
}
