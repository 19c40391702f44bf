use anyhow::Result;
use futures_util::{StreamExt, stream};
use stock::Ticker;
use tracing::{debug, info, instrument, warn};
use tracing_futures::Instrument;

use crate::AppContext;
use crate::command::quote_text;
use crate::line::Message;

const QUOTE_CONCURRENCY: usize = 4;
const CHART_CONCURRENCY: usize = 2;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PushSummary {
    pub subscribers: usize,
    pub charts: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Push the watchlist digest and charts to every subscriber.
///
/// Each push is its own failure boundary: a rejected message is logged and
/// delivery carries on with the next message and the next subscriber.
#[instrument(name = "run_push", skip(ctx))]
pub async fn run_push(ctx: &AppContext) -> Result<PushSummary> {
    let subscribers = ctx.subscribers.list().await?;
    info!(total_subscribers = subscribers.len(), "loaded subscribers");

    if subscribers.is_empty() {
        info!("no subscribers, nothing to push");
        return Ok(PushSummary::default());
    }

    let watchlist = ctx.config.watchlist();
    let digest = build_digest(ctx, &watchlist).await;
    let charts = build_charts(ctx, &watchlist).await;
    info!(tickers = watchlist.len(), charts = charts.len(), "push content ready");

    let mut summary = PushSummary {
        subscribers: subscribers.len(),
        charts: charts.len(),
        ..Default::default()
    };

    for user_id in &subscribers {
        let messages = std::iter::once(Message::text(digest.clone())).chain(charts.iter().cloned());

        for message in messages {
            match ctx.messenger.push(user_id, vec![message]).await {
                Ok(()) => summary.delivered += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(user_id = %user_id, error = ?e, "push failed");
                }
            }
        }
        debug!(user_id = %user_id, "subscriber done");
    }

    info!(
        subscribers = summary.subscribers,
        delivered = summary.delivered,
        failed = summary.failed,
        "completed push"
    );

    Ok(summary)
}

/// Quotes in watchlist order joined by blank lines.
pub async fn build_digest(ctx: &AppContext, watchlist: &[Ticker]) -> String {
    let market = ctx.market.as_ref();

    let parts: Vec<String> = stream::iter(watchlist)
        .map(|ticker| quote_text(market, ticker))
        .boxed()
        .buffered(QUOTE_CONCURRENCY)
        .collect()
        .await;

    parts.join("\n\n")
}

/// One image message per ticker whose chart could be produced, in watchlist order.
async fn build_charts(ctx: &AppContext, watchlist: &[Ticker]) -> Vec<Message> {
    let results: Vec<Option<Message>> = stream::iter(watchlist)
        .map(|ticker| {
            let span = tracing::info_span!("push_chart", symbol = %ticker);

            async move {
                match ctx.charts.generate(ctx.market.as_ref(), ticker).await {
                    Ok(_) => Some(Message::image(ctx.config.chart_url(ticker.symbol()))),
                    Err(e) => {
                        warn!(error = %e, "chart skipped");
                        None
                    }
                }
            }
            .instrument(span)
        })
        .boxed()
        .buffered(CHART_CONCURRENCY)
        .collect()
        .await;

    results.into_iter().flatten().collect()
}
