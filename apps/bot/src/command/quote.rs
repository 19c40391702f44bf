use stock::{LookupError, MarketData, Ticker};
use tracing::warn;

/// Formatted quote, or a one-line failure notice naming the ticker.
pub async fn quote_text(market: &dyn MarketData, ticker: &Ticker) -> String {
    match market.quote(ticker).await {
        Ok(quote) => quote.to_string(),
        Err(e) => {
            warn!(symbol = %ticker, error = %e, "quote lookup failed");
            failure_text(ticker, &e)
        }
    }
}

pub fn failure_text(ticker: &Ticker, err: &LookupError) -> String {
    if err.is_not_found() {
        format!("{ticker} 資料讀取失敗")
    } else {
        format!("{ticker} 查詢錯誤")
    }
}
