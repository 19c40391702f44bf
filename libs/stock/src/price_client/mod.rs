mod twse;
mod yahoo;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Asia::Taipei;
use reqwest::Client;
use tracing::debug;

use crate::error::LookupError;
use crate::quote::{PricePoint, Quote};
use crate::ticker::{Market, Ticker};

pub use twse::TwseClient;
pub use yahoo::YahooClient;

/// Number of daily closes kept for a trend chart
pub const HISTORY_POINTS: usize = 30;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; stockbot/0.1)";

/// Source of quotes and daily closes.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn quote(&self, ticker: &Ticker) -> Result<Quote, LookupError>;

    /// Up to [`HISTORY_POINTS`] daily closes, oldest first.
    async fn history(&self, ticker: &Ticker) -> Result<Vec<PricePoint>, LookupError>;
}

/// Routes domestic tickers to TWSE/TPEX and foreign ones to Yahoo Finance.
#[derive(Clone)]
pub struct PriceClient {
    twse: TwseClient,
    yahoo: YahooClient,
}

impl PriceClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            twse: TwseClient::new(client.clone()),
            yahoo: YahooClient::new(client),
        })
    }
}

#[async_trait]
impl MarketData for PriceClient {
    async fn quote(&self, ticker: &Ticker) -> Result<Quote, LookupError> {
        debug!(symbol = %ticker, market = ?ticker.market(), "quote");
        match ticker.market() {
            Market::Domestic => self.twse.realtime(ticker.symbol()).await,
            Market::Foreign => self.yahoo.quote(ticker.symbol()).await,
        }
    }

    async fn history(&self, ticker: &Ticker) -> Result<Vec<PricePoint>, LookupError> {
        debug!(symbol = %ticker, market = ?ticker.market(), "history");
        match ticker.market() {
            Market::Domestic => {
                let today = Utc::now().with_timezone(&Taipei).date_naive();
                self.twse
                    .history(ticker.symbol(), today, HISTORY_POINTS)
                    .await
            }
            Market::Foreign => self.yahoo.history(ticker.symbol(), HISTORY_POINTS).await,
        }
    }
}
