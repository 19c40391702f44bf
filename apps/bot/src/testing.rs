//! In-memory fakes shared by the handler, server and push job tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::NaiveDate;
use stock::{
    ChartError, ChartRenderer, LookupError, MarketData, PricePoint, Quote, SubscriberStore, Ticker,
};
use tempfile::TempDir;

use crate::AppContext;
use crate::config::tests::config_with;
use crate::line::{Message, Messenger, ReplyToken};

#[derive(Default)]
pub struct FakeMarket {
    pub quotes: HashMap<String, Quote>,
    /// symbols whose lookups fail with a transport-style error
    pub broken: HashSet<String>,
    pub history: HashMap<String, Vec<PricePoint>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeMarket {
    pub fn with_quote(mut self, quote: Quote) -> Self {
        let symbol = match &quote {
            Quote::Domestic { code, .. } => code.clone(),
            Quote::Foreign { symbol, .. } => symbol.clone(),
        };
        self.quotes.insert(symbol, quote);
        self
    }

    pub fn with_history(mut self, symbol: &str, closes: &[f64]) -> Self {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: NaiveDate::from_ymd_opt(2026, 9, 1 + i as u32).unwrap(),
                close,
            })
            .collect();
        self.history.insert(symbol.to_string(), points);
        self
    }

    pub fn with_broken(mut self, symbol: &str) -> Self {
        self.broken.insert(symbol.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketData for FakeMarket {
    async fn quote(&self, ticker: &Ticker) -> Result<Quote, LookupError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("quote:{}", ticker.symbol()));

        if self.broken.contains(ticker.symbol()) {
            return Err(LookupError::Malformed("boom".into()));
        }
        self.quotes
            .get(ticker.symbol())
            .cloned()
            .ok_or_else(|| LookupError::NotFound(ticker.symbol().to_string()))
    }

    async fn history(&self, ticker: &Ticker) -> Result<Vec<PricePoint>, LookupError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("history:{}", ticker.symbol()));

        if self.broken.contains(ticker.symbol()) {
            return Err(LookupError::Malformed("boom".into()));
        }
        Ok(self.history.get(ticker.symbol()).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub ids: Mutex<Vec<String>>,
}

#[async_trait]
impl SubscriberStore for MemoryStore {
    async fn add(&self, user_id: &str) -> Result<bool> {
        let mut ids = self.ids.lock().unwrap();
        if ids.iter().any(|id| id == user_id) {
            return Ok(false);
        }
        ids.push(user_id.to_string());
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.ids.lock().unwrap().clone())
    }
}

type PushFilter = Box<dyn Fn(&str, &Message) -> bool + Send + Sync>;

#[derive(Default)]
pub struct RecordingMessenger {
    pub replies: Mutex<Vec<(String, Vec<Message>)>>,
    /// every attempted push, including the ones made to fail
    pub pushes: Mutex<Vec<(String, Vec<Message>)>>,
    fail_push: Option<PushFilter>,
}

impl RecordingMessenger {
    pub fn failing(filter: impl Fn(&str, &Message) -> bool + Send + Sync + 'static) -> Self {
        Self {
            fail_push: Some(Box::new(filter)),
            ..Default::default()
        }
    }

    pub fn replies(&self) -> Vec<(String, Vec<Message>)> {
        self.replies.lock().unwrap().clone()
    }

    pub fn pushes(&self) -> Vec<(String, Vec<Message>)> {
        self.pushes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn reply(&self, token: ReplyToken, messages: Vec<Message>) -> Result<()> {
        self.replies
            .lock()
            .unwrap()
            .push((token.as_str().to_string(), messages));
        Ok(())
    }

    async fn push(&self, to: &str, messages: Vec<Message>) -> Result<()> {
        self.pushes
            .lock()
            .unwrap()
            .push((to.to_string(), messages.clone()));

        if let Some(filter) = &self.fail_push
            && messages.iter().any(|m| filter(to, m))
        {
            bail!("push to {to} rejected");
        }
        Ok(())
    }
}

pub fn fake_png(_: &str, points: &[PricePoint]) -> Result<Vec<u8>, ChartError> {
    Ok(vec![0x89, b'P', b'N', b'G', points.len() as u8])
}

pub struct Harness {
    pub ctx: AppContext,
    pub market: Arc<FakeMarket>,
    pub store: Arc<MemoryStore>,
    pub messenger: Arc<RecordingMessenger>,
    pub dir: TempDir,
}

impl Harness {
    pub fn new(market: FakeMarket) -> Self {
        Self::with_messenger(market, RecordingMessenger::default())
    }

    pub fn with_messenger(market: FakeMarket, messenger: RecordingMessenger) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let market = Arc::new(market);
        let store = Arc::new(MemoryStore::default());
        let messenger = Arc::new(messenger);

        let ctx = AppContext {
            config: config_with(&[
                ("PUBLIC_HOST", "bot.example.com"),
                ("DOMESTIC_WATCHLIST", "2330,0050"),
                ("FOREIGN_WATCHLIST", "TSLA"),
            ]),
            market: market.clone(),
            charts: ChartRenderer::with_renderer(dir.path().join("charts"), fake_png),
            subscribers: store.clone(),
            messenger: messenger.clone(),
        };

        Self {
            ctx,
            market,
            store,
            messenger,
            dir,
        }
    }
}

pub fn tsmc() -> Quote {
    Quote::Domestic {
        code: "2330".into(),
        name: "台積電".into(),
        price: Some(1025.0),
        volume: 23456,
    }
}

pub fn tesla() -> Quote {
    Quote::Foreign {
        symbol: "TSLA".into(),
        price: Some(251.44),
        volume: Some(98123456),
    }
}
