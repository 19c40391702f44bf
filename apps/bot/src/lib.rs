use std::sync::Arc;

use stock::{ChartRenderer, MarketData, SubscriberStore};

pub mod command;
pub mod config;
pub mod daily;
pub mod line;
pub mod server;

use config::Config;
use line::Messenger;

/// Everything a handler or job needs, built once in `main` and shared.
pub struct AppContext {
    pub config: Config,
    pub market: Arc<dyn MarketData>,
    pub charts: ChartRenderer,
    pub subscribers: Arc<dyn SubscriberStore>,
    pub messenger: Arc<dyn Messenger>,
}

pub type Error = anyhow::Error;

#[cfg(test)]
pub(crate) mod testing;
