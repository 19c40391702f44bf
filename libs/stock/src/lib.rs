mod error;
mod quote;
mod ticker;

pub mod chart;
pub mod price_client;
pub mod subscriber_store;

pub use chart::ChartRenderer;
pub use error::{ChartError, LookupError};
pub use price_client::{MarketData, PriceClient};
pub use quote::{PricePoint, Quote};
pub use subscriber_store::{JsonFileStore, RedisStore, SubscriberStore};
pub use ticker::{Market, Ticker};
