use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result, anyhow};
use chrono_tz::Tz;
use stock::{Ticker, chart};

const DEFAULT_DOMESTIC: &str = "2330,2317,0050";
const DEFAULT_FOREIGN: &str = "AAPL,TSLA,NVDA";

#[derive(Clone)]
pub struct Config {
    pub channel_secret: String,
    pub channel_access_token: String,
    /// scheme + host that LINE servers can reach, no trailing slash
    pub public_base_url: String,
    pub port: u16,
    pub chart_dir: PathBuf,
    pub subscribers_file: PathBuf,
    pub redis_url: Option<String>,
    pub redis_key_prefix: String,
    pub domestic_watchlist: Vec<Ticker>,
    pub foreign_watchlist: Vec<Ticker>,
    pub push_timezone: Tz,
    pub line_api_base: String,
    pub http_timeout: Duration,
    pub version: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            var(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{key} not set"))
        };
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let port = or("PORT", "8000")
            .parse()
            .context("PORT is not a valid port")?;
        let push_timezone = or("PUSH_TIMEZONE", "Asia/Taipei")
            .parse::<Tz>()
            .map_err(|e| anyhow!("PUSH_TIMEZONE: {e}"))?;
        let http_timeout = or("HTTP_TIMEOUT_SECS", "10")
            .parse()
            .map(Duration::from_secs)
            .context("HTTP_TIMEOUT_SECS is not a number")?;

        Ok(Self {
            channel_secret: required("CHANNEL_SECRET")?,
            channel_access_token: required("CHANNEL_ACCESS_TOKEN")?,
            public_base_url: base_url(&required("PUBLIC_HOST")?),
            port,
            chart_dir: or("CHART_DIR", "charts").into(),
            subscribers_file: or("SUBSCRIBERS_FILE", "subscribers.json").into(),
            redis_url: var("REDIS_URL").filter(|v| !v.trim().is_empty()),
            redis_key_prefix: or("REDIS_KEY_PREFIX", "stockbot"),
            domestic_watchlist: watchlist(&or("DOMESTIC_WATCHLIST", DEFAULT_DOMESTIC)),
            foreign_watchlist: watchlist(&or("FOREIGN_WATCHLIST", DEFAULT_FOREIGN)),
            push_timezone,
            line_api_base: or("LINE_API_BASE", "https://api.line.me"),
            http_timeout,
            version: or("APP_VERSION", "Unknown"),
        })
    }

    /// Domestic tickers first, then foreign, in configured order.
    pub fn watchlist(&self) -> Vec<Ticker> {
        self.domestic_watchlist
            .iter()
            .chain(self.foreign_watchlist.iter())
            .cloned()
            .collect()
    }

    pub fn chart_url(&self, symbol: &str) -> String {
        format!("{}/static/{}", self.public_base_url, chart::file_name(symbol))
    }
}

fn base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

fn watchlist(raw: &str) -> Vec<Ticker> {
    raw.split(',').filter_map(Ticker::parse).collect()
}
