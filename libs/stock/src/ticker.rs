use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Market {
    /// Taiwan listed, all-digit codes (e.g. `2330`)
    Domestic,
    /// US listed, anything else (e.g. `TSLA`)
    Foreign,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticker {
    symbol: String,
    market: Market,
}

impl Ticker {
    /// Normalize raw user input into a ticker.
    /// Returns None when nothing is left after trimming.
    pub fn parse(raw: &str) -> Option<Self> {
        let symbol = raw.trim().to_uppercase();
        if symbol.is_empty() {
            return None;
        }

        let market = if symbol.chars().all(|c| c.is_ascii_digit()) {
            Market::Domestic
        } else {
            Market::Foreign
        };

        Some(Self { symbol, market })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn market(&self) -> Market {
        self.market
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}
