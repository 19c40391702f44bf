use std::fmt;

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub enum Quote {
    Domestic {
        code: String,
        name: String,
        /// None while no trade has printed yet
        price: Option<f64>,
        /// accumulated volume in lots (張)
        volume: u64,
    },
    Foreign {
        symbol: String,
        price: Option<f64>,
        volume: Option<u64>,
    },
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quote::Domestic {
                code,
                name,
                price,
                volume,
            } => {
                let price = price.map_or_else(|| "-".to_string(), |p| p.to_string());
                write!(f, "{code} {name}\n現價：{price} 元\n成交量：{volume} 張")
            }
            Quote::Foreign {
                symbol,
                price,
                volume,
            } => {
                let price = price.map_or_else(|| "N/A".to_string(), |p| p.to_string());
                let volume = volume.map_or_else(|| "N/A".to_string(), |v| v.to_string());
                write!(f, "{symbol}\nPrice: ${price}\nVolume: {volume}")
            }
        }
    }
}

/// One daily close
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}
