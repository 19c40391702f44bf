use chrono::DateTime;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::warn;

use crate::error::LookupError;
use crate::quote::{PricePoint, Quote};

const CHART_API: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance v8 chart API, used for both quotes and daily history.
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
}

impl YahooClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn quote(&self, symbol: &str) -> Result<Quote, LookupError> {
        let result = self.chart(symbol, "1d").await?;

        Ok(Quote::Foreign {
            symbol: symbol.to_string(),
            price: result.meta.regular_market_price,
            volume: result.meta.regular_market_volume,
        })
    }

    pub async fn history(&self, symbol: &str, points: usize) -> Result<Vec<PricePoint>, LookupError> {
        let result = self.chart(symbol, "1mo").await?;
        Ok(closes(&result, points))
    }

    async fn chart(&self, symbol: &str, range: &str) -> Result<ChartResult, LookupError> {
        let mut url = Url::parse(CHART_API).map_err(|e| LookupError::Malformed(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| LookupError::Malformed("chart api is not a base url".into()))?
            .push(symbol);

        // unknown symbols come back as 404 with an error body, so no error_for_status here
        let res: ChartResponse = self
            .client
            .get(url)
            .query(&[("range", range), ("interval", "1d")])
            .send()
            .await?
            .json()
            .await?;

        first_result(symbol, res)
    }
}

//
// Match Yahoo v8 chart JSON
//
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,

    #[serde(default)]
    error: Option<ChartFault>,
}

#[derive(Debug, Deserialize)]
struct ChartFault {
    #[serde(default)]
    code: String,

    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,

    #[serde(default)]
    timestamp: Vec<i64>,

    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    regular_market_price: Option<f64>,

    #[serde(default)]
    regular_market_volume: Option<u64>,

    /// seconds east of UTC for the exchange
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn first_result(symbol: &str, res: ChartResponse) -> Result<ChartResult, LookupError> {
    if let Some(fault) = res.chart.error {
        warn!(symbol, code = %fault.code, description = %fault.description, "chart lookup rejected");
        return Err(LookupError::NotFound(symbol.to_string()));
    }

    res.chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| LookupError::NotFound(symbol.to_string()))
}

fn closes(result: &ChartResult, points: usize) -> Vec<PricePoint> {
    let Some(series) = result.indicators.quote.first() else {
        return Vec::new();
    };

    let mut all: Vec<PricePoint> = result
        .timestamp
        .iter()
        .zip(series.close.iter())
        .filter_map(|(&ts, close)| {
            let close = (*close)?;
            let date = DateTime::from_timestamp(ts + result.meta.gmtoffset, 0)?.date_naive();
            Some(PricePoint { date, close })
        })
        .collect();

    let skip = all.len().saturating_sub(points);
    all.split_off(skip)
}
