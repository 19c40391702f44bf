use async_trait::async_trait;
use chrono::{Datelike, Months, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::LookupError;
use crate::quote::{PricePoint, Quote};

const REALTIME_API: &str = "https://mis.twse.com.tw/stock/api/getStockInfo.jsp";
const STOCK_DAY_API: &str = "https://www.twse.com.tw/exchangeReport/STOCK_DAY";
const TPEX_DAY_API: &str = "https://www.tpex.org.tw/www/zh-tw/afterTrading/tradingStock";

/// History never reaches further back than this many monthly reports.
const MAX_MONTHS: usize = 12;
/// Give up early on codes that have no reports at all.
const MAX_EMPTY_MONTHS: usize = 2;

/// Taiwan exchange client (TWSE listed, TPEX as OTC fallback).
#[derive(Clone)]
pub struct TwseClient {
    client: Client,
}

impl TwseClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn realtime(&self, code: &str) -> Result<Quote, LookupError> {
        let channels = format!("tse_{code}.tw|otc_{code}.tw");

        let res: RealtimeResponse = self
            .client
            .get(REALTIME_API)
            .query(&[("ex_ch", channels.as_str()), ("json", "1"), ("delay", "0")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_realtime(code, res)
    }

    /// Up to `points` daily closes ending at `today`, oldest first.
    pub async fn history(
        &self,
        code: &str,
        today: NaiveDate,
        points: usize,
    ) -> Result<Vec<PricePoint>, LookupError> {
        walk_months(self, code, today, points).await
    }

    async fn twse_month(
        &self,
        code: &str,
        start: NaiveDate,
    ) -> Result<Vec<PricePoint>, LookupError> {
        let date = start.format("%Y%m%d").to_string();

        let res: StockDayResponse = self
            .client
            .get(STOCK_DAY_API)
            .query(&[
                ("response", "json"),
                ("date", date.as_str()),
                ("stockNo", code),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if res.stat != "OK" {
            return Err(LookupError::NotFound(code.to_string()));
        }

        Ok(parse_rows(&res.data))
    }

    async fn tpex_month(
        &self,
        code: &str,
        start: NaiveDate,
    ) -> Result<Vec<PricePoint>, LookupError> {
        let date = start.format("%Y/%m/%d").to_string();

        let res: TpexResponse = self
            .client
            .get(TPEX_DAY_API)
            .query(&[("code", code), ("date", date.as_str()), ("response", "json")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(res
            .tables
            .first()
            .map(|t| parse_rows(&t.data))
            .unwrap_or_default())
    }
}

#[async_trait]
impl MonthlyReports for TwseClient {
    async fn listed(
        &self,
        code: &str,
        start: NaiveDate,
    ) -> Result<Vec<PricePoint>, LookupError> {
        self.twse_month(code, start).await
    }

    async fn otc(
        &self,
        code: &str,
        start: NaiveDate,
    ) -> Result<Vec<PricePoint>, LookupError> {
        self.tpex_month(code, start).await
    }
}

/// One month of daily closes from either exchange.
#[async_trait]
trait MonthlyReports: Sync {
    /// TWSE report; `NotFound` when the exchange has no such code.
    async fn listed(
        &self,
        code: &str,
        start: NaiveDate,
    ) -> Result<Vec<PricePoint>, LookupError>;

    /// TPEX report; empty when there is nothing for the month.
    async fn otc(
        &self,
        code: &str,
        start: NaiveDate,
    ) -> Result<Vec<PricePoint>, LookupError>;

    async fn month(
        &self,
        code: &str,
        start: NaiveDate,
    ) -> Result<Vec<PricePoint>, LookupError> {
        match self.listed(code, start).await {
            Err(LookupError::NotFound(_)) => self.otc(code, start).await,
            other => other,
        }
    }
}

/// Walk monthly reports backwards from `today` until `points` closes are
/// collected, then keep the last `points` of them.
async fn walk_months<R: MonthlyReports + ?Sized>(
    reports: &R,
    code: &str,
    today: NaiveDate,
    points: usize,
) -> Result<Vec<PricePoint>, LookupError> {
    let mut months: Vec<Vec<PricePoint>> = Vec::new();
    let mut collected = 0usize;
    let mut empty_run = 0usize;
    let mut cursor = month_start(today);

    for _ in 0..MAX_MONTHS {
        let rows = reports.month(code, cursor).await?;
        debug!(code, month = %cursor.format("%Y-%m"), rows = rows.len(), "monthly report");

        if rows.is_empty() {
            empty_run += 1;
            if collected == 0 && empty_run >= MAX_EMPTY_MONTHS {
                break;
            }
        } else {
            empty_run = 0;
        }

        collected += rows.len();
        months.push(rows);

        if collected >= points {
            break;
        }

        match cursor.checked_sub_months(Months::new(1)) {
            Some(prev) => cursor = prev,
            None => break,
        }
    }

    Ok(last_points(months, points))
}

//
// TWSE MIS realtime JSON
//
#[derive(Debug, Deserialize)]
struct RealtimeResponse {
    #[serde(default)]
    rtcode: String,

    #[serde(rename = "msgArray", default)]
    msg_array: Vec<RealtimeEntry>,
}

#[derive(Debug, Deserialize)]
struct RealtimeEntry {
    #[serde(rename = "c")]
    code: String,

    #[serde(rename = "n", default)]
    name: String,

    /// latest trade price, "-" when nothing traded in the last interval
    #[serde(rename = "z", default)]
    latest: Option<String>,

    /// accumulated volume in lots
    #[serde(rename = "v", default)]
    volume: Option<String>,
}

fn parse_realtime(code: &str, res: RealtimeResponse) -> Result<Quote, LookupError> {
    if res.rtcode != "0000" {
        warn!(code, rtcode = %res.rtcode, "realtime lookup rejected");
        return Err(LookupError::NotFound(code.to_string()));
    }

    let entry = res
        .msg_array
        .into_iter()
        .find(|e| e.code == code)
        .ok_or_else(|| LookupError::NotFound(code.to_string()))?;

    let volume = match entry.volume.as_deref().and_then(parse_number) {
        Some(v) => v as u64,
        None => 0,
    };

    Ok(Quote::Domestic {
        code: entry.code,
        name: entry.name,
        price: entry.latest.as_deref().and_then(parse_number),
        volume,
    })
}

//
// Monthly daily-trading reports. Both exchanges use rows of strings with the
// ROC date first and the close at index 6.
//
#[derive(Debug, Deserialize)]
struct StockDayResponse {
    stat: String,

    #[serde(default)]
    data: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TpexResponse {
    #[serde(default)]
    tables: Vec<TpexTable>,
}

#[derive(Debug, Deserialize)]
struct TpexTable {
    #[serde(default)]
    data: Vec<Vec<String>>,
}

const CLOSE_COLUMN: usize = 6;

fn parse_rows(rows: &[Vec<String>]) -> Vec<PricePoint> {
    rows.iter()
        .filter_map(|row| {
            let date = parse_roc_date(row.first()?)?;
            let close = parse_number(row.get(CLOSE_COLUMN)?)?;
            Some(PricePoint { date, close })
        })
        .collect()
}

fn last_points(months: Vec<Vec<PricePoint>>, points: usize) -> Vec<PricePoint> {
    // months were collected newest first
    let mut all: Vec<PricePoint> = months.into_iter().rev().flatten().collect();
    let skip = all.len().saturating_sub(points);
    all.split_off(skip)
}

fn month_start(day: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(day.year(), day.month(), 1).unwrap_or(day)
}

/// `115/10/01` -> 2026-10-01. TPEX sometimes suffixes markers like `*`.
fn parse_roc_date(raw: &str) -> Option<NaiveDate> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '/')
        .collect();
    let mut parts = cleaned.split('/');

    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;

    NaiveDate::from_ymd_opt(year + 1911, month, day)
}

/// `1,025.00` -> 1025.0; `--` and `-` -> None
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    enum Report {
        Rows(Vec<PricePoint>),
        Broken,
    }

    /// Canned monthly reports keyed by month start. Listed months that are
    /// absent answer `NotFound`, OTC months that are absent answer empty.
    #[derive(Default)]
    struct Reports {
        listed: HashMap<NaiveDate, Report>,
        otc: HashMap<NaiveDate, Report>,
        calls: Mutex<Vec<String>>,
    }

    impl Reports {
        fn answer(
            &self,
            exchange: &str,
            book: &HashMap<NaiveDate, Report>,
            code: &str,
            start: NaiveDate,
        ) -> Option<Result<Vec<PricePoint>, LookupError>> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{exchange}:{}", start.format("%Y-%m")));
            book.get(&start).map(|r| match r {
                Report::Rows(rows) => Ok(rows.clone()),
                Report::Broken => Err(LookupError::Malformed(code.to_string())),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MonthlyReports for Reports {
        async fn listed(
        &self,
        code: &str,
        start: NaiveDate,
    ) -> Result<Vec<PricePoint>, LookupError> {
            self.answer("twse", &self.listed, code, start)
                .unwrap_or_else(|| Err(LookupError::NotFound(code.to_string())))
        }

        async fn otc(
        &self,
        code: &str,
        start: NaiveDate,
    ) -> Result<Vec<PricePoint>, LookupError> {
            self.answer("tpex", &self.otc, code, start)
                .unwrap_or(Ok(Vec::new()))
        }
    }

    /// `n` trading days starting on the 1st of `month`, close = day of month.
    fn rows(month: NaiveDate, n: u32) -> Report {
        Report::Rows(
            (1..=n)
                .map(|d| PricePoint {
                    date: month.with_day(d).unwrap(),
                    close: d as f64,
                })
                .collect(),
        )
    }

    fn today() -> NaiveDate {
        date(2026, 10, 15)
    }

    #[tokio::test]
    async fn walk_stops_once_enough_closes_are_collected() {
        let mut reports = Reports::default();
        reports.listed.insert(date(2026, 10, 1), rows(date(2026, 10, 1), 10));
        reports.listed.insert(date(2026, 9, 1), rows(date(2026, 9, 1), 20));
        reports.listed.insert(date(2026, 8, 1), rows(date(2026, 8, 1), 20));

        let points = walk_months(&reports, "2330", today(), 25).await.unwrap();

        assert_eq!(reports.calls(), vec!["twse:2026-10", "twse:2026-09"]);
        assert_eq!(points.len(), 25);
        assert_eq!(points[0].date, date(2026, 9, 6));
        assert_eq!(points[24].date, date(2026, 10, 10));
        assert!(points.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[tokio::test]
    async fn unknown_code_gives_up_after_two_empty_months() {
        let reports = Reports::default();

        let points = walk_months(&reports, "9999", today(), 30).await.unwrap();

        assert!(points.is_empty());
        assert_eq!(
            reports.calls(),
            vec!["twse:2026-10", "tpex:2026-10", "twse:2026-09", "tpex:2026-09"]
        );
    }

    #[tokio::test]
    async fn sparse_history_is_capped_at_a_year_of_reports() {
        let mut reports = Reports::default();
        let mut month = date(2026, 10, 1);
        for _ in 0..24 {
            reports.listed.insert(month, rows(month, 1));
            month = month.checked_sub_months(Months::new(1)).unwrap();
        }

        let points = walk_months(&reports, "1101", today(), 30).await.unwrap();

        assert_eq!(points.len(), MAX_MONTHS);
        assert_eq!(reports.calls().len(), MAX_MONTHS);
        assert_eq!(points[0].date, date(2025, 11, 1));
        assert_eq!(points[MAX_MONTHS - 1].date, date(2026, 10, 1));
    }

    #[tokio::test]
    async fn otc_code_falls_back_to_tpex() {
        let mut reports = Reports::default();
        reports.otc.insert(date(2026, 10, 1), rows(date(2026, 10, 1), 10));
        reports.otc.insert(date(2026, 9, 1), rows(date(2026, 9, 1), 20));

        let points = walk_months(&reports, "6488", today(), 30).await.unwrap();

        assert_eq!(points.len(), 30);
        assert_eq!(
            reports.calls(),
            vec!["twse:2026-10", "tpex:2026-10", "twse:2026-09", "tpex:2026-09"]
        );
    }

    #[tokio::test]
    async fn failed_month_aborts_the_walk() {
        let mut reports = Reports::default();
        reports.listed.insert(date(2026, 10, 1), rows(date(2026, 10, 1), 10));
        reports.listed.insert(date(2026, 9, 1), Report::Broken);

        let err = walk_months(&reports, "2330", today(), 30).await.unwrap_err();

        assert!(!err.is_not_found());
        assert_eq!(reports.calls(), vec!["twse:2026-10", "twse:2026-09"]);
    }

    #[test]
    fn realtime_picks_matching_entry() {
        let res: RealtimeResponse = serde_json::from_str(
            r#"{
                "msgArray": [
                    {"c": "2330", "n": "台積電", "z": "1025.0000", "v": "23456", "ex": "tse"}
                ],
                "rtcode": "0000",
                "rtmessage": "OK"
            }"#,
        )
        .unwrap();

        let quote = parse_realtime("2330", res).unwrap();
        assert_eq!(
            quote,
            Quote::Domestic {
                code: "2330".into(),
                name: "台積電".into(),
                price: Some(1025.0),
                volume: 23456,
            }
        );
    }

    #[test]
    fn realtime_without_trade_has_no_price() {
        let res: RealtimeResponse = serde_json::from_str(
            r#"{"msgArray":[{"c":"0050","n":"元大台灣50","z":"-","v":"0"}],"rtcode":"0000"}"#,
        )
        .unwrap();

        match parse_realtime("0050", res).unwrap() {
            Quote::Domestic { price, volume, .. } => {
                assert_eq!(price, None);
                assert_eq!(volume, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn realtime_unknown_code_is_not_found() {
        let res: RealtimeResponse =
            serde_json::from_str(r#"{"msgArray":[],"rtcode":"0000"}"#).unwrap();
        assert!(parse_realtime("9999", res).unwrap_err().is_not_found());

        let res: RealtimeResponse =
            serde_json::from_str(r#"{"rtcode":"5001","rtmessage":"bad"}"#).unwrap();
        assert!(parse_realtime("2330", res).unwrap_err().is_not_found());
    }

    #[test]
    fn stock_day_rows_convert_roc_dates_and_skip_blank_closes() {
        let res: StockDayResponse = serde_json::from_str(
            r#"{
                "stat": "OK",
                "fields": ["日期","成交股數","成交金額","開盤價","最高價","最低價","收盤價","漲跌價差","成交筆數"],
                "data": [
                    ["115/10/01","25,123,456","1","1,010.00","1,030.00","1,005.00","1,025.00","+5.00","12,345"],
                    ["115/10/02","0","0","--","--","--","--"," 0.00","0"],
                    ["115/10/05*","1","1","1","1","1","1,030.50","+5.50","1"]
                ]
            }"#,
        )
        .unwrap();

        let points = parse_rows(&res.data);
        assert_eq!(
            points,
            vec![
                PricePoint {
                    date: date(2026, 10, 1),
                    close: 1025.0
                },
                PricePoint {
                    date: date(2026, 10, 5),
                    close: 1030.5
                },
            ]
        );
    }

    #[test]
    fn missing_report_deserializes_without_data() {
        let res: StockDayResponse =
            serde_json::from_str(r#"{"stat":"很抱歉，沒有符合條件的資料!"}"#).unwrap();
        assert_ne!(res.stat, "OK");
        assert!(res.data.is_empty());
    }

    #[test]
    fn keeps_last_points_oldest_first() {
        let point = |d| PricePoint {
            date: date(2026, 1, d),
            close: d as f64,
        };
        // newest month first, as collected
        let months = vec![vec![point(20), point(21)], vec![point(1), point(2), point(3)]];

        let kept = last_points(months, 3);
        let days: Vec<f64> = kept.iter().map(|p| p.close).collect();
        assert_eq!(days, vec![3.0, 20.0, 21.0]);
    }

    #[test]
    fn month_start_anchors_on_first_day() {
        assert_eq!(month_start(date(2026, 10, 15)), date(2026, 10, 1));
    }
}
