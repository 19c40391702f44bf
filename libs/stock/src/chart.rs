use std::io::Write;
use std::path::{Path, PathBuf};

use charming::{
    Chart, ImageFormat, ImageRenderer,
    component::{Axis, Grid, Title},
    element::{AxisLabel, AxisType, LineStyle, SplitLine, Symbol, TextStyle},
    series::Line,
};
use tracing::{debug, info};

use crate::error::ChartError;
use crate::price_client::MarketData;
use crate::quote::PricePoint;
use crate::ticker::Ticker;

const WIDTH: u32 = 1000;
const HEIGHT: u32 = 500;

pub type RenderFn = fn(&str, &[PricePoint]) -> Result<Vec<u8>, ChartError>;

/// Renders trend charts into `<dir>/<SYMBOL>.png`, overwriting earlier runs.
#[derive(Clone)]
pub struct ChartRenderer {
    dir: PathBuf,
    render: RenderFn,
}

impl ChartRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_renderer(dir, render_png)
    }

    pub fn with_renderer(dir: impl Into<PathBuf>, render: RenderFn) -> Self {
        Self {
            dir: dir.into(),
            render,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(file_name(symbol))
    }

    pub async fn generate(
        &self,
        market: &dyn MarketData,
        ticker: &Ticker,
    ) -> Result<PathBuf, ChartError> {
        let points = market.history(ticker).await?;
        if points.is_empty() {
            return Err(ChartError::NoData(ticker.symbol().to_string()));
        }
        debug!(symbol = %ticker, points = points.len(), "rendering chart");

        let render = self.render;
        let symbol = ticker.symbol().to_string();
        let png = tokio::task::spawn_blocking(move || render(&symbol, &points)).await??;

        self.save(ticker.symbol(), &png).await
    }

    /// Write through a temp file unique to this call, then rename it over the
    /// chart. Concurrent saves of one symbol each land a complete PNG and the
    /// last rename wins.
    pub async fn save(&self, symbol: &str, png: &[u8]) -> Result<PathBuf, ChartError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(symbol);
        let dir = self.dir.clone();
        let target = path.clone();
        let prefix = format!(".{}.", file_name(symbol));
        let bytes = png.to_vec();

        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = tempfile::Builder::new()
                .prefix(&prefix)
                .suffix(".tmp")
                .tempfile_in(&dir)?;
            tmp.write_all(&bytes)?;
            tmp.persist(&target)?;
            Ok(())
        })
        .await??;

        info!(symbol, path = %path.display(), bytes = png.len(), "chart written");
        Ok(path)
    }
}

/// File name a symbol's chart is stored and served under.
pub fn file_name(symbol: &str) -> String {
    let stem: String = symbol
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.png", stem.trim_start_matches('.'))
}

pub fn render_png(symbol: &str, points: &[PricePoint]) -> Result<Vec<u8>, ChartError> {
    if points.is_empty() {
        return Err(ChartError::NoData(symbol.to_string()));
    }

    let dates: Vec<String> = points
        .iter()
        .map(|p| p.date.format("%m/%d").to_string())
        .collect();
    let closes: Vec<f64> = points.iter().map(|p| p.close).collect();

    let chart = Chart::new()
        .background_color("#ffffff")
        .title(
            Title::new()
                .text(format!("{} 近30日收盤價", symbol.to_uppercase()))
                .left("center")
                .top("2%")
                .text_style(TextStyle::new().color("#222222").font_size(16)),
        )
        .grid(Grid::new().left("8%").right("4%").bottom("15%"))
        .x_axis(
            Axis::new()
                .type_(AxisType::Category)
                .name("Date")
                .data(dates)
                .axis_label(AxisLabel::new().rotate(45).color("#555555")),
        )
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .name("Close")
                .scale(true)
                .axis_label(AxisLabel::new().color("#555555"))
                .split_line(SplitLine::new().line_style(LineStyle::new().color("#e6e6e6"))),
        )
        .series(
            Line::new()
                .name("Close")
                .data(closes)
                .symbol(Symbol::Circle)
                .line_style(LineStyle::new().width(2).color("#1f77b4")),
        );

    let mut renderer = ImageRenderer::new(WIDTH, HEIGHT);
    renderer
        .render_format(ImageFormat::Png, &chart)
        .map_err(|e| ChartError::Render(format!("{e:?}")))
}
