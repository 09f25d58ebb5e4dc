use crate::http::HttpFetcher;
use crate::parser::PageParser;
use async_trait::async_trait;
use marketboard_core::common::time::unix_to_iso;
use marketboard_core::market::entity::SourceQuote;
use marketboard_core::market::error::MarketError;
use marketboard_core::market::port::{BatchQuoteSource, QuoteSource, SourceKind};
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// # Summary
/// 拼接 Yahoo 接口地址，符号作为单独的路径段进行编码。
fn endpoint(base_url: &str, segments: &[&str]) -> Result<Url, MarketError> {
    let mut url = Url::parse(base_url).map_err(|e| MarketError::Config(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| MarketError::Config(format!("cannot be a base url: {}", base_url)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// # Summary
/// Yahoo Finance chart 接口适配器（单标的）。
///
/// # Invariants
/// - 使用 v8 chart 接口，`interval=1d&range=2d`，只读取 `meta` 块。
#[derive(Clone)]
pub struct YahooChartAdapter {
    fetcher: HttpFetcher,
    base_url: String,
}

impl YahooChartAdapter {
    pub fn new(fetcher: HttpFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl QuoteSource for YahooChartAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::YahooChart
    }

    /// # Summary
    /// 抓取单个符号的 chart JSON 并读取最新 meta。
    ///
    /// # Logic
    /// 1. 构建 `/v8/finance/chart/<symbol>` 地址。
    /// 2. 以文本方式取回响应体，交由 `PageParser::YahooChart` 解析。
    ///
    /// # Arguments
    /// * `symbol`: Yahoo 符号，例如 `^KQ11`、`USDKRW=X`。
    ///
    /// # Returns
    /// `meta` 缺失或结构不匹配时返回 None。
    async fn fetch_quote(&self, symbol: &str) -> Result<Option<SourceQuote>, MarketError> {
        let url = endpoint(&self.base_url, &["v8", "finance", "chart", symbol])?;
        let body = self
            .fetcher
            .get_text(url.as_str(), &[("interval", "1d"), ("range", "2d")])
            .await?;
        Ok(PageParser::YahooChart.parse(&body))
    }
}

/// # Summary
/// Yahoo API 响应顶层结构。
///
/// # Invariants
/// - 映射自 Yahoo v8 chart 接口。
#[derive(Deserialize, Debug)]
struct YahooResponse {
    chart: YahooChart,
}

/// # Summary
/// Yahoo API 图表数据部分。
#[derive(Deserialize, Debug)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

/// # Summary
/// Yahoo API 错误详情。
#[derive(Deserialize, Debug)]
struct YahooError {
    description: Option<String>,
}

/// # Summary
/// Yahoo API 单个时间序列结果，这里只关心 meta。
#[derive(Deserialize, Debug)]
struct YahooResult {
    meta: Option<YahooMeta>,
}

/// # Summary
/// Yahoo chart 的行情元数据块。
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct YahooMeta {
    regular_market_price: Option<f64>,
    // chartPreviousClose 是整个 range 窗口之前的收盘价，不参与计算
    previous_close: Option<f64>,
    regular_market_change: Option<f64>,
    regular_market_change_percent: Option<f64>,
    regular_market_time: Option<i64>,
}

impl YahooMeta {
    /// # Summary
    /// 将 meta 块转换为规范化行情。
    ///
    /// # Logic
    /// 1. 有前收盘价时涨跌额 = 最新价 - 前收盘价，否则取 `regularMarketChange`。
    /// 2. 涨跌幅优先取 `regularMarketChangePercent`，否则由涨跌额 / 前收盘价计算。
    /// 3. `regularMarketTime` (Unix 秒) 转为 ISO-8601。
    fn into_source_quote(self) -> SourceQuote {
        let price = self.regular_market_price;
        let previous = self.previous_close;

        let change = match (price, previous) {
            (Some(p), Some(prev)) => Some(p - prev),
            _ => self.regular_market_change,
        };
        let pct = self.regular_market_change_percent.or(match (change, previous) {
            (Some(ch), Some(prev)) if prev != 0.0 => Some(ch / prev * 100.0),
            _ => None,
        });

        SourceQuote {
            price,
            change,
            pct,
            time: self.regular_market_time.and_then(unix_to_iso),
        }
        .normalize()
    }
}

/// # Summary
/// 解析 chart JSON 响应体。
pub(crate) fn parse_chart(body: &str) -> Option<SourceQuote> {
    let response: YahooResponse = serde_json::from_str(body).ok()?;
    if let Some(err) = &response.chart.error {
        debug!(description = ?err.description, "yahoo chart error payload");
    }
    let meta = response.chart.result?.into_iter().next()?.meta?;
    Some(meta.into_source_quote())
}

/// # Summary
/// Yahoo Finance quote 批量接口适配器。
///
/// # Invariants
/// - 一次请求覆盖全部符号，返回结果以行内 `symbol` 为键。
#[derive(Clone)]
pub struct YahooBatchAdapter {
    fetcher: HttpFetcher,
    base_url: String,
}

impl YahooBatchAdapter {
    pub fn new(fetcher: HttpFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }
}

/// # Summary
/// 批量接口响应顶层结构。
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct BatchResponse {
    quote_response: BatchBody,
}

#[derive(Deserialize, Debug)]
struct BatchBody {
    result: Option<Vec<BatchRow>>,
}

/// # Summary
/// 批量接口中的单行报价。
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct BatchRow {
    symbol: Option<String>,
    regular_market_price: Option<f64>,
    regular_market_change: Option<f64>,
    regular_market_change_percent: Option<f64>,
    regular_market_time: Option<i64>,
}

impl BatchResponse {
    fn into_quotes(self) -> HashMap<String, SourceQuote> {
        self.quote_response
            .result
            .unwrap_or_default()
            .into_iter()
            .filter_map(|row| {
                let symbol = row.symbol?;
                let quote = SourceQuote {
                    price: row.regular_market_price,
                    change: row.regular_market_change,
                    pct: row.regular_market_change_percent,
                    time: row.regular_market_time.and_then(unix_to_iso),
                }
                .normalize();
                Some((symbol, quote))
            })
            .collect()
    }
}

#[async_trait]
impl BatchQuoteSource for YahooBatchAdapter {
    /// # Summary
    /// 一次请求批量获取多个符号的行情。
    ///
    /// # Logic
    /// 1. 构建 `/v7/finance/quote?symbols=<逗号分隔>`。
    /// 2. 反序列化 `quoteResponse.result` 并逐行转换。
    async fn fetch_quotes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, SourceQuote>, MarketError> {
        let url = endpoint(&self.base_url, &["v7", "finance", "quote"])?;
        let joined = symbols.join(",");
        let response: BatchResponse = self
            .fetcher
            .get_json(url.as_str(), &[("symbols", joined.as_str())])
            .await?;
        let quotes = response.into_quotes();
        debug!(requested = symbols.len(), returned = quotes.len(), "yahoo batch quotes");
        Ok(quotes)
    }
}
