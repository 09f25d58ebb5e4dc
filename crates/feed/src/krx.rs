use crate::http::HttpFetcher;
use crate::parser::{PageParser, compile, visible_text};
use async_trait::async_trait;
use marketboard_core::common::number::parse_locale_number;
use marketboard_core::market::entity::SourceQuote;
use marketboard_core::market::error::MarketError;
use marketboard_core::market::port::{DashboardSource, QuoteSource, SourceKind};
use std::sync::Arc;
use tracing::debug;

/// # Summary
/// KRX 市场概览页适配器。
///
/// # Invariants
/// - 页面地址固定，不随标的变化；一次抓取服务 KOSPI 与 KOSDAQ 两个标签。
#[derive(Clone)]
pub struct KrxDashboardAdapter {
    fetcher: HttpFetcher,
    url: String,
}

impl KrxDashboardAdapter {
    pub fn new(fetcher: HttpFetcher, url: impl Into<String>) -> Self {
        Self {
            fetcher,
            url: url.into(),
        }
    }
}

#[async_trait]
impl DashboardSource for KrxDashboardAdapter {
    /// # Summary
    /// 抓取概览页，返回基于页面快照的数据源。
    ///
    /// # Logic
    /// 1. 对固定地址发起一次 GET。
    /// 2. 将 HTML 转为可见文本后保存为快照，后续按标签提取不再访问网络。
    async fn fetch_dashboard(&self) -> Result<Arc<dyn QuoteSource>, MarketError> {
        let body = self.fetcher.get_text(&self.url, &[]).await?;
        debug!(bytes = body.len(), "fetched KRX dashboard");
        Ok(Arc::new(KrxDashboardPage::from_html(&body)))
    }
}

/// # Summary
/// 已抓取的 KRX 概览页快照。
pub struct KrxDashboardPage {
    text: String,
}

impl KrxDashboardPage {
    /// 由原始 HTML 构建快照
    pub fn from_html(html: &str) -> Self {
        Self {
            text: visible_text(html),
        }
    }
}

#[async_trait]
impl QuoteSource for KrxDashboardPage {
    fn kind(&self) -> SourceKind {
        SourceKind::KrxDashboard
    }

    async fn fetch_quote(&self, label: &str) -> Result<Option<SourceQuote>, MarketError> {
        Ok(PageParser::KrxIndex {
            label: label.to_string(),
        }
        .parse_text(&self.text))
    }
}

/// # Summary
/// 在页面可见文本中按标签提取指数点位与涨跌幅。
///
/// # Logic
/// 1. 以不区分大小写的正则匹配 `<LABEL> <number> (<sign><number>%)`。
/// 2. 点位与涨跌幅经千分位规整后解析。
/// 3. 涨跌额由点位与涨跌幅反推。
///
/// # Returns
/// 未匹配或点位无法解析时返回 None。
pub(crate) fn parse_index(text: &str, label: &str) -> Option<SourceQuote> {
    let pattern = format!(
        r"(?i)\b{}\b\s*([0-9][0-9,]*\.?[0-9]*)\s*\(\s*([-+][0-9.]+)%\s*\)",
        regex::escape(label)
    );
    let re = compile(&pattern)?;
    let caps = re.captures(text)?;

    let price = parse_locale_number(&caps[1])?;
    let pct = parse_locale_number(&caps[2]);

    Some(
        SourceQuote {
            price: Some(price),
            change: None,
            pct,
            time: None,
        }
        .normalize(),
    )
}
