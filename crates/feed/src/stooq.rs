use crate::http::HttpFetcher;
use crate::parser::{PageParser, compile};
use async_trait::async_trait;
use marketboard_core::common::number::parse_locale_number;
use marketboard_core::market::entity::SourceQuote;
use marketboard_core::market::error::MarketError;
use marketboard_core::market::port::{QuoteSource, SourceKind};
use regex::Regex;
use std::sync::LazyLock;

static LAST: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"(?i)Last\s*([0-9][0-9,]*\.?[0-9]*)"));

static CHANGE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(
        r"(?i)Change\s*([+-]?[0-9][0-9,]*\.?[0-9]*)\s*\(\s*([+-]?[0-9][0-9,]*\.?[0-9]*)%\s*\)",
    )
});

static PCT_ONLY: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"\(\s*([+-]?[0-9][0-9,]*\.?[0-9]*)%\s*\)"));

/// # Summary
/// Stooq 报价页适配器。
///
/// # Invariants
/// - 请求地址为 `<base>/q/?s=<小写 ticker>`。
#[derive(Clone)]
pub struct StooqAdapter {
    fetcher: HttpFetcher,
    base_url: String,
}

impl StooqAdapter {
    pub fn new(fetcher: HttpFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl QuoteSource for StooqAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Stooq
    }

    async fn fetch_quote(&self, ticker: &str) -> Result<Option<SourceQuote>, MarketError> {
        let url = format!("{}/q/", self.base_url.trim_end_matches('/'));
        let symbol = ticker.to_lowercase();
        let body = self.fetcher.get_text(&url, &[("s", symbol.as_str())]).await?;
        Ok(PageParser::StooqQuote.parse(&body))
    }
}

/// # Summary
/// 从 Stooq 页面的可见文本中提取最新价与涨跌。
///
/// # Logic
/// 1. `Last<number>` 提供最新价，缺失即视为解析失败。
/// 2. 优先匹配完整的 `Change<signed> (<signed>%)`。
/// 3. 否则退而匹配孤立的 `(<signed>%)`，并由涨跌幅反推涨跌额。
/// 4. 涨跌幅无法确定时整体视为失败。
pub(crate) fn parse_quote(text: &str) -> Option<SourceQuote> {
    let last = LAST.as_ref()?.captures(text)?;
    let price = parse_locale_number(&last[1]);

    let (change, pct) = match CHANGE.as_ref().and_then(|re| re.captures(text)) {
        Some(caps) => (parse_locale_number(&caps[1]), parse_locale_number(&caps[2])),
        None => {
            let pct = PCT_ONLY
                .as_ref()
                .and_then(|re| re.captures(text))
                .and_then(|caps| parse_locale_number(&caps[1]));
            (None, pct)
        }
    };
    pct?;

    Some(
        SourceQuote {
            price,
            change,
            pct,
            time: None,
        }
        .normalize(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compact_fields() {
        let body = "Symbol ^SPX\nLast4309.63\nChange+95.46 (+2.27%)\nVolume 0";
        let q = parse_quote(body).unwrap();
        assert_eq!(q.price, Some(4309.63));
        assert_eq!(q.change, Some(95.46));
        assert_eq!(q.pct, Some(2.27));
        assert!(q.time.is_none());
    }

    #[test]
    fn test_parse_html_layout_with_negative_change() {
        let html = r#"<table><tr><td>Last</td><td><b>1,382.15</b></td></tr>
            <tr><td>Change</td><td>-4.05 ( -0.29% )</td></tr></table>"#;
        let q = PageParser::StooqQuote.parse(html).unwrap();
        assert_eq!(q.price, Some(1382.15));
        assert_eq!(q.change, Some(-4.05));
        assert_eq!(q.pct, Some(-0.29));
    }

    #[test]
    fn test_parse_percent_only_fallback_derives_change() {
        let body = "Last 2,615.32 ... (+1.05%)";
        let q = parse_quote(body).unwrap();
        assert_eq!(q.pct, Some(1.05));
        assert!((q.change.unwrap() - 27.17).abs() < 0.01);
    }

    #[test]
    fn test_parse_requires_percent() {
        assert!(parse_quote("Last4309.63\nChange n/a").is_none());
    }

    #[test]
    fn test_parse_requires_last() {
        assert!(parse_quote("Change+95.46 (+2.27%)").is_none());
        assert!(PageParser::StooqQuote.parse("<html>Exceeded the daily hits limit</html>").is_none());
    }
}
