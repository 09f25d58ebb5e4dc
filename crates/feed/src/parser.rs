use marketboard_core::market::entity::SourceQuote;
use regex::Regex;
use scraper::Html;
use tracing::error;

/// # Summary
/// 单标的响应体解析策略。
///
/// # Invariants
/// - 所有策略共享同一接口 `parse(body) -> Option<SourceQuote>`，
///   新增数据源只需新增一个变体，回退链无需改动。
/// - 解析失败一律返回 None，从不 panic。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageParser {
    /// KRX 概览页：`<LABEL> <number> (<sign><number>%)`
    KrxIndex { label: String },
    /// Stooq 报价页：`Last<number>` 与 `Change<signed> (<signed>%)`
    StooqQuote,
    /// Yahoo chart JSON：读取 `chart.result[0].meta`
    YahooChart,
}

impl PageParser {
    /// 按策略解析原始响应体，HTML 页面先转为可见文本
    pub fn parse(&self, body: &str) -> Option<SourceQuote> {
        match self {
            PageParser::YahooChart => self.parse_text(body),
            _ => self.parse_text(&visible_text(body)),
        }
    }

    /// 解析已经提取过可见文本的页面，不再重复剥离标记
    pub fn parse_text(&self, text: &str) -> Option<SourceQuote> {
        match self {
            PageParser::KrxIndex { label } => crate::krx::parse_index(text, label),
            PageParser::StooqQuote => crate::stooq::parse_quote(text),
            PageParser::YahooChart => crate::yahoo::parse_chart(text),
        }
    }
}

// 这些元素的文本节点不会显示在页面上
const HIDDEN: [&str; 4] = ["script", "style", "noscript", "template"];

/// # Summary
/// 将 HTML 解析为文档，拼接其中可见的文本节点。
///
/// # Logic
/// 1. `Html::parse_document` 容错解析并解码实体。
/// 2. 跳过位于 `script`/`style` 等不可见元素内的文本。
/// 3. 文本节点之间以空格分隔，使相邻单元格的内容不会粘连。
/// 4. 不换行空格统一替换为普通空格。
pub(crate) fn visible_text(body: &str) -> String {
    let document = Html::parse_document(body);
    let mut text = String::with_capacity(body.len());
    for node in document.root_element().descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| HIDDEN.contains(&el.name()))
        });
        if !hidden {
            text.push_str(fragment);
            text.push(' ');
        }
    }
    text.replace('\u{a0}', " ")
}

/// 编译正则，失败时记录错误并返回 None（解析随之视为失败）
pub(crate) fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            error!(pattern, error = %e, "invalid quote pattern");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_text_strips_tags() {
        let html = "<table><tr><th>KOSPI</th><td>2,615.32</td><td>(+1.05%)</td></tr></table>";
        let text = visible_text(html);
        assert!(!text.contains('<'));
        assert_eq!(text.split_whitespace().collect::<Vec<_>>(), vec![
            "KOSPI", "2,615.32", "(+1.05%)"
        ]);
    }

    #[test]
    fn test_visible_text_skips_scripts_and_decodes_entities() {
        let html = r#"<html><head><style>.up{color:red}</style>
            <script>var tpl="KOSPI 0 (+0.00%)";</script></head>
            <body><dl><dt>KOSPI</dt><dd>2,615.32</dd><dd>(&#43;1.05%)</dd></dl></body></html>"#;
        let text = visible_text(html);
        assert!(!text.contains("tpl"));
        assert!(!text.contains("color"));
        assert_eq!(text.split_whitespace().collect::<Vec<_>>(), vec![
            "KOSPI", "2,615.32", "(+1.05%)"
        ]);
    }

    #[test]
    fn test_visible_text_keeps_plain_text() {
        assert_eq!(visible_text("Last4309.63&nbsp;").trim_end(), "Last4309.63");
    }

    #[test]
    fn test_parser_variants_dispatch() {
        let krx = PageParser::KrxIndex {
            label: "KOSDAQ".to_string(),
        };
        let q = krx.parse("KOSDAQ 845.10 (-0.52%)").unwrap();
        assert_eq!(q.price, Some(845.10));
        assert_eq!(q.pct, Some(-0.52));

        // 已是纯文本时直接解析
        let q = krx.parse_text("KOSDAQ 845.10 (-0.52%)").unwrap();
        assert_eq!(q.price, Some(845.10));

        assert!(PageParser::StooqQuote.parse("nothing here").is_none());
        assert!(PageParser::YahooChart.parse("{not json").is_none());
    }
}
