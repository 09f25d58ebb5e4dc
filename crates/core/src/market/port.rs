use crate::market::entity::{QuoteEnvelope, SourceQuote};
use crate::market::error::MarketError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// # Summary
/// 上游数据源种类，回退链中的每一步都引用其中之一。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    // KRX 市场概览 HTML 页面
    KrxDashboard,
    // Stooq 单标的报价页
    Stooq,
    // Yahoo Finance 单标的 chart JSON
    YahooChart,
    // Yahoo Finance 批量 quote JSON
    YahooBatch,
}

impl SourceKind {
    /// 用于日志与诊断的稳定标识
    pub fn id(&self) -> &'static str {
        match self {
            SourceKind::KrxDashboard => "KRX_DASHBOARD",
            SourceKind::Stooq => "STOOQ",
            SourceKind::YahooChart => "YAHOO_CHART",
            SourceKind::YahooBatch => "YAHOO_BATCH",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// # Summary
/// 单标的行情数据源契约（源适配器）。
///
/// # Invariants
/// - 每次调用至多发起一次上游请求，内部不重试。
/// - 传输失败或非 2xx 返回 `Err`，页面/结构不匹配返回 `Ok(None)`，调用方对两者一视同仁。
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// # Summary
    /// 返回数据源种类。
    fn kind(&self) -> SourceKind;

    /// # Summary
    /// 获取单个标的的最新行情。
    ///
    /// # Logic
    /// 1. 按数据源约定拼装请求（URL 或页面标签）。
    /// 2. 执行一次请求并解析响应体。
    /// 3. 将解析结果规范化为 `SourceQuote`。
    ///
    /// # Arguments
    /// * `ticker`: 数据源识别的标的参数（页面标签、Stooq 代码或 Yahoo 符号）。
    ///
    /// # Returns
    /// 成功返回部分行情，解析失败返回 None。
    async fn fetch_quote(&self, ticker: &str) -> Result<Option<SourceQuote>, MarketError>;
}

/// # Summary
/// 一次请求可服务多个标签的看板类数据源（KRX 市场概览页）。
///
/// # Invariants
/// - 每次聚合只抓取一次页面，返回的快照在多个标的之间共享。
#[async_trait]
pub trait DashboardSource: Send + Sync {
    /// # Summary
    /// 抓取看板页面并返回基于该页面快照的数据源。
    ///
    /// # Returns
    /// 成功返回可按标签提取行情的 `QuoteSource`；其 `fetch_quote` 不再发起网络请求。
    async fn fetch_dashboard(&self) -> Result<Arc<dyn QuoteSource>, MarketError>;
}

/// # Summary
/// 批量行情数据源契约，一次请求覆盖多个符号。
#[async_trait]
pub trait BatchQuoteSource: Send + Sync {
    /// # Summary
    /// 批量获取多个符号的行情。
    ///
    /// # Arguments
    /// * `symbols`: 请求的符号列表。
    ///
    /// # Returns
    /// 以数据源返回的符号为键的行情映射，未返回的符号不出现在映射中。
    async fn fetch_quotes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, SourceQuote>, MarketError>;
}

/// # Summary
/// 行情解析引擎门面契约，供 HTTP 与命令行入口共用。
///
/// # Invariants
/// - 永不返回错误：整体失败以 `ok = false` 的软错误信封表达。
/// - 不跨请求保存任何状态。
#[async_trait]
pub trait QuoteEngine: Send + Sync {
    /// 执行一次完整聚合并返回响应信封
    async fn snapshot(&self) -> QuoteEnvelope;
}
