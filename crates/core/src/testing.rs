//! 测试替身：按脚本返回结果的数据源与引擎，供下游 crate 的集成测试使用。

use crate::market::entity::{QuoteEnvelope, SourceQuote};
use crate::market::error::MarketError;
use crate::market::port::{
    BatchQuoteSource, DashboardSource, QuoteEngine, QuoteSource, SourceKind,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 单个标的的脚本化响应
#[derive(Debug, Clone)]
pub enum Scripted {
    /// 返回解析成功的行情
    Quote(SourceQuote),
    /// 模拟页面结构不匹配
    Miss,
    /// 模拟传输层或状态码错误
    Fail(MarketError),
    /// 延迟后再给出内层响应
    Delayed(Duration, Box<Scripted>),
    /// 模拟适配器在 fetch_quote 内部崩溃
    Panic,
}

/// 构造只有价格与涨跌幅的行情
pub fn quote(price: f64, change: f64, pct: f64) -> SourceQuote {
    SourceQuote {
        price: Some(price),
        change: Some(change),
        pct: Some(pct),
        time: None,
    }
}

/// 按 ticker 返回预设结果的数据源，并记录每次调用
pub struct ScriptedSource {
    kind: SourceKind,
    script: HashMap<String, Scripted>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            script: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 为指定 ticker 登记响应，未登记的 ticker 返回 `Ok(None)`
    pub fn with(mut self, ticker: &str, response: Scripted) -> Self {
        self.script.insert(ticker.to_string(), response);
        self
    }

    /// 已被请求过的 ticker，按调用顺序
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// 指定 ticker 被请求的次数
    pub fn call_count(&self, ticker: &str) -> usize {
        self.calls().iter().filter(|t| t.as_str() == ticker).count()
    }
}

#[allow(clippy::panic)]
async fn play(response: Scripted) -> Result<Option<SourceQuote>, MarketError> {
    let mut current = response;
    loop {
        match current {
            Scripted::Quote(q) => return Ok(Some(q)),
            Scripted::Miss => return Ok(None),
            Scripted::Fail(err) => return Err(err),
            Scripted::Delayed(delay, inner) => {
                tokio::time::sleep(delay).await;
                current = *inner;
            }
            Scripted::Panic => panic!("scripted source crashed"),
        }
    }
}

#[async_trait]
impl QuoteSource for ScriptedSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch_quote(&self, ticker: &str) -> Result<Option<SourceQuote>, MarketError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(ticker.to_string());
        }
        match self.script.get(ticker).cloned() {
            Some(response) => play(response).await,
            None => Ok(None),
        }
    }
}

/// 看板数据源替身：记录抓取次数，成功时返回按标签脚本化的页面快照
pub struct ScriptedDashboard {
    page: Result<HashMap<String, Scripted>, MarketError>,
    crash: bool,
    fetches: AtomicUsize,
}

impl ScriptedDashboard {
    /// 页面抓取成功，按标签返回预设结果
    pub fn page(labels: Vec<(&str, Scripted)>) -> Self {
        Self {
            page: Ok(labels
                .into_iter()
                .map(|(label, response)| (label.to_string(), response))
                .collect()),
            crash: false,
            fetches: AtomicUsize::new(0),
        }
    }

    /// 页面抓取失败
    pub fn failing(err: MarketError) -> Self {
        Self {
            page: Err(err),
            crash: false,
            fetches: AtomicUsize::new(0),
        }
    }

    /// 页面抓取过程中 panic
    pub fn crashing() -> Self {
        Self {
            page: Ok(HashMap::new()),
            crash: true,
            fetches: AtomicUsize::new(0),
        }
    }

    /// 页面被抓取的次数
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DashboardSource for ScriptedDashboard {
    #[allow(clippy::panic)]
    async fn fetch_dashboard(&self) -> Result<Arc<dyn QuoteSource>, MarketError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.crash {
            panic!("scripted dashboard crashed");
        }
        let labels = self.page.clone()?;
        let source = labels.into_iter().fold(
            ScriptedSource::new(SourceKind::KrxDashboard),
            |source, (label, response)| source.with(&label, response),
        );
        Ok(Arc::new(source))
    }
}

/// 批量数据源替身
pub struct ScriptedBatch {
    rows: Result<HashMap<String, SourceQuote>, MarketError>,
    requests: Mutex<Vec<Vec<String>>>,
}

impl ScriptedBatch {
    pub fn rows(rows: Vec<(&str, SourceQuote)>) -> Self {
        Self {
            rows: Ok(rows
                .into_iter()
                .map(|(symbol, q)| (symbol.to_string(), q))
                .collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: MarketError) -> Self {
        Self {
            rows: Err(err),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 每次批量请求携带的符号列表
    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BatchQuoteSource for ScriptedBatch {
    async fn fetch_quotes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, SourceQuote>, MarketError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(symbols.to_vec());
        }
        self.rows.clone()
    }
}

/// 固定返回同一信封的引擎替身
pub struct StaticEngine {
    envelope: QuoteEnvelope,
}

impl StaticEngine {
    pub fn new(envelope: QuoteEnvelope) -> Self {
        Self { envelope }
    }
}

#[async_trait]
impl QuoteEngine for StaticEngine {
    async fn snapshot(&self) -> QuoteEnvelope {
        self.envelope.clone()
    }
}
