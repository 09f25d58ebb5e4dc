use crate::chain::FallbackChain;
use futures::FutureExt;
use marketboard_core::market::entity::Quote;
use marketboard_core::market::error::MarketError;
use marketboard_core::market::port::{QuoteSource, SourceKind};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

/// # Summary
/// 在适配器边界捕获 panic，将其转换为普通的数据源错误。
///
/// # Invariants
/// - 单个适配器崩溃与传输失败同等处理，只触发回退，不影响其他标的。
pub(crate) async fn shielded<T>(
    call: impl Future<Output = Result<T, MarketError>>,
) -> Result<T, MarketError> {
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(MarketError::Unknown(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());
    match detail {
        Some(msg) => format!("adapter panicked: {}", msg),
        None => "adapter panicked".to_string(),
    }
}

/// # Summary
/// 单次聚合中可用的数据源集合。
///
/// # Invariants
/// - `dashboard` 是本次请求抓取到的看板页面快照；抓取失败时为 None，对应步骤视为失败。
/// - 克隆只复制引用，可安全地移入各标的的独立任务。
#[derive(Clone)]
pub struct SourceSet {
    pub dashboard: Option<Arc<dyn QuoteSource>>,
    pub stooq: Arc<dyn QuoteSource>,
    pub yahoo_chart: Arc<dyn QuoteSource>,
}

impl SourceSet {
    /// 按种类取出数据源；批量数据源不参与回退链
    pub fn get(&self, kind: SourceKind) -> Option<&Arc<dyn QuoteSource>> {
        match kind {
            SourceKind::KrxDashboard => self.dashboard.as_ref(),
            SourceKind::Stooq => Some(&self.stooq),
            SourceKind::YahooChart => Some(&self.yahoo_chart),
            SourceKind::YahooBatch => None,
        }
    }
}

/// # Summary
/// 按回退链顺序解析单个标的。
pub struct FallbackResolver {
    sources: SourceSet,
}

impl FallbackResolver {
    pub fn new(sources: SourceSet) -> Self {
        Self { sources }
    }

    /// # Summary
    /// 依次尝试回退链中的每一步，首个带价格的结果胜出。
    ///
    /// # Logic
    /// 1. 取出该步对应的数据源，不可用时直接跳到下一步。
    /// 2. 调用 `fetch_quote`，`Err`、`Ok(None)`、无价格结果以及适配器 panic 都视为失败并记录告警。
    /// 3. 成功时附加该步的上报符号并立即返回，后续步骤不再调用。
    ///
    /// # Arguments
    /// * `chain`: 标的的回退链。
    ///
    /// # Returns
    /// 全部步骤失败时返回 None，该标的不出现在响应中。
    pub async fn resolve(&self, chain: &FallbackChain) -> Option<Quote> {
        for step in chain.steps {
            let Some(source) = self.sources.get(step.source) else {
                warn!(
                    key = %chain.key,
                    source = %step.source,
                    "source unavailable, falling back"
                );
                continue;
            };

            match shielded(source.fetch_quote(step.ticker)).await {
                Ok(Some(q)) if q.has_price() => {
                    debug!(key = %chain.key, source = %step.source, symbol = step.symbol, "resolved");
                    return Some(Quote::from_source(step.symbol, q));
                }
                Ok(_) => {
                    warn!(
                        key = %chain.key,
                        source = %step.source,
                        ticker = step.ticker,
                        "no quote in upstream response, falling back"
                    );
                }
                Err(e) => {
                    warn!(
                        key = %chain.key,
                        source = %step.source,
                        ticker = step.ticker,
                        error = %e,
                        "upstream fetch failed, falling back"
                    );
                }
            }
        }
        warn!("All sources failed for {}", chain.key);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::chain_for;
    use marketboard_core::market::entity::{InstrumentKey, SourceQuote};
    use marketboard_core::testing::{Scripted, ScriptedSource, quote};

    fn sources(
        dashboard: Option<ScriptedSource>,
        stooq: ScriptedSource,
        yahoo: ScriptedSource,
    ) -> (SourceSet, Arc<ScriptedSource>, Arc<ScriptedSource>) {
        let stooq = Arc::new(stooq);
        let yahoo = Arc::new(yahoo);
        let set = SourceSet {
            dashboard: dashboard.map(|d| Arc::new(d) as Arc<dyn QuoteSource>),
            stooq: stooq.clone(),
            yahoo_chart: yahoo.clone(),
        };
        (set, stooq, yahoo)
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let (set, stooq, yahoo) = sources(
            None,
            ScriptedSource::new(SourceKind::Stooq).with("^spx", Scripted::Quote(quote(4309.63, 95.46, 2.27))),
            ScriptedSource::new(SourceKind::YahooChart),
        );
        let resolver = FallbackResolver::new(set);
        let chain = chain_for(InstrumentKey::Sp500).unwrap();

        let q = resolver.resolve(chain).await.unwrap();
        assert_eq!(q.symbol, "^SPX");
        assert_eq!(q.price, Some(4309.63));
        assert_eq!(stooq.call_count("^spx"), 1);
        assert!(yahoo.calls().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_output_matches_secondary_exactly() {
        let fallback = SourceQuote {
            price: Some(1375.2),
            change: Some(2.1),
            pct: Some(0.153),
            time: Some("2024-05-01T06:30:00.000Z".to_string()),
        };
        let (set, _, yahoo) = sources(
            None,
            ScriptedSource::new(SourceKind::Stooq).with("usdkrw", Scripted::Fail(MarketError::Status(503))),
            ScriptedSource::new(SourceKind::YahooChart).with("USDKRW=X", Scripted::Quote(fallback.clone())),
        );
        let resolver = FallbackResolver::new(set);

        let q = resolver.resolve(chain_for(InstrumentKey::Usdkrw).unwrap()).await.unwrap();
        assert_eq!(q, Quote::from_source("USDKRW=X", fallback));
        assert_eq!(yahoo.call_count("USDKRW=X"), 1);
    }

    #[tokio::test]
    async fn test_missing_dashboard_falls_through() {
        let (set, stooq, _) = sources(
            None,
            ScriptedSource::new(SourceKind::Stooq).with("^KOSPI", Scripted::Quote(quote(2600.0, 10.0, 0.39))),
            ScriptedSource::new(SourceKind::YahooChart),
        );
        let resolver = FallbackResolver::new(set);

        let q = resolver.resolve(chain_for(InstrumentKey::Kospi).unwrap()).await.unwrap();
        assert_eq!(q.symbol, "^KOSPI");
        assert_eq!(stooq.calls(), vec!["^KOSPI".to_string()]);
    }

    #[tokio::test]
    async fn test_panicking_adapter_falls_through() {
        let (set, stooq, yahoo) = sources(
            None,
            ScriptedSource::new(SourceKind::Stooq).with("^spx", Scripted::Panic),
            ScriptedSource::new(SourceKind::YahooChart)
                .with("^GSPC", Scripted::Quote(quote(5000.0, 10.0, 0.2))),
        );
        let resolver = FallbackResolver::new(set);

        let q = resolver.resolve(chain_for(InstrumentKey::Sp500).unwrap()).await.unwrap();
        assert_eq!(q.symbol, "^GSPC");
        assert_eq!(stooq.call_count("^spx"), 1);
        assert_eq!(yahoo.call_count("^GSPC"), 1);
    }

    #[tokio::test]
    async fn test_shielded_converts_panic_to_error() {
        async fn crash() -> Result<(), MarketError> {
            std::panic::panic_any("boom")
        }

        assert_eq!(
            shielded(crash()).await,
            Err(MarketError::Unknown("adapter panicked: boom".to_string()))
        );
        assert_eq!(shielded(async { Ok::<_, MarketError>(7) }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_priceless_quote_counts_as_failure() {
        let (set, _, _) = sources(
            Some(ScriptedSource::new(SourceKind::KrxDashboard).with(
                "KOSDAQ",
                Scripted::Quote(SourceQuote {
                    pct: Some(-0.5),
                    ..Default::default()
                }),
            )),
            ScriptedSource::new(SourceKind::Stooq),
            ScriptedSource::new(SourceKind::YahooChart).with("^KQ11", Scripted::Miss),
        );
        let resolver = FallbackResolver::new(set);
        assert!(resolver.resolve(chain_for(InstrumentKey::Kosdaq).unwrap()).await.is_none());
    }
}
