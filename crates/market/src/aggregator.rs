use crate::chain::{FallbackChain, INSTRUMENT_CHAINS};
use crate::resolver::{FallbackResolver, SourceSet, shielded};
use async_trait::async_trait;
use futures::future::join_all;
use marketboard_core::common::time::{RealTimeProvider, TimeProvider};
use marketboard_core::market::entity::{InstrumentKey, Quote, QuoteEnvelope};
use marketboard_core::market::error::MarketError;
use marketboard_core::market::port::{
    BatchQuoteSource, DashboardSource, QuoteEngine, QuoteSource, SourceKind,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// # Summary
/// 行情引擎门面：解析全部标的并组装响应信封。
///
/// # Invariants
/// - 不跨请求保存任何状态，每次 `snapshot` 都重新抓取。
/// - 看板页面每次聚合至多抓取一次。
/// - 各标的的回退链在独立任务中并发执行，互不影响。
pub struct QuoteAggregator {
    dashboard: Arc<dyn DashboardSource>,
    stooq: Arc<dyn QuoteSource>,
    yahoo_chart: Arc<dyn QuoteSource>,
    // 启用时先尝试一次批量请求
    batch: Option<Arc<dyn BatchQuoteSource>>,
    clock: Arc<dyn TimeProvider>,
    chains: &'static [FallbackChain],
}

impl QuoteAggregator {
    pub fn new(
        dashboard: Arc<dyn DashboardSource>,
        stooq: Arc<dyn QuoteSource>,
        yahoo_chart: Arc<dyn QuoteSource>,
    ) -> Self {
        Self {
            dashboard,
            stooq,
            yahoo_chart,
            batch: None,
            clock: Arc::new(RealTimeProvider),
            chains: &INSTRUMENT_CHAINS,
        }
    }

    /// 启用批量数据源作为首选路径
    pub fn with_batch(mut self, batch: Arc<dyn BatchQuoteSource>) -> Self {
        self.batch = Some(batch);
        self
    }

    /// 替换时间源（测试时使用固定时钟）
    pub fn with_clock(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    /// # Summary
    /// 通过批量接口一次性解析尽可能多的标的。
    ///
    /// # Logic
    /// 1. 收集全部回退链的批量符号并发起一次请求。
    /// 2. 按符号映射回标的键，无价格的行不计入。
    /// 3. 批量请求失败（含适配器 panic）只记录告警，全部标的交由回退链处理。
    async fn collect_batch(
        &self,
        batch: &dyn BatchQuoteSource,
        items: &mut BTreeMap<InstrumentKey, Quote>,
    ) {
        let symbols: Vec<String> = self
            .chains
            .iter()
            .map(|c| c.batch_symbol.to_string())
            .collect();

        match shielded(batch.fetch_quotes(&symbols)).await {
            Ok(mut rows) => {
                for chain in self.chains {
                    if let Some(q) = rows.remove(chain.batch_symbol)
                        && q.has_price()
                    {
                        items.insert(chain.key, Quote::from_source(chain.batch_symbol, q));
                    }
                }
                info!(
                    "Batch resolved {}/{} instruments",
                    items.len(),
                    self.chains.len()
                );
            }
            Err(e) => {
                warn!(source = %SourceKind::YahooBatch, error = %e, "batch fetch failed, using fallback chains");
            }
        }
    }

    /// # Summary
    /// 执行一次完整聚合。
    ///
    /// # Logic
    /// 1. 若启用批量数据源，先用批量结果填充。
    /// 2. 剩余标的中有依赖看板的，抓取一次看板页面；失败或 panic 时该步骤视为不可用。
    /// 3. 为每个剩余标的生成独立任务执行回退链，等待全部完成。
    /// 4. 收集成功结果，全部失败的标的直接缺席。
    ///
    /// # Returns
    /// 标的到行情的映射。适配器内的失败与 panic 都已在边界吸收，
    /// 只有任务无法汇合（例如运行时关闭导致取消）才返回 `Err`，代表整体聚合失败。
    pub async fn collect(&self) -> Result<BTreeMap<InstrumentKey, Quote>, MarketError> {
        let mut items = BTreeMap::new();

        if let Some(batch) = &self.batch {
            self.collect_batch(batch.as_ref(), &mut items).await;
        }

        let pending: Vec<&'static FallbackChain> = self
            .chains
            .iter()
            .filter(|c| !items.contains_key(&c.key))
            .collect();
        if pending.is_empty() {
            return Ok(items);
        }

        let dashboard = if pending.iter().any(|c| c.uses(SourceKind::KrxDashboard)) {
            match shielded(self.dashboard.fetch_dashboard()).await {
                Ok(page) => Some(page),
                Err(e) => {
                    warn!(source = %SourceKind::KrxDashboard, error = %e, "dashboard fetch failed");
                    None
                }
            }
        } else {
            None
        };

        let resolver = Arc::new(FallbackResolver::new(SourceSet {
            dashboard,
            stooq: self.stooq.clone(),
            yahoo_chart: self.yahoo_chart.clone(),
        }));

        let tasks = pending.into_iter().map(|chain| {
            let resolver = resolver.clone();
            tokio::spawn(async move { (chain.key, resolver.resolve(chain).await) })
        });

        for joined in join_all(tasks).await {
            let (key, resolved) = joined.map_err(|e| MarketError::Unknown(e.to_string()))?;
            if let Some(q) = resolved {
                items.insert(key, q);
            }
        }

        Ok(items)
    }
}

#[async_trait]
impl QuoteEngine for QuoteAggregator {
    /// # Summary
    /// 聚合并组装响应信封。
    ///
    /// # Logic
    /// 1. 调用 `collect`。
    /// 2. 成功时按结果组装信封，`ok` 取决于是否有任一标的成功。
    /// 3. 整体失败时返回带 `error` 的空信封，不向调用方传播错误。
    async fn snapshot(&self) -> QuoteEnvelope {
        match self.collect().await {
            Ok(items) => {
                let missing: Vec<&str> = self
                    .chains
                    .iter()
                    .filter(|c| !items.contains_key(&c.key))
                    .map(|c| c.key.as_str())
                    .collect();
                info!(
                    resolved = items.len(),
                    missing = ?missing,
                    "market snapshot assembled"
                );
                QuoteEnvelope::assemble(items, self.clock.now())
            }
            Err(e) => {
                error!("Market aggregation failed: {}", e);
                QuoteEnvelope::failed(e.to_string(), self.clock.now())
            }
        }
    }
}
