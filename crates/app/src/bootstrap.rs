use std::sync::Arc;

use marketboard_core::config::{AppConfig, LogConfig};
use marketboard_core::market::error::MarketError;
use marketboard_core::market::port::QuoteEngine;
use marketboard_feed::http::{FetchPolicy, HttpFetcher};
use marketboard_feed::krx::KrxDashboardAdapter;
use marketboard_feed::stooq::StooqAdapter;
use marketboard_feed::yahoo::{YahooBatchAdapter, YahooChartAdapter};
use marketboard_market::aggregator::QuoteAggregator;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// # Summary
/// 初始化全局日志。
///
/// # Logic
/// 1. `RUST_LOG` 优先，否则使用配置中的级别。
/// 2. 终端输出写到 stderr，保持 stdout 只输出快照 JSON。
/// 3. 配置了 `log.dir` 时额外写入按日滚动的文件。
///
/// # Returns
/// 文件写入器的守卫，必须在进程生命周期内持有，否则缓冲中的日志会丢失。
pub fn init_logging(config: &LogConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_layer, guard) = match &config.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "marketboard.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();
    if let Err(e) = result {
        eprintln!("logging already initialised: {}", e);
    }

    guard
}

/// # Summary
/// 依赖装配：实例化全部适配器并注入引擎。
///
/// # Logic
/// 1. 按 `[fetch]` 构建共享的 HTTP 抓取器。
/// 2. 按 `[sources]` 实例化各适配器（App 层知道具体实现，引擎只认端口）。
/// 3. 启用批量接口时挂载批量数据源。
///
/// # Returns
/// 成功返回引擎，抓取器构建失败返回 `MarketError::Config`。
pub fn build_engine(config: &AppConfig) -> Result<Arc<dyn QuoteEngine>, MarketError> {
    let fetcher = HttpFetcher::new(FetchPolicy::from_config(&config.fetch))?;
    let sources = &config.sources;

    let dashboard = Arc::new(KrxDashboardAdapter::new(
        fetcher.clone(),
        &sources.krx_dashboard_url,
    ));
    let stooq = Arc::new(StooqAdapter::new(fetcher.clone(), &sources.stooq_base_url));
    let yahoo_chart = Arc::new(YahooChartAdapter::new(
        fetcher.clone(),
        &sources.yahoo_chart_base_url,
    ));

    let mut aggregator = QuoteAggregator::new(dashboard, stooq, yahoo_chart);
    if sources.yahoo_batch_enabled {
        aggregator = aggregator.with_batch(Arc::new(YahooBatchAdapter::new(
            fetcher,
            &sources.yahoo_quote_base_url,
        )));
    }

    info!(
        timeout_ms = config.fetch.timeout_ms,
        batch = sources.yahoo_batch_enabled,
        "Quote engine initialized"
    );
    Ok(Arc::new(aggregator))
}
