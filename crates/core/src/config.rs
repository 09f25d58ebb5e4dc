use serde::{Deserialize, Serialize};
use std::path::Path;

/// 环境变量覆盖前缀，例如 `MARKETBOARD__SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "MARKETBOARD";

/// 全局应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub fetch: FetchConfig,
    pub sources: SourcesConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 出站请求策略，注入到每个源适配器
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// 单次请求超时 (毫秒)
    pub timeout_ms: u64,
    pub user_agent: String,
    pub accept_language: String,
}

/// 上游数据源地址，测试中可指向本地桩服务
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub krx_dashboard_url: String,
    pub stooq_base_url: String,
    pub yahoo_chart_base_url: String,
    pub yahoo_quote_base_url: String,
    /// 是否先走 Yahoo 批量接口
    pub yahoo_batch_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// 未设置 RUST_LOG 时使用的过滤级别
    pub level: String,
    /// 按日滚动的日志文件目录，未设置时只输出到终端
    pub dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 4000,
            user_agent: "Mozilla/5.0 (compatible; JooLabBigData/1.0)".to_string(),
            accept_language: "en-US,en;q=0.9,ko;q=0.8".to_string(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            krx_dashboard_url: "https://data.krx.co.kr/contents/MDC/MAIN/main/index.cmd?locale=en"
                .to_string(),
            stooq_base_url: "https://stooq.com".to_string(),
            yahoo_chart_base_url: "https://query1.finance.yahoo.com".to_string(),
            yahoo_quote_base_url: "https://query1.finance.yahoo.com".to_string(),
            yahoo_batch_enabled: false,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

impl AppConfig {
    /// # Summary
    /// 按 默认值 → 配置文件 → 环境变量 的顺序加载配置。
    ///
    /// # Logic
    /// 1. 以 `AppConfig::default()` 作为最底层来源。
    /// 2. 叠加 TOML 文件（文件不存在时跳过）。
    /// 3. 叠加带 `MARKETBOARD` 前缀、`__` 分隔的环境变量。
    ///
    /// # Arguments
    /// * `path`: 配置文件路径。
    ///
    /// # Returns
    /// 成功返回合并后的配置。
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&AppConfig::default())?;
        let builder = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}
