use marketboard_core::config::FetchConfig;
use marketboard_core::market::error::MarketError;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const ACCEPT_TEXT: &str = "text/html,application/json,text/plain,*/*";
const ACCEPT_JSON: &str = "application/json,text/plain,*/*";

/// # Summary
/// 出站请求策略，注入到每个适配器。
///
/// # Invariants
/// - `retries` 默认为 0：每个适配器每次请求只抓取一次。
/// - 超时与 HTTP 错误同样处理，均触发回退。
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// 单次请求超时
    pub timeout: Duration,
    /// 传输失败后的额外重试次数
    pub retries: u32,
    /// 固定的 User-Agent，降低被识别为爬虫的概率
    pub user_agent: String,
    /// 固定的 Accept-Language
    pub accept_language: String,
}

impl FetchPolicy {
    /// 由配置构建策略，重试次数固定为 0
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            retries: 0,
            user_agent: config.user_agent.clone(),
            accept_language: config.accept_language.clone(),
        }
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

/// # Summary
/// 所有适配器共享的 HTTP 抓取器。
///
/// # Invariants
/// - 内部仅持有一个 `reqwest::Client`，克隆开销为引用计数。
/// - 非 2xx 状态码一律转换为 `MarketError::Status`。
#[derive(Clone)]
pub struct HttpFetcher {
    /// 内部使用的 HTTP 客户端
    client: Client,
    /// 注入的请求策略
    policy: Arc<FetchPolicy>,
}

impl HttpFetcher {
    /// # Summary
    /// 根据策略创建抓取器。
    ///
    /// # Logic
    /// 1. 确保进程内已安装 rustls 加密后端。
    /// 2. 设置默认 Header (User-Agent、Accept-Language)。
    /// 3. 配置单次请求超时并构建客户端。
    ///
    /// # Arguments
    /// * `policy`: 请求策略。
    ///
    /// # Returns
    /// 成功返回抓取器，Header 非法或客户端构建失败返回 `MarketError::Config`。
    pub fn new(policy: FetchPolicy) -> Result<Self, MarketError> {
        ensure_crypto_provider();

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&policy.user_agent)
                .map_err(|e| MarketError::Config(format!("user_agent: {}", e)))?,
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&policy.accept_language)
                .map_err(|e| MarketError::Config(format!("accept_language: {}", e)))?,
        );

        let client = Client::builder()
            .timeout(policy.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| MarketError::Config(e.to_string()))?;

        Ok(Self {
            client,
            policy: Arc::new(policy),
        })
    }

    /// # Summary
    /// 以 HTML/文本方式抓取页面。
    ///
    /// # Returns
    /// 成功返回响应体文本。
    pub async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, MarketError> {
        let resp = self.send(url, query, ACCEPT_TEXT).await?;
        resp.text().await.map_err(map_transport)
    }

    /// # Summary
    /// 以 JSON 方式抓取并反序列化。
    ///
    /// # Returns
    /// 成功返回反序列化后的结构，结构不匹配返回 `MarketError::Parse`。
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MarketError> {
        let resp = self.send(url, query, ACCEPT_JSON).await?;
        resp.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                MarketError::Timeout(e.to_string())
            } else {
                MarketError::Parse(e.to_string())
            }
        })
    }

    /// # Summary
    /// 发起 GET 请求并校验状态码。
    ///
    /// # Logic
    /// 1. 最多尝试 `1 + retries` 次，仅对传输层错误重试。
    /// 2. 非 2xx 状态码立即返回，不重试。
    async fn send(
        &self,
        url: &str,
        query: &[(&str, &str)],
        accept: &'static str,
    ) -> Result<Response, MarketError> {
        let mut attempt = 0;
        loop {
            debug!(url, attempt, "GET");
            let result = self
                .client
                .get(url)
                .query(query)
                .header(ACCEPT, accept)
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => return Err(MarketError::Status(resp.status().as_u16())),
                Err(e) if attempt < self.policy.retries => {
                    warn!(url, attempt, error = %e, "transport error, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(map_transport(e)),
            }
        }
    }
}

fn map_transport(e: reqwest::Error) -> MarketError {
    if e.is_timeout() {
        MarketError::Timeout(e.to_string())
    } else {
        MarketError::Network(e.to_string())
    }
}

/// reqwest 以 `rustls-no-provider` 构建，需要进程级的加密后端
fn ensure_crypto_provider() {
    if rustls::crypto::CryptoProvider::get_default().is_some() {
        return;
    }
    // 并发安装时另一方已成功即可
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_from_config() {
        let config = FetchConfig {
            timeout_ms: 2500,
            user_agent: "ua/1.0".to_string(),
            accept_language: "ko".to_string(),
        };
        let policy = FetchPolicy::from_config(&config);
        assert_eq!(policy.timeout, Duration::from_millis(2500));
        assert_eq!(policy.retries, 0);
        assert_eq!(policy.user_agent, "ua/1.0");
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let policy = FetchPolicy {
            user_agent: "bad\nagent".to_string(),
            ..FetchPolicy::default()
        };
        assert!(matches!(HttpFetcher::new(policy), Err(MarketError::Config(_))));
    }
}
