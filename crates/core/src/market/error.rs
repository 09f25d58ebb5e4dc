use thiserror::Error;

/// # Summary
/// 行情域错误枚举，覆盖网络、超时、状态码、解析及配置问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 单个适配器的错误只会导致回退，不会越过标的边界传播。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    // 网络层错误，包含底层 HTTP 客户端错误信息
    #[error("Network error: {0}")]
    Network(String),
    // 请求在超时时间内未完成
    #[error("Timeout: {0}")]
    Timeout(String),
    // 上游返回非 2xx 状态码
    #[error("HTTP {0}")]
    Status(u16),
    // 数据解析错误，如 JSON 结构或页面标记变动
    #[error("Parse error: {0}")]
    Parse(String),
    // 配置或客户端构建错误
    #[error("Config error: {0}")]
    Config(String),
    // 未知或未分类的错误
    #[error("Unknown error: {0}")]
    Unknown(String),
}
