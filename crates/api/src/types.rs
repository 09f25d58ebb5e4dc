//! # DTO 层
//!
//! 行情接口直接输出领域层的 `QuoteEnvelope`，这里只保留错误响应体。

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 失败响应体，仅用于 `/api/market` 以外的路径
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 固定为 false
    pub success: bool,
    /// 错误描述信息
    #[schema(example = "no route for /api/unknown")]
    pub error: String,
}

impl ApiErrorResponse {
    /// 从错误信息构建
    pub fn from_msg(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: msg.into(),
        }
    }
}
