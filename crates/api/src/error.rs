//! # API 统一错误处理
//!
//! 路由层面的错误映射为 HTTP 状态码与 JSON 响应体。
//! `/api/market` 本身从不产生 `ApiError`，聚合失败以软错误信封返回。

use axum::Json;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::types::ApiErrorResponse;

/// API 层统一错误枚举
#[derive(Error, Debug)]
pub enum ApiError {
    /// 资源未找到 (404)
    #[error("资源未找到: {0}")]
    NotFound(String),

    /// 路径存在但方法不支持 (405)
    #[error("方法不支持: {0}")]
    MethodNotAllowed(String),
}

/// 将 `ApiError` 转换为 axum 的 HTTP 响应
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        };

        let body = Json(ApiErrorResponse::from_msg(self.to_string()));
        (status, body).into_response()
    }
}

/// 未匹配任何路由时的兜底处理
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}

/// 路径匹配但方法不匹配时的兜底处理
pub async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::MethodNotAllowed(format!("{} {}", method, uri.path()))
}
