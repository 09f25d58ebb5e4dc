use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use marketboard_core::market::entity::QuoteEnvelope;
use serde_json::json;
use tracing::error;

use crate::server::AppState;

/// 成功信封允许边缘缓存 30 秒，并在 120 秒内后台刷新
pub const CACHE_CONTROL_OK: &str = "public, max-age=0, s-maxage=30, stale-while-revalidate=120";
/// 失败信封禁止缓存
pub const CACHE_CONTROL_FAILED: &str = "no-store";
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

/// 获取行情看板快照
///
/// 每次请求都实时聚合全部标的。未解析成功的标的不出现在 `items` 中；
/// 即使全部失败也返回 200，由 `ok` 字段表达结果。
#[utoipa::path(
    get,
    path = "/api/market",
    tag = "行情 (Market)",
    responses(
        (
            status = 200,
            description = "行情快照（可能为部分结果或空结果）",
            body = QuoteEnvelope,
            content_type = "application/json",
            headers(
                ("Cache-Control" = String, description = "ok=true 时允许边缘缓存，ok=false 时为 no-store")
            )
        )
    )
)]
pub async fn get_market(State(state): State<AppState>) -> Response {
    let envelope = state.engine.snapshot().await;
    envelope_response(&envelope)
}

/// # Summary
/// 将信封序列化为响应。
///
/// # Logic
/// 1. 按 `ok` 选择缓存策略。
/// 2. 手动序列化以携带 `charset=utf-8` 的 Content-Type。
/// 3. 序列化失败时退化为不可缓存的软错误信封，状态码仍为 200。
pub(crate) fn envelope_response(envelope: &QuoteEnvelope) -> Response {
    let (body, cache_control) = match serde_json::to_string(envelope) {
        Ok(body) => {
            let cache = if envelope.ok {
                CACHE_CONTROL_OK
            } else {
                CACHE_CONTROL_FAILED
            };
            (body, cache)
        }
        Err(e) => {
            error!("Failed to serialize market envelope: {}", e);
            let fallback = json!({
                "ok": false,
                "updated_at": envelope.updated_at,
                "items": {},
                "error": e.to_string(),
            });
            (fallback.to_string(), CACHE_CONTROL_FAILED)
        }
    };

    (
        [
            (header::CONTENT_TYPE, CONTENT_TYPE_JSON),
            (header::CACHE_CONTROL, cache_control),
        ],
        body,
    )
        .into_response()
}
