//! # API 服务启动器
//!
//! 组装 axum 路由、挂载 Swagger UI、配置 CORS 并绑定 TCP 端口对外提供服务。
//! 本模块不直接启动 `main()`, 而是由 `crates/app` 组装依赖后调用。

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::SwaggerUi;

use marketboard_core::market::entity::{InstrumentKey, Quote, QuoteEnvelope};
use marketboard_core::market::port::QuoteEngine;

use crate::error::{method_not_allowed, not_found};
use crate::routes::market;
use crate::types::ApiErrorResponse;

// ============================================================
//  共享应用状态
// ============================================================

/// 全局应用状态，通过 axum 的 `State` 提取器注入到每个 Handler 中。
///
/// # Invariants
/// - `engine` 在服务启动前注入，生命周期与进程等同；引擎本身不跨请求保存状态。
#[derive(Clone)]
pub struct AppState {
    /// 行情解析引擎
    pub engine: Arc<dyn QuoteEngine>,
}

// ============================================================
//  OpenAPI 文档定义
// ============================================================

/// 全局 OpenAPI 文档结构
#[derive(OpenApi)]
#[openapi(
    info(
        title = "行情看板 API",
        version = "0.1.0",
        description = "首页行情看板的数据接口：韩国指数、美元兑韩元汇率与美国三大指数的实时快照。"
    ),
    components(schemas(QuoteEnvelope, Quote, InstrumentKey, ApiErrorResponse)),
    tags(
        (name = "行情 (Market)", description = "多数据源回退聚合的行情快照")
    )
)]
pub struct ApiDoc;

// ============================================================
//  服务构建与启动
// ============================================================

/// # Summary
/// 构建完整的 axum 应用路由树。
///
/// # Logic
/// 1. 注册行情路由并收集 OpenAPI 文档。
/// 2. 合并 Swagger UI。
/// 3. 设置 404 / 405 兜底与 CORS。
pub fn build_router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(market::get_market))
        .with_state(state)
        .split_for_parts();

    // 看板页面与接口可能不同源
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .layer(cors)
}

/// 构建路由并启动 HTTP 监听，收到 Ctrl-C 后优雅退出。
///
/// # Arguments
/// * `state` - 由外部注入的共享状态
/// * `bind_addr` - 监听的地址与端口，如 `"0.0.0.0:8080"`
pub async fn start_server(
    state: AppState,
    bind_addr: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(state);

    info!("Market API listening on {}", bind_addr);
    info!("Swagger UI: http://{}/swagger-ui/", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Market API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        // 无法监听信号时保持运行，由进程管理器负责终止
        std::future::pending::<()>().await;
    }
}
