//! # `marketboard-api` - HTTP 接口层
//!
//! 行情看板的 HTTP 服务入口。
//! 使用 `axum` 构建路由，通过 `utoipa` 生成 OpenAPI 3.0 文档并挂载 Swagger UI。
//!
//! ## 架构职责
//! - 暴露 `GET /api/market`，委托 `QuoteEngine` 完成一次聚合
//! - 无论聚合结果如何都返回 200，并按结果设置边缘缓存策略
//! - 未知路径统一返回 JSON 格式的 404

pub mod error;
pub mod routes;
pub mod server;
pub mod types;
