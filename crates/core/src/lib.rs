//! # `marketboard-core` - 行情看板领域核心
//!
//! 定义行情解析引擎的领域实体、端口契约与公共工具。
//! 本 crate 不发起任何网络请求，具体数据源由 `marketboard-feed` 实现，
//! 回退与聚合逻辑由 `marketboard-market` 实现。

pub mod common;
pub mod config;
pub mod market;

#[cfg(feature = "test-utils")]
pub mod testing;
