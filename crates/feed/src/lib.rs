//! # `marketboard-feed` - 上游行情源适配器
//!
//! 每个适配器只负责"一次抓取 + 一次解析"，不重试、不回退。
//! 回退顺序与聚合由 `marketboard-market` 决定。
//!
//! ## 数据源
//! - [`krx`]: KRX 市场概览 HTML 页面，一次抓取可提取多个指数
//! - [`stooq`]: Stooq 单标的报价页
//! - [`yahoo`]: Yahoo Finance chart JSON（单标的）与 quote JSON（批量）

pub mod http;
pub mod krx;
pub mod parser;
pub mod stooq;
pub mod yahoo;
