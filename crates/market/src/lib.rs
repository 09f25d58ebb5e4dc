//! # `marketboard-market` - 行情解析引擎
//!
//! - [`chain`]: 每个标的的数据源回退顺序（全仓唯一的一份回退表）
//! - [`resolver`]: 按回退顺序依次尝试数据源，首个成功者胜出
//! - [`aggregator`]: 引擎门面，并发解析全部标的并组装响应信封

pub mod aggregator;
pub mod chain;
pub mod resolver;
