use crate::common::number::{derive_absolute_change, derive_percent_change};
use crate::common::time::format_iso;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// # Summary
/// 看板展示的逻辑行情标的键。
///
/// # Invariants
/// - 序列化形式为小写字符串 (`kospi`, `usdkrw`, `sp500` ...)，即响应中 `items` 的键。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKey {
    // 韩国综合股价指数
    Kospi,
    // 韩国创业板指数
    Kosdaq,
    // 美元兑韩元汇率
    Usdkrw,
    // 道琼斯工业平均指数
    Dow,
    // 纳斯达克综合指数
    Nasdaq,
    // 标普 500 指数
    Sp500,
}

impl InstrumentKey {
    /// 全部标的，按看板展示顺序排列
    #[cfg(any(test, feature = "test-utils"))]
    pub const ALL: [InstrumentKey; 6] = [
        InstrumentKey::Kospi,
        InstrumentKey::Kosdaq,
        InstrumentKey::Usdkrw,
        InstrumentKey::Dow,
        InstrumentKey::Nasdaq,
        InstrumentKey::Sp500,
    ];

    /// 返回序列化时使用的小写键名
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentKey::Kospi => "kospi",
            InstrumentKey::Kosdaq => "kosdaq",
            InstrumentKey::Usdkrw => "usdkrw",
            InstrumentKey::Dow => "dow",
            InstrumentKey::Nasdaq => "nasdaq",
            InstrumentKey::Sp500 => "sp500",
        }
    }
}

impl std::fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// # Summary
/// 单个数据源适配器解析出的部分行情，尚未附带上报符号。
///
/// # Invariants
/// - KRX / Stooq 适配器的 `time` 恒为 None。
/// - 经 [`SourceQuote::normalize`] 处理后，`change` 与 `pct` 同号。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceQuote {
    // 最新价
    pub price: Option<f64>,
    // 相对前收盘的绝对涨跌额
    pub change: Option<f64>,
    // 百分比涨跌幅
    pub pct: Option<f64>,
    // 观测时间 (ISO-8601)
    pub time: Option<String>,
}

impl SourceQuote {
    /// # Summary
    /// 补全缺失的涨跌字段。
    ///
    /// # Logic
    /// 1. 仅有 `pct` 时，由 `price` 与 `pct` 反推 `change`。
    /// 2. 仅有 `change` 时，由 `price` 与 `change` 反推 `pct`。
    /// 3. 两者皆有或皆无时保持原样。
    ///
    /// # Returns
    /// 返回补全后的行情。
    pub fn normalize(mut self) -> Self {
        match (self.change, self.pct) {
            (None, Some(_)) => self.change = derive_absolute_change(self.price, self.pct),
            (Some(_), None) => self.pct = derive_percent_change(self.price, self.change),
            _ => {}
        }
        self
    }

    /// 是否可作为成功结果（必须有最新价）
    pub fn has_price(&self) -> bool {
        self.price.is_some()
    }
}

/// # Summary
/// 规范化后的行情单元，即响应中 `items` 的值。
///
/// # Invariants
/// - `symbol` 为胜出数据源所使用的符号，不强制统一拼写。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Quote {
    /// 胜出数据源上报的符号
    #[schema(example = "KOSPI")]
    pub symbol: String,
    /// 最新价
    #[schema(example = 2615.32)]
    pub price: Option<f64>,
    /// 绝对涨跌额
    #[schema(example = 27.17)]
    pub change: Option<f64>,
    /// 百分比涨跌幅
    #[schema(example = 1.05)]
    pub pct: Option<f64>,
    /// 观测时间 (ISO-8601)，数据源未提供时为 null
    pub time: Option<String>,
}

impl Quote {
    /// 为适配器输出附加上报符号
    pub fn from_source(symbol: impl Into<String>, source: SourceQuote) -> Self {
        Self {
            symbol: symbol.into(),
            price: source.price,
            change: source.change,
            pct: source.pct,
            time: source.time,
        }
    }
}

/// # Summary
/// `/api/market` 的响应信封。
///
/// # Invariants
/// - `ok` 当且仅当 `items` 非空。
/// - 未解析成功的标的不出现在 `items` 中，绝不以 null 值占位。
/// - `error` 仅在整体聚合失败时出现，此时 `items` 为空。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuoteEnvelope {
    /// 是否至少有一个标的解析成功
    pub ok: bool,
    /// 信封组装时间 (ISO-8601)
    #[schema(example = "2024-05-01T06:30:00.000Z")]
    pub updated_at: String,
    /// 标的键到行情的映射
    #[schema(value_type = Object)]
    pub items: BTreeMap<InstrumentKey, Quote>,
    /// 整体聚合失败时的错误描述
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QuoteEnvelope {
    /// # Summary
    /// 由已解析的行情组装信封。
    ///
    /// # Logic
    /// 1. `ok` 取决于 `items` 是否非空。
    /// 2. `updated_at` 取信封组装时刻，而非单条行情时间。
    pub fn assemble(items: BTreeMap<InstrumentKey, Quote>, updated_at: DateTime<Utc>) -> Self {
        Self {
            ok: !items.is_empty(),
            updated_at: format_iso(updated_at),
            items,
            error: None,
        }
    }

    /// 构建整体聚合失败的软错误信封
    pub fn failed(error: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            ok: false,
            updated_at: format_iso(updated_at),
            items: BTreeMap::new(),
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 6, 30, 0).unwrap()
    }

    #[test]
    fn test_instrument_key_round_trip_names() {
        for key in InstrumentKey::ALL {
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.as_str()));
            assert_eq!(serde_json::from_str::<InstrumentKey>(&json).unwrap(), key);
        }
        assert!(serde_json::from_str::<InstrumentKey>("\"ftse\"").is_err());
    }

    #[test]
    fn test_normalize_derives_change_from_pct() {
        let q = SourceQuote {
            price: Some(2615.32),
            change: None,
            pct: Some(1.05),
            time: None,
        }
        .normalize();
        let change = q.change.unwrap();
        assert!((change - 27.17).abs() < 0.01);
        assert_eq!(q.pct, Some(1.05));
    }

    #[test]
    fn test_normalize_derives_pct_from_change() {
        let q = SourceQuote {
            price: Some(98.0),
            change: Some(-2.0),
            pct: None,
            time: None,
        }
        .normalize();
        assert!((q.pct.unwrap() - (-2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_keeps_reported_fields() {
        let q = SourceQuote {
            price: Some(4309.63),
            change: Some(95.46),
            pct: Some(2.27),
            time: None,
        };
        assert_eq!(q.clone().normalize(), q);
    }

    #[test]
    fn test_envelope_ok_follows_items() {
        let empty = QuoteEnvelope::assemble(BTreeMap::new(), fixed_time());
        assert!(!empty.ok);
        assert!(empty.error.is_none());

        let mut items = BTreeMap::new();
        items.insert(
            InstrumentKey::Dow,
            Quote::from_source("^DJI", SourceQuote {
                price: Some(39000.5),
                ..Default::default()
            }),
        );
        let envelope = QuoteEnvelope::assemble(items, fixed_time());
        assert!(envelope.ok);
        assert_eq!(envelope.updated_at, "2024-05-01T06:30:00.000Z");
    }

    #[test]
    fn test_envelope_serialization_shape() {
        let mut items = BTreeMap::new();
        items.insert(
            InstrumentKey::Sp500,
            Quote::from_source("^SPX", SourceQuote {
                price: Some(5000.0),
                change: Some(10.0),
                pct: Some(0.2),
                time: None,
            }),
        );
        let value = serde_json::to_value(QuoteEnvelope::assemble(items, fixed_time())).unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(value["items"]["sp500"]["symbol"], "^SPX");
        assert!(value["items"]["sp500"]["time"].is_null());
        assert!(value.get("error").is_none());

        let failed = serde_json::to_value(QuoteEnvelope::failed("boom", fixed_time())).unwrap();
        assert_eq!(failed["ok"], false);
        assert_eq!(failed["error"], "boom");
        assert_eq!(failed["items"], serde_json::json!({}));
    }
}
