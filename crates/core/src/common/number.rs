/// # Summary
/// 解析带千分位分隔符的数字字符串。
///
/// # Logic
/// 1. 去除所有 `,` 分隔符并裁剪首尾空白。
/// 2. 按 `f64` 解析，允许前导 `+`/`-` 号。
/// 3. 空串、非数字以及非有限值 (inf / NaN) 一律视为缺失。
///
/// # Arguments
/// * `raw`: 原始数字文本，例如 `"2,615.32"`、`"+1.05"`。
///
/// # Returns
/// 解析成功返回数值，否则返回 None（从不 panic）。
pub fn parse_locale_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// # Summary
/// 由涨跌幅反推绝对涨跌额。
///
/// # Logic
/// 1. 基准价 = `price / (1 + pct / 100)`。
/// 2. 涨跌额 = `price - 基准价`。
/// 3. `1 + pct / 100 == 0`（即 -100%）时无法表示，返回 None。
///
/// # Arguments
/// * `price`: 变动后的最新价。
/// * `pct`: 百分比涨跌幅，单位为百分点 (例如 `2.27`)。
///
/// # Returns
/// 任一入参缺失或除数为零时返回 None。
pub fn derive_absolute_change(price: Option<f64>, pct: Option<f64>) -> Option<f64> {
    let (price, pct) = (price?, pct?);
    let ratio = 1.0 + pct / 100.0;
    if ratio == 0.0 {
        return None;
    }
    let reference = price / ratio;
    Some(price - reference).filter(|v| v.is_finite())
}

/// # Summary
/// 由绝对涨跌额反推百分比涨跌幅，与 [`derive_absolute_change`] 对称。
///
/// # Logic
/// 1. 基准价 = `price - change`。
/// 2. 涨跌幅 = `change / 基准价 * 100`，基准价为零时返回 None。
pub fn derive_percent_change(price: Option<f64>, change: Option<f64>) -> Option<f64> {
    let (price, change) = (price?, change?);
    let reference = price - change;
    if reference == 0.0 {
        return None;
    }
    Some(change / reference * 100.0).filter(|v| v.is_finite())
}
