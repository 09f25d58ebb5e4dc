use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use std::sync::RwLock;

/// # Summary
/// 时间供给器接口，隔离物理系统时钟。
/// 信封的 `updated_at` 必须通过此接口获取，便于测试中固定时间。
pub trait TimeProvider: Send + Sync {
    /// 获取当前时间
    fn now(&self) -> DateTime<Utc>;
}

/// # Summary
/// 生产环境使用的真实时钟，直接返回操作系统当前时间。
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// # Summary
/// 测试专用的固定时钟，允许主动拨动时间。
///
/// # Invariants
/// - 并发安全：内部利用 `RwLock` 保护当前时间。
pub struct FakeClockProvider {
    current_time: RwLock<DateTime<Utc>>,
}

impl FakeClockProvider {
    /// 使用指定的初始时间创建固定时钟
    pub fn new(initial_time: DateTime<Utc>) -> Self {
        Self {
            current_time: RwLock::new(initial_time),
        }
    }

    /// 强制修改时钟的当前时间
    pub fn set_time(&self, new_time: DateTime<Utc>) {
        let mut time = self
            .current_time
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *time = new_time;
    }
}

impl TimeProvider for FakeClockProvider {
    fn now(&self) -> DateTime<Utc> {
        *self
            .current_time
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// # Summary
/// 将时间格式化为毫秒精度、`Z` 结尾的 ISO-8601 字符串。
///
/// # Returns
/// 形如 `2024-05-01T06:30:00.000Z` 的字符串。
pub fn format_iso(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// # Summary
/// 将 Unix 秒级时间戳转换为 ISO-8601 字符串。
///
/// # Logic
/// 1. 非正数时间戳视为缺失（数据源用 0 表示未知）。
/// 2. 超出 chrono 可表示范围时返回 None。
pub fn unix_to_iso(secs: i64) -> Option<String> {
    if secs <= 0 {
        return None;
    }
    Utc.timestamp_opt(secs, 0).single().map(format_iso)
}
