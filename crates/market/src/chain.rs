use marketboard_core::market::entity::InstrumentKey;
use marketboard_core::market::port::SourceKind;

/// # Summary
/// 回退链中的一步。
///
/// # Invariants
/// - `ticker` 是传给数据源的参数，`symbol` 是该步胜出时上报的符号，两者可以不同。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainStep {
    pub source: SourceKind,
    pub ticker: &'static str,
    pub symbol: &'static str,
}

const fn step(source: SourceKind, ticker: &'static str, symbol: &'static str) -> ChainStep {
    ChainStep {
        source,
        ticker,
        symbol,
    }
}

/// # Summary
/// 单个标的的有序回退链。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackChain {
    pub key: InstrumentKey,
    /// 批量接口中对应的 Yahoo 符号
    pub batch_symbol: &'static str,
    pub steps: &'static [ChainStep],
}

impl FallbackChain {
    /// 回退链中是否包含指定数据源
    pub fn uses(&self, source: SourceKind) -> bool {
        self.steps.iter().any(|s| s.source == source)
    }
}

/// # Summary
/// 全部标的的回退表，按看板展示顺序排列。
///
/// # Invariants
/// - 每个 `InstrumentKey` 恰好出现一次。
/// - 链内顺序即尝试顺序，首个成功者胜出。
pub static INSTRUMENT_CHAINS: [FallbackChain; 6] = [
    FallbackChain {
        key: InstrumentKey::Kospi,
        batch_symbol: "^KS11",
        steps: &[
            step(SourceKind::KrxDashboard, "KOSPI", "KOSPI"),
            step(SourceKind::Stooq, "^KOSPI", "^KOSPI"),
        ],
    },
    FallbackChain {
        key: InstrumentKey::Kosdaq,
        batch_symbol: "^KQ11",
        steps: &[
            step(SourceKind::KrxDashboard, "KOSDAQ", "KOSDAQ"),
            step(SourceKind::YahooChart, "^KQ11", "^KQ11"),
        ],
    },
    FallbackChain {
        key: InstrumentKey::Usdkrw,
        batch_symbol: "USDKRW=X",
        steps: &[
            step(SourceKind::Stooq, "usdkrw", "USDKRW"),
            step(SourceKind::YahooChart, "USDKRW=X", "USDKRW=X"),
        ],
    },
    FallbackChain {
        key: InstrumentKey::Dow,
        batch_symbol: "^DJI",
        steps: &[
            step(SourceKind::Stooq, "^dji", "^DJI"),
            step(SourceKind::YahooChart, "^DJI", "^DJI"),
        ],
    },
    FallbackChain {
        key: InstrumentKey::Nasdaq,
        batch_symbol: "^IXIC",
        steps: &[
            step(SourceKind::Stooq, "^ndq", "^NDQ"),
            step(SourceKind::YahooChart, "^IXIC", "^IXIC"),
        ],
    },
    FallbackChain {
        key: InstrumentKey::Sp500,
        batch_symbol: "^GSPC",
        steps: &[
            step(SourceKind::Stooq, "^spx", "^SPX"),
            step(SourceKind::YahooChart, "^GSPC", "^GSPC"),
        ],
    },
];

/// 按标的查找回退链
#[cfg(test)]
pub(crate) fn chain_for(key: InstrumentKey) -> Option<&'static FallbackChain> {
    INSTRUMENT_CHAINS.iter().find(|c| c.key == key)
}
