pub mod boc;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::RateError;

pub use boc::BocRateSource;

/// Foreign currencies quoted against CNY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Jpy,
    Hkd,
}

impl Currency {
    pub const ALL: [Currency; 5] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Jpy,
        Currency::Hkd,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
            Currency::Hkd => "HKD",
        }
    }

    /// Name used in Chinese quotation tables and replies.
    pub fn chinese_name(self) -> &'static str {
        match self {
            Currency::Usd => "美元",
            Currency::Eur => "欧元",
            Currency::Gbp => "英镑",
            Currency::Jpy => "日元",
            Currency::Hkd => "港币",
        }
    }

    /// Case-insensitive lookup by ISO code.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(code))
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Which of the bank's published prices to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceKind {
    SpotBuy,
    CashBuy,
    SpotSell,
    CashSell,
    Middle,
}

impl PriceKind {
    pub fn label(self) -> &'static str {
        match self {
            PriceKind::SpotBuy => "现汇买入价",
            PriceKind::CashBuy => "现钞买入价",
            PriceKind::SpotSell => "现汇卖出价",
            PriceKind::CashSell => "现钞卖出价",
            PriceKind::Middle => "中行折算价",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateQuery {
    pub currency: Currency,
    pub kind: PriceKind,
}

impl RateQuery {
    pub fn spot_sell(currency: Currency) -> Self {
        Self {
            currency,
            kind: PriceKind::SpotSell,
        }
    }
}

/// A quote in CNY per one unit of the foreign currency.
#[derive(Debug, Clone, PartialEq)]
pub struct Rate {
    pub value: f64,
    pub published_at: Option<NaiveDateTime>,
}

/// Anything that can answer "how many CNY for one unit of X right now".
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn lookup_rate(&self, query: &RateQuery) -> Result<Rate, RateError>;
}
