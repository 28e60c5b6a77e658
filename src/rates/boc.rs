use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use select::document::Document;
use select::node::Node;
use select::predicate::{Name, Or};
use tracing::debug;

use super::{PriceKind, Rate, RateQuery, RateSource};
use crate::error::RateError;

/// Bank of China publishes prices per 100 units of foreign currency.
const QUOTE_UNIT: f64 = 100.0;

const USER_AGENT: &str = concat!("fxbot/", env!("CARGO_PKG_VERSION"));

/// Reads the Bank of China foreign exchange quotation page.
pub struct BocRateSource {
    client: reqwest::Client,
    url: String,
}

impl BocRateSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RateError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl RateSource for BocRateSource {
    async fn lookup_rate(&self, query: &RateQuery) -> Result<Rate, RateError> {
        debug!("Fetching BOC quotation page: {}", self.url);

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RateError::Status(status));
        }
        let body = response.text().await?;

        parse_quote(&body, query)
    }
}

fn column(kind: PriceKind) -> usize {
    match kind {
        PriceKind::SpotBuy => 1,
        PriceKind::CashBuy => 2,
        PriceKind::SpotSell => 3,
        PriceKind::CashSell => 4,
        PriceKind::Middle => 5,
    }
}

fn row_cells(row: Node) -> Vec<String> {
    row.find(Or(Name("td"), Name("th")))
        .map(|cell| cell.text().replace('\u{a0}', " ").trim().to_string())
        .collect()
}

fn parse_published(cells: &[String]) -> Option<NaiveDateTime> {
    // Date and time are either one cell or split across two
    let stamp = cells.get(6..)?.join(" ");
    let stamp = stamp.trim();
    ["%Y.%m.%d %H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(stamp, fmt).ok())
}

/// Extract one quote from the quotation table HTML.
pub fn parse_quote(html: &str, query: &RateQuery) -> Result<Rate, RateError> {
    let name = query.currency.chinese_name();

    let document = Document::from(html);
    let cells = document
        .find(Name("tr"))
        .map(row_cells)
        .find(|cells| cells.first().is_some_and(|first| first == name))
        .ok_or_else(|| RateError::NotQuoted(query.currency.to_string()))?;

    let raw = cells
        .get(column(query.kind))
        .map(String::as_str)
        .unwrap_or_default();
    if raw.is_empty() {
        return Err(RateError::NotQuoted(format!(
            "{} ({})",
            query.currency,
            query.kind.label()
        )));
    }

    let per_hundred: f64 = raw
        .parse()
        .map_err(|_| RateError::Malformed(format!("{} price {raw:?}", query.currency)))?;

    Ok(Rate {
        value: per_hundred / QUOTE_UNIT,
        published_at: parse_published(&cells),
    })
}
