//! Read-only views over the catalog.

use crate::catalog::{Catalog, MenuItem};
use crate::error::PosResult;
use chrono::NaiveDate;

/// Sales for one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub units: u64,
    pub revenue: u64,
}

/// `(name, stock)` in catalog order
pub fn stock_report(catalog: &Catalog) -> Vec<(&str, u64)> {
    catalog
        .items()
        .iter()
        .map(|m| (m.name.as_str(), m.stock))
        .collect()
}

pub fn price_of(catalog: &Catalog, name: &str) -> PosResult<u64> {
    catalog.find_by_name(name).map(|m| m.price)
}

/// `(name, total_sales)` in catalog order
pub fn sales_history(catalog: &Catalog) -> Vec<(&str, u64)> {
    catalog
        .items()
        .iter()
        .map(|m| (m.name.as_str(), m.total_sales))
        .collect()
}

pub fn best_seller(catalog: &Catalog) -> Option<&MenuItem> {
    catalog.best_seller()
}

/// Units and revenue recorded on `today`
pub fn daily_total(catalog: &Catalog, today: NaiveDate) -> DailySummary {
    let tally = catalog.daily().get(&today).copied().unwrap_or_default();
    DailySummary {
        date: today,
        units: tally.units,
        revenue: tally.revenue,
    }
}

/// Sum of every item's cumulative sales counter
pub fn lifetime_units(catalog: &Catalog) -> u64 {
    catalog
        .items()
        .iter()
        .map(|m| m.total_sales)
        .fold(0, u64::saturating_add)
}
