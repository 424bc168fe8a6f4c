//! Catalog store: the café's menu items and their price/stock/sales state.
//!
//! The catalog is the only owner of menu items. Orders refer to items by
//! name and every stock or sales mutation goes through [`Catalog::record_sale`],
//! so changes are visible to reports immediately.

use crate::error::{PosError, PosResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single menu entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MenuItem {
    pub name: String,
    pub price: u64,
    pub stock: u64,
    #[serde(default)]
    pub total_sales: u64,
}

impl MenuItem {
    pub fn new(name: &str, price: u64, stock: u64) -> Self {
        Self {
            name: name.to_string(),
            price,
            stock,
            total_sales: 0,
        }
    }
}

/// Units and revenue sold on one calendar day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DailyTally {
    pub units: u64,
    pub revenue: u64,
}

/// Ordered collection of menu items plus per-day sales tallies
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    items: Vec<MenuItem>,
    daily: BTreeMap<NaiveDate, DailyTally>,
}

impl Catalog {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self {
            items,
            daily: BTreeMap::new(),
        }
    }

    pub fn with_daily(items: Vec<MenuItem>, daily: BTreeMap<NaiveDate, DailyTally>) -> Self {
        Self { items, daily }
    }

    /// First-run menu
    pub fn with_defaults() -> Self {
        Self::new(vec![
            MenuItem::new("Es Teh", 3, 30),
            MenuItem::new("Espresso", 10, 20),
            MenuItem::new("Americano", 12, 15),
            MenuItem::new("Latte", 18, 10),
        ])
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn daily(&self) -> &BTreeMap<NaiveDate, DailyTally> {
        &self.daily
    }

    pub fn find_by_name(&self, name: &str) -> PosResult<&MenuItem> {
        self.items
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| PosError::NotFound(name.to_string()))
    }

    fn find_mut(&mut self, name: &str) -> PosResult<&mut MenuItem> {
        self.items
            .iter_mut()
            .find(|m| m.name == name)
            .ok_or_else(|| PosError::NotFound(name.to_string()))
    }

    /// Append a new item built from operator input
    pub fn add(&mut self, name: &str, price: i64, stock: i64) -> PosResult<&MenuItem> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PosError::InvalidName);
        }
        if self.items.iter().any(|m| m.name == name) {
            return Err(PosError::DuplicateName(name.to_string()));
        }
        let price = non_negative(price, "price must not be negative")?;
        let stock = non_negative(stock, "stock must not be negative")?;

        self.items.push(MenuItem::new(name, price, stock));
        Ok(&self.items[self.items.len() - 1])
    }

    /// Remove an item. Past daily tallies are kept.
    pub fn remove(&mut self, name: &str) -> PosResult<MenuItem> {
        let pos = self
            .items
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| PosError::NotFound(name.to_string()))?;
        Ok(self.items.remove(pos))
    }

    /// Increase stock; returns the new stock level
    pub fn add_stock(&mut self, name: &str, amount: i64) -> PosResult<u64> {
        let added = non_negative(amount, "restock amount must not be negative")?;
        let item = self.find_mut(name)?;
        item.stock = item
            .stock
            .checked_add(added)
            .ok_or_else(|| PosError::invalid_amount(amount, "stock would overflow"))?;
        Ok(item.stock)
    }

    /// Item with the highest total sales; ties go to the earliest entry.
    pub fn best_seller(&self) -> Option<&MenuItem> {
        let mut best: Option<&MenuItem> = None;
        for item in &self.items {
            match best {
                Some(b) if item.total_sales <= b.total_sales => {}
                _ => best = Some(item),
            }
        }
        best
    }

    /// Commit a sale of `quantity` units: checks stock and counter overflow,
    /// then decrements stock, bumps the item's sales counter and today's
    /// tally together. Returns the unit price charged.
    pub fn record_sale(&mut self, name: &str, quantity: i64, today: NaiveDate) -> PosResult<u64> {
        let quantity = non_negative(quantity, "quantity must not be negative")?;
        let item = self.find_mut(name)?;
        if quantity > item.stock {
            return Err(PosError::invalid_amount(
                quantity as i64,
                format!("only {} {} left in stock", item.stock, item.name),
            ));
        }

        let price = item.price;
        let total_sales = item.total_sales.checked_add(quantity);
        let tally = self.daily.get(&today).copied().unwrap_or_default();
        let (Some(total_sales), Some(units), Some(revenue)) = (
            total_sales,
            tally.units.checked_add(quantity),
            price
                .checked_mul(quantity)
                .and_then(|r| tally.revenue.checked_add(r)),
        ) else {
            return Err(PosError::invalid_amount(
                quantity as i64,
                "sales figures would overflow",
            ));
        };

        let item = self.find_mut(name)?;
        item.stock -= quantity;
        item.total_sales = total_sales;
        self.daily.insert(
            today,
            DailyTally {
                units,
                revenue,
            },
        );

        Ok(price)
    }
}

fn non_negative(amount: i64, reason: &str) -> PosResult<u64> {
    u64::try_from(amount).map_err(|_| PosError::invalid_amount(amount, reason))
}
