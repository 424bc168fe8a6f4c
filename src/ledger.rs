//! Order ledger for the current session.
//!
//! Lines are committed as they are added: stock and sales counters change
//! at `add_line` time, not at some later checkout. Starting a new order
//! drops the previous one without rolling anything back.

use crate::catalog::Catalog;
use crate::error::{PosError, PosResult};
use chrono::NaiveDate;

/// One committed purchase line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub item: String,
    pub quantity: u64,
    /// Price charged per unit when the line was committed
    pub unit_price: u64,
}

impl OrderLine {
    /// Saturates; `Ledger::add_line` keeps real orders below `u64::MAX`.
    pub fn subtotal(&self) -> u64 {
        self.unit_price.saturating_mul(self.quantity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Order {
    pub lines: Vec<OrderLine>,
}

impl Order {
    pub fn total(&self) -> u64 {
        self.lines
            .iter()
            .map(OrderLine::subtotal)
            .fold(0, u64::saturating_add)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Result of asking for an order total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderTotal {
    /// No order has been started this session
    NoOrder,
    Amount(u64),
}

/// Result of adding a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Added(OrderLine),
    /// Quantity 0; nothing recorded
    Skipped,
}

#[derive(Debug, Default)]
pub struct Ledger {
    current: Option<Order>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an empty order, replacing any current one
    pub fn new_order(&mut self) -> &Order {
        self.current.insert(Order::default())
    }

    pub fn current(&self) -> Option<&Order> {
        self.current.as_ref()
    }

    /// Commit `quantity` of `item` against the catalog and append the line.
    pub fn add_line(
        &mut self,
        catalog: &mut Catalog,
        item: &str,
        quantity: i64,
        today: NaiveDate,
    ) -> PosResult<LineOutcome> {
        let order = self.current.as_mut().ok_or(PosError::NoOrder)?;
        if quantity == 0 {
            catalog.find_by_name(item)?;
            return Ok(LineOutcome::Skipped);
        }

        let price = catalog.find_by_name(item)?.price;
        let fits = u64::try_from(quantity)
            .ok()
            .and_then(|q| price.checked_mul(q))
            .and_then(|subtotal| order.total().checked_add(subtotal));
        if fits.is_none() && quantity > 0 {
            return Err(PosError::invalid_amount(
                quantity,
                "order total would overflow",
            ));
        }

        let unit_price = catalog.record_sale(item, quantity, today)?;
        let line = OrderLine {
            item: item.to_string(),
            // record_sale rejected negatives
            quantity: quantity as u64,
            unit_price,
        };
        order.lines.push(line.clone());
        Ok(LineOutcome::Added(line))
    }

    pub fn total(&self) -> OrderTotal {
        match &self.current {
            Some(order) => OrderTotal::Amount(order.total()),
            None => OrderTotal::NoOrder,
        }
    }
}
