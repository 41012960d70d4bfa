use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of an order. Transitions live in [`crate::order_machine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    AwaitingPayment,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::AwaitingPayment,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::AwaitingPayment => "AWAITING_PAYMENT",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Ready => "READY",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown order status: {}", s))
    }
}

/// Status tab selection for order lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(OrderStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: OrderStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "ALL" {
            return Ok(StatusFilter::All);
        }
        s.parse().map(StatusFilter::Only)
    }
}

/// Ordering applied to order lists, on `(created_at, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Descending,
    Ascending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Descending => SortDirection::Ascending,
            SortDirection::Ascending => SortDirection::Descending,
        }
    }
}

/// One requested menu item and how many of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub menu_id: String,
    pub quantity: u32,
}

impl OrderLine {
    pub fn new(menu_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            menu_id: menu_id.into(),
            quantity,
        }
    }
}

/// An order line as recorded by the server, with the unit price it was sold at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub menu_id: String,
    pub name: String,
    pub unit_price_minor: u64,
    pub quantity: u32,
}

impl OrderItem {
    /// `None` when the subtotal does not fit in a `u64`.
    pub fn subtotal_minor(&self) -> Option<u64> {
        self.unit_price_minor.checked_mul(u64::from(self.quantity))
    }
}

/// Sum of line subtotals, or `None` on overflow.
pub fn total_minor(items: &[OrderItem]) -> Option<u64> {
    items
        .iter()
        .try_fold(0u64, |total, item| total.checked_add(item.subtotal_minor()?))
}

/// A customer order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    /// Server-computed total. Never used as a payment amount by the client.
    pub total_minor: u64,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Recomputes the total from line items, for display.
    pub fn display_total(&self) -> Option<u64> {
        total_minor(&self.items)
    }
}

/// Checks line quantities and folds duplicate menu ids into one line.
///
/// Line order follows the first occurrence of each menu id.
pub fn normalize_lines(lines: Vec<OrderLine>) -> Result<Vec<OrderLine>, String> {
    if lines.is_empty() {
        return Err("Order must contain at least one item".to_string());
    }
    let mut merged: Vec<OrderLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity < 1 {
            return Err(format!("Quantity for {} must be at least 1", line.menu_id));
        }
        match merged.iter_mut().find(|existing| existing.menu_id == line.menu_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(line.quantity)
                    .ok_or_else(|| format!("Quantity for {} is too large", line.menu_id))?;
            }
            None => merged.push(line),
        }
    }
    Ok(merged)
}

/// A cart being filled in by a customer, before validation.
#[derive(Debug, Clone, Default)]
pub struct OrderDraft {
    entries: Vec<(String, i64)>,
}

impl OrderDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, menu_id: impl Into<String>, quantity: i64) -> Self {
        self.add(menu_id, quantity);
        self
    }

    pub fn add(&mut self, menu_id: impl Into<String>, quantity: i64) {
        self.entries.push((menu_id.into(), quantity));
    }

    pub fn into_lines(self) -> Result<Vec<OrderLine>, String> {
        let lines = self
            .entries
            .into_iter()
            .map(|(menu_id, quantity)| {
                if quantity < 1 {
                    return Err(format!("Quantity for {} must be at least 1", menu_id));
                }
                let quantity = u32::try_from(quantity)
                    .map_err(|_| format!("Quantity for {} is too large", menu_id))?;
                Ok(OrderLine { menu_id, quantity })
            })
            .collect::<Result<Vec<_>, String>>()?;
        normalize_lines(lines)
    }
}
