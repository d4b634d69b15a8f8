//! Orders and the order lifecycle.
//!
//! ```text
//! Pending ──approve──▶ Approved ──complete──▶ Completed
//!    │                    │                       │
//!    └──────cancel────────┴────────cancel─────────┴──▶ Cancelled
//! ```
//!
//! Cancellation is the only backward edge and applies at most once: its
//! stock effects are guarded by the status it moves away from.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::{Cart, MAX_LINE_QUANTITY};
use crate::types::{CustomerId, OrderId, OrderLineId, OrderStatus, Price, ProductId, StaffId};

/// An order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
    /// Sum of line totals at creation time.
    pub total: Price,
    pub status: OrderStatus,
    pub approved_by: Option<StaffId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub shipping_address: String,
}

/// One product entry of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    /// Product name at read time; `None` if the product has been deleted.
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price: Price,
    pub line_total: Price,
}

/// An order with the names and lines needed to display it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub customer_name: Option<String>,
    pub approver_name: Option<String>,
    pub lines: Vec<OrderLine>,
}

/// Where and to whom an order ships.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub recipient_name: String,
    pub recipient_phone: String,
    pub address: String,
}

/// Rejected checkout input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShippingError {
    #[error("shipping address is required")]
    MissingAddress,
}

impl ShippingInfo {
    /// Trim every field and require an address.
    ///
    /// # Errors
    ///
    /// Returns [`ShippingError::MissingAddress`] if the address is blank.
    pub fn validate(self) -> Result<Self, ShippingError> {
        let address = self.address.trim().to_string();
        if address.is_empty() {
            return Err(ShippingError::MissingAddress);
        }
        Ok(Self {
            recipient_name: self.recipient_name.trim().to_string(),
            recipient_phone: self.recipient_phone.trim().to_string(),
            address,
        })
    }
}

/// One requested line of a new order. Prices are read by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// An order the store cannot hold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderLimitError {
    #[error("line quantity {0} is out of range")]
    LineQuantity(i32),

    #[error("too many units of product {0} in one order")]
    ProductQuantity(ProductId),

    #[error("order total cannot exceed {}", Price::MAX)]
    Total,
}

/// Everything a store needs to place an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub shipping: ShippingInfo,
    pub lines: Vec<NewOrderLine>,
}

impl NewOrder {
    /// Build an order request from a cart, one line per cart line.
    ///
    /// Lines for the same product with different selections stay separate.
    #[must_use]
    pub fn from_cart(customer_id: CustomerId, shipping: ShippingInfo, cart: &Cart) -> Self {
        Self {
            customer_id,
            shipping,
            lines: cart
                .lines()
                .iter()
                .map(|line| NewOrderLine {
                    product_id: line.product.id,
                    quantity: line.quantity,
                })
                .collect(),
        }
    }

    /// Total quantity per product, in product id order.
    ///
    /// # Errors
    ///
    /// `LineQuantity` for a line outside `1..=MAX_LINE_QUANTITY`,
    /// `ProductQuantity` if a product's lines sum past `i32::MAX`.
    pub fn quantities_by_product(&self) -> Result<BTreeMap<ProductId, i32>, OrderLimitError> {
        let mut per_product = BTreeMap::new();
        for line in &self.lines {
            if !(1..=MAX_LINE_QUANTITY).contains(&line.quantity) {
                return Err(OrderLimitError::LineQuantity(line.quantity));
            }
            let total: &mut i32 = per_product.entry(line.product_id).or_default();
            *total = total
                .checked_add(line.quantity)
                .ok_or(OrderLimitError::ProductQuantity(line.product_id))?;
        }
        Ok(per_product)
    }
}

/// Check that every line total and the order total fit the money columns.
///
/// # Errors
///
/// Returns [`OrderLimitError::Total`] otherwise.
pub fn check_totals(
    line_totals: impl IntoIterator<Item = Price>,
) -> Result<Price, OrderLimitError> {
    let mut total = Price::ZERO;
    for line_total in line_totals {
        if !line_total.is_storable() {
            return Err(OrderLimitError::Total);
        }
        total += line_total;
    }
    if total.is_storable() {
        Ok(total)
    } else {
        Err(OrderLimitError::Total)
    }
}

/// A staff action on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Approve,
    Complete,
    Cancel,
}

/// What an action does to an order in a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Move to the new status (and run its side effects).
    Apply(OrderStatus),
    /// Leave the order untouched.
    NoOp,
}

/// An action that is not allowed from the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("a cancelled order cannot be completed")]
    CompleteCancelled,
}

impl LifecycleAction {
    /// Decide the transition for an order currently in `current`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::CompleteCancelled`] when completing a
    /// cancelled order.
    pub const fn decide(self, current: OrderStatus) -> Result<Transition, TransitionError> {
        match (self, current) {
            (Self::Approve, OrderStatus::Pending) => Ok(Transition::Apply(OrderStatus::Approved)),
            (Self::Complete, OrderStatus::Pending | OrderStatus::Approved) => {
                Ok(Transition::Apply(OrderStatus::Completed))
            }
            (Self::Complete, OrderStatus::Cancelled) => Err(TransitionError::CompleteCancelled),
            (Self::Cancel, OrderStatus::Pending | OrderStatus::Approved | OrderStatus::Completed) => {
                Ok(Transition::Apply(OrderStatus::Cancelled))
            }
            _ => Ok(Transition::NoOp),
        }
    }
}

/// Result of running a lifecycle action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleOutcome {
    pub order: Order,
    /// Whether the order changed.
    pub applied: bool,
}
