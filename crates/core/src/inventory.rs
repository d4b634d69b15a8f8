//! Stock arithmetic shared by checkout and cancellation.
//!
//! Stock and purchase counts never go below zero. Checkout accepts an order
//! even when it exceeds stock and clamps the remainder to zero; cancellation
//! restores the full ordered quantity.

/// Stock after selling `quantity` units.
#[must_use]
pub const fn consume(stock: i32, quantity: i32) -> i32 {
    clamp(stock.saturating_sub(quantity))
}

/// Stock after `quantity` units are returned by a cancelled order.
#[must_use]
pub const fn restore(stock: i32, quantity: i32) -> i32 {
    stock.saturating_add(quantity)
}

/// Purchase count after a sale of `quantity` units.
#[must_use]
pub const fn record_purchase(purchase_count: i32, quantity: i32) -> i32 {
    purchase_count.saturating_add(quantity)
}

/// Purchase count after `quantity` units are cancelled.
#[must_use]
pub const fn revert_purchase(purchase_count: i32, quantity: i32) -> i32 {
    clamp(purchase_count.saturating_sub(quantity))
}

/// Floor a count at zero.
#[must_use]
pub const fn clamp(value: i32) -> i32 {
    if value < 0 { 0 } else { value }
}
