//! JSON view envelopes.

use serde::Serialize;

use smartstore_core::Price;
use smartstore_core::cart::{Cart, CartLine};

use super::Flash;

/// Every GET view: the payload plus any pending flash message.
#[derive(Debug, Serialize)]
pub struct View<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<Flash>,
    pub data: T,
}

impl<T> View<T> {
    pub const fn new(data: T, flash: Option<Flash>) -> Self {
        Self { flash, data }
    }
}

/// Cart page data.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub count: i32,
    pub subtotal: Price,
    pub subtotal_display: String,
}

#[derive(Debug, Serialize)]
pub struct CartLineView {
    #[serde(flatten)]
    pub line: CartLine,
    pub line_total: Price,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        let subtotal = cart.subtotal();
        Self {
            lines: cart
                .lines()
                .iter()
                .map(|line| CartLineView {
                    line: line.clone(),
                    line_total: line.line_total(),
                })
                .collect(),
            count: cart.count(),
            subtotal,
            subtotal_display: subtotal.to_string(),
        }
    }
}
