//! The session cart.
//!
//! A [`Cart`] is an ordered list of [`CartLine`]s that lives only in the
//! visitor's session. Lines are merged on `(product id, color, variant)`,
//! where an empty color or variant is the same key as no color or variant.
//! The cart never checks stock; checkout clamps instead.

use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// Session key the cart is stored under.
pub const CART_KEY: &str = "cart";

/// Most units a single cart line may hold (the range of a SMALLINT).
pub const MAX_LINE_QUANTITY: i32 = 32_767;

/// Errors from cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// Quantities added to the cart must be positive.
    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    /// The line would hold more than [`MAX_LINE_QUANTITY`] units.
    #[error("a cart line holds at most {} units", MAX_LINE_QUANTITY)]
    QuantityTooLarge,
}

/// `current + added`, if the sum stays within [`MAX_LINE_QUANTITY`].
fn merged_quantity(current: i32, added: i32) -> Result<i32, CartError> {
    current
        .checked_add(added)
        .filter(|total| *total <= MAX_LINE_QUANTITY)
        .ok_or(CartError::QuantityTooLarge)
}

/// The slice of a product the cart needs to render a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartProduct {
    pub id: ProductId,
    pub name: String,
    pub sale_price: Option<Price>,
    pub image: Option<String>,
}

/// One product entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: CartProduct,
    pub quantity: i32,
    pub color: Option<String>,
    pub variant: Option<String>,
}

impl CartLine {
    /// Sale price times quantity. Products without a sale price count as 0.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product
            .sale_price
            .unwrap_or(Price::ZERO)
            .times(self.quantity)
    }

    fn matches(&self, product_id: ProductId, color: Option<&str>, variant: Option<&str>) -> bool {
        self.product.id == product_id
            && key_part(self.color.as_deref()) == key_part(color)
            && key_part(self.variant.as_deref()) == key_part(variant)
    }

    fn same_key(&self, other: &Self) -> bool {
        other.matches(self.product.id, self.color.as_deref(), self.variant.as_deref())
    }
}

fn key_part(value: Option<&str>) -> &str {
    value.unwrap_or("")
}

fn normalize(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Ordered collection of cart lines.
///
/// Serializes as a bare JSON array so the session payload stays a plain list
/// of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines (the cart badge).
    ///
    /// Saturates at `i32::MAX`.
    #[must_use]
    pub fn count(&self) -> i32 {
        self.lines
            .iter()
            .fold(0_i32, |total, line| total.saturating_add(line.quantity))
    }

    /// Sum of every line total.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Add `quantity` units of a product with the given selection.
    ///
    /// Increments the matching line or appends a new one.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] if `quantity` is not positive
    /// and [`CartError::QuantityTooLarge`] if the line would exceed
    /// [`MAX_LINE_QUANTITY`]. The cart is unchanged on error.
    pub fn add(
        &mut self,
        product: CartProduct,
        color: Option<String>,
        variant: Option<String>,
        quantity: i32,
    ) -> Result<(), CartError> {
        if quantity <= 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(CartError::QuantityTooLarge);
        }

        let color = normalize(color);
        let variant = normalize(variant);

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.matches(product.id, color.as_deref(), variant.as_deref()))
        {
            line.quantity = merged_quantity(line.quantity, quantity)?;
        } else {
            self.lines.push(CartLine {
                product,
                quantity,
                color,
                variant,
            });
        }
        Ok(())
    }

    /// Add one unit with no selection, merging into the first line of the
    /// product whatever its color or variant.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityTooLarge`] if that line is already full.
    pub fn buy_now(&mut self, product: CartProduct) -> Result<(), CartError> {
        if let Some(line) = self.lines.iter_mut().find(|line| line.product.id == product.id) {
            line.quantity = merged_quantity(line.quantity, 1)?;
        } else {
            self.lines.push(CartLine {
                product,
                quantity: 1,
                color: None,
                variant: None,
            });
        }
        Ok(())
    }

    /// Set the quantity of the first line for `product_id`.
    ///
    /// A quantity of zero or less removes the line. A given color or variant
    /// replaces the line's selection; if that makes the line collide with
    /// another line's key, the two are merged. Returns `false` when the cart
    /// has no line for the product.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityTooLarge`] if the line, or the line it
    /// merges into, would exceed [`MAX_LINE_QUANTITY`]. The cart is
    /// unchanged on error.
    pub fn update_quantity(
        &mut self,
        product_id: ProductId,
        quantity: i32,
        color: Option<String>,
        variant: Option<String>,
    ) -> Result<bool, CartError> {
        let Some(index) = self.position(product_id) else {
            return Ok(false);
        };

        if quantity <= 0 {
            self.lines.remove(index);
            return Ok(true);
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(CartError::QuantityTooLarge);
        }

        let mut line = self.lines.remove(index);
        let previous = line.clone();
        line.quantity = quantity;
        if let Some(color) = color {
            line.color = normalize(Some(color));
        }
        if let Some(variant) = variant {
            line.variant = normalize(Some(variant));
        }

        if let Some(existing) = self.lines.iter_mut().find(|other| other.same_key(&line)) {
            match merged_quantity(existing.quantity, line.quantity) {
                Ok(total) => existing.quantity = total,
                Err(err) => {
                    self.lines.insert(index, previous);
                    return Err(err);
                }
            }
        } else {
            self.lines.insert(index, line);
        }
        Ok(true)
    }

    /// Remove the first line for `product_id`, whatever its selection.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        match self.position(product_id) {
            Some(index) => {
                self.lines.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove exactly the line keyed by product, color and variant.
    pub fn remove_variant(
        &mut self,
        product_id: ProductId,
        color: Option<&str>,
        variant: Option<&str>,
    ) -> bool {
        let before = self.lines.len();
        if let Some(index) = self
            .lines
            .iter()
            .position(|line| line.matches(product_id, color, variant))
        {
            self.lines.remove(index);
        }
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    fn position(&self, product_id: ProductId) -> Option<usize> {
        self.lines.iter().position(|line| line.product.id == product_id)
    }
}
