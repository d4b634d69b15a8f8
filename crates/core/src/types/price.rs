//! Type-safe price representation using decimal arithmetic.
//!
//! The shop sells in Vietnamese đồng, which has no minor unit, so a price is
//! a whole-number [`Decimal`]. Arithmetic is exact; display groups thousands
//! with dots the way the storefront renders them (`1.990.000 ₫`).

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An amount of money in VND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero đồng.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest amount a `NUMERIC(14, 2)` money column holds in whole đồng
    /// (999.999.999.999 ₫).
    pub const MAX: Self = Self(Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 0));

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from a whole number of đồng.
    #[must_use]
    pub fn from_dong(amount: i64) -> Self {
        Self(Decimal::from(amount))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Whether the amount fits the store's money columns.
    #[must_use]
    pub fn is_storable(&self) -> bool {
        !self.is_negative() && *self <= Self::MAX
    }

    /// Price of `quantity` units at this unit price.
    ///
    /// Saturates at the decimal range; callers that persist the result check
    /// [`Price::is_storable`].
    #[must_use]
    pub fn times(self, quantity: i32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Price {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.0.round();
        let digits = rounded.abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }
        if rounded.is_sign_negative() && !rounded.is_zero() {
            write!(f, "-{grouped} ₫")
        } else {
            write!(f, "{grouped} ₫")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Price::from_dong(1_990_000).to_string(), "1.990.000 ₫");
        assert_eq!(Price::from_dong(990).to_string(), "990 ₫");
        assert_eq!(Price::ZERO.to_string(), "0 ₫");
        assert_eq!(Price::from_dong(-25_000).to_string(), "-25.000 ₫");
    }

    #[test]
    fn test_times_and_sum() {
        let unit = Price::from_dong(12_500);
        assert_eq!(unit.times(3), Price::from_dong(37_500));

        let total: Price = [Price::from_dong(1), Price::from_dong(2)].into_iter().sum();
        assert_eq!(total, Price::from_dong(3));
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Price::from_dong(1500)).unwrap_or_default();
        assert_eq!(json, "\"1500\"");
    }

    #[test]
    fn test_storable_range() {
        assert_eq!(Price::MAX, Price::from_dong(999_999_999_999));
        assert!(Price::MAX.is_storable());
        assert!(Price::ZERO.is_storable());
        assert!(!Price::from_dong(1_000_000_000_000).is_storable());
        assert!(!Price::from_dong(-1).is_storable());
    }

    #[test]
    fn test_times_saturates_instead_of_panicking() {
        let huge = Price::new(Decimal::MAX);
        assert_eq!(huge.times(2), huge);
        assert_eq!(huge + huge, huge);
        assert!(!huge.times(2).is_storable());
        assert!(!Price::from_dong(19_990_000).times(100_000).is_storable());
    }

    #[test]
    fn test_is_negative() {
        assert!(Price::from_dong(-1).is_negative());
        assert!(!Price::ZERO.is_negative());
    }
}
