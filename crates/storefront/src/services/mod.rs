//! Business logic services for the storefront.
//!
//! Each service borrows the shared store for the duration of a request.
//!
//! # Services
//!
//! - `auth` - Password login, registration and the customer's own profile
//! - `accounts` - Staff and customer administration
//! - `cart` - Cart mutations that need product lookups
//! - `catalog` - Product browsing and catalog edits (cached categories)
//! - `checkout` - Cart to order
//! - `orders` - Order queries and lifecycle actions

pub mod accounts;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
