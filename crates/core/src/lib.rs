//! SmartStore Core - domain types and order rules.
//!
//! This crate holds everything the storefront needs that is not HTTP:
//! - [`types`] - Newtype wrappers for IDs, prices, emails, and statuses
//! - [`cart`] - The session cart and its merge rules
//! - [`catalog`] - Products, categories, filtering and paging
//! - [`order`] - Order records and lifecycle transitions
//! - [`inventory`] - Stock clamping arithmetic shared by the store backends
//! - [`account`] - Customers, staff and roles
//! - [`session`] - The typed per-visitor session context
//! - [`store`] - The `CommerceStore` trait with memory and Postgres backends
//!
//! # Architecture
//!
//! Checkout and lifecycle effects live behind [`store::CommerceStore`] so that
//! each backend can apply them atomically. The pure rules (cart merging, which
//! transitions apply, stock clamping) are plain functions in this crate and
//! are shared by both backends.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod account;
pub mod cart;
pub mod catalog;
pub mod inventory;
pub mod order;
pub mod session;
pub mod store;
pub mod types;

pub use types::*;
