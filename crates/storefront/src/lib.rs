//! SmartStore storefront library.
//!
//! The HTTP surface of the shop: catalog browsing, the session cart,
//! checkout, customer accounts and the staff back-office. Exposed as a
//! library so the router can be driven in tests without a server.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
