//! Rimline Core - Shared domain library.
//!
//! This crate provides the types and pricing rules used by the storefront:
//! - catalog records as the REST API returns them (tires, wheels, makes, ...)
//! - cart pricing (bundles, installation, add-ons, brand deals)
//! - invoice lines derived from orders
//! - the route access policy applied to the JWT role claim
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Persistence and business-rule enforcement live in the external
//! REST API; everything here is a reduction over data already fetched.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, populated-or-id references, money, statuses, sizes
//! - [`catalog`] - REST resource records
//! - [`order`] - Orders and order items
//! - [`pricing`] - Bundle and service pricing for a single line
//! - [`deals`] - Time-bounded brand discounts
//! - [`cart`] - Session cart document and totals
//! - [`invoice`] - Invoice lines that agree with order totals
//! - [`access`] - Role/path gate for `/admin` and `/profile`

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod cart;
pub mod catalog;
pub mod deals;
pub mod invoice;
pub mod order;
pub mod pricing;
pub mod types;

pub use types::*;
