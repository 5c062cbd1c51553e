//! Services behind the route handlers.
//!
//! - `auth` - login, registration and JWT decoding against the REST API
//! - `invoice_pdf` - A4 PDF rendering of order invoices
//! - `payments` - hosted checkout sessions and redirect validation

pub mod auth;
pub mod invoice_pdf;
pub mod payments;
