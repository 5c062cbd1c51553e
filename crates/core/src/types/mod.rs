//! Core types for Rimline.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod reference;
pub mod status;
pub mod tire_size;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::Money;
pub use reference::Ref;
pub use status::*;
pub use tire_size::{TireSizeError, TireSizeSpec};
