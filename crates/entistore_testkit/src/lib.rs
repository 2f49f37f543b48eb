//! # entistore testkit
//!
//! Test utilities for entistore.
//!
//! This crate provides:
//! - [`TestStore`], an entity store over a fresh in-memory database
//! - Sample entities covering every identity strategy
//! - Audit sinks that record or reject what they are given
//! - Property-based generators using proptest
//! - Helpers for racing operations across threads
//!
//! ## Usage
//!
//! ```rust,ignore
//! use entistore_testkit::prelude::*;
//!
//! #[test]
//! fn put_then_count() {
//!     with_test_store(|store| {
//!         store.put(&Customer::new("Amani", "amani@example.com")).unwrap();
//!         assert_eq!(store.count::<Customer>().unwrap(), 1);
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod concurrency;
pub mod entities;
pub mod fixtures;
pub mod generators;
pub mod sinks;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::concurrency::*;
    pub use crate::entities::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::sinks::*;
}

pub use concurrency::*;
pub use entities::*;
pub use fixtures::*;
pub use generators::*;
pub use sinks::*;
