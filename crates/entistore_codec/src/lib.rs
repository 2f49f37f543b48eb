//! # entistore codec
//!
//! Document value model for entistore.
//!
//! This crate provides:
//! - [`Value`] and [`Document`], the dynamic form of every stored entity
//! - A serde bridge (`to_document` / `from_document`) built on `ciborium`
//! - CBOR byte encoding used by the in-memory store
//! - Filter-style value comparison with optional case folding
//!
//! ## Usage
//!
//! ```
//! use entistore_codec::{to_document, from_document, Value};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Point { x: i64, y: i64 }
//!
//! let doc = to_document(&Point { x: 1, y: 2 }).unwrap();
//! assert_eq!(doc.get("x"), Some(&Value::Integer(1)));
//!
//! let back: Point = from_document(&doc).unwrap();
//! assert_eq!(back, Point { x: 1, y: 2 });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod convert;
mod error;
mod value;

pub use convert::{
    decode_document, decode_value, encode_document, encode_value, from_document, from_value,
    to_document, to_value,
};
pub use error::{CodecError, CodecResult};
pub use value::{Document, Value};
