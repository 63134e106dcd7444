//! The data side of keel: the [`Value`] model, compiled schema nodes, the
//! struct runtime model and the numeric parser the decoders share.
//!
//! Schemas are described with [`TypeDesc`] and compiled by the
//! `keel-compiler` crate; the `keel` crate walks them to decode and encode
//! JSON and MessagePack.
//!
//! ```
//! use keel_schema::*;
//!
//! let value = Value::map_of(vec![
//!     (Value::from("x"), Value::Float(0.5)),
//!     (Value::from("y"), Value::Int(-1)),
//!     (Value::from("x"), Value::Float(1.5)),
//! ]);
//! assert_eq!(format!("{:?}", value), r#"{"x": 1.5, "y": -1}"#);
//! assert_eq!(number::parse_float(b"1.5e-3"), Some(0.0015));
//! ```

pub mod bb;
pub mod bigint;
pub mod desc;
pub mod number;
pub mod schema;
mod serde_impl;
pub mod structs;
pub mod value;

pub use bb::*;
pub use bigint::BigInt;
pub use desc::*;
pub use schema::*;
pub use structs::*;
pub use value::*;
