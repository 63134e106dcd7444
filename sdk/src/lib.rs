//! keel
//!
//! Schema-directed JSON and MessagePack decoding and encoding:
//!
//! - [`json`] and [`msgpack`]: one-shot `decode`/`encode`/`encode_into`,
//!   plus reusable `Decoder`/`Encoder` types carrying options and hooks
//! - [`stream`]: decoding many framed messages against one schema
//! - [`convert`]: lowering values to generic trees and validating them back
//! - [`hooks`]: user conversions for custom and extension types
//! - [`Error`]: validation errors carry a `$`-rooted path, malformed input
//!   a byte offset
//!
//! Decoding validates in the same pass that builds the value, so a value is
//! only returned once all of it checks out.
//!
//! ```
//! use keel::{json, msgpack, FieldDesc, StructDesc, TypeDesc};
//!
//! let desc: TypeDesc = StructDesc::new("User")
//!     .field(FieldDesc::new("name", TypeDesc::str()))
//!     .field(FieldDesc::new("groups", TypeDesc::list(TypeDesc::str())))
//!     .into();
//! let schema = keel::compile(&desc).unwrap();
//!
//! let user = json::decode(&schema, br#"{"name": "ada", "groups": ["admin"]}"#).unwrap();
//! let packed = msgpack::encode(Some(&schema), &user).unwrap();
//! assert_eq!(msgpack::decode(&schema, &packed).unwrap(), user);
//!
//! let err = json::decode(&schema, br#"{"name": "ada", "groups": [1]}"#).unwrap_err();
//! assert_eq!(err.to_string(), "Expected `str`, got `int` - at `$.groups[0]`");
//! ```

pub mod convert;
pub mod error;
pub mod hooks;
pub mod json;
pub mod msgpack;
pub mod options;
pub mod stream;

mod coerce;
mod decode;
mod encode;
mod path;
mod wire;

pub use error::{Error, Format, Result, ValidationKind};
pub use hooks::{HookError, HookErrorKind, Hooks};
pub use options::{ConvertOptions, DecodeOptions, EncodeOptions, Order};
pub use stream::{Framing, Messages};

pub use keel_compiler::{compile, global_cache, CompileError, SchemaCache};
pub use keel_schema::*;
