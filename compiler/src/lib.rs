//! keel-compiler
//!
//! Turns [`TypeDesc`](keel_schema::TypeDesc) descriptions into executable
//! [`Schema`](keel_schema::Schema) trees:
//!  1) struct layout resolution (inheritance, field order, renames, tags),
//!  2) union verification (one member per wire shape, tagged struct tables),
//!  3) constraint and regex validation,
//!  4) a thread-safe [`SchemaCache`] plus a process-wide [`global_cache`],
//!  5) error types ([`CompileError`]).

pub mod cache;
pub mod compiler;
pub mod error;
pub mod rename;
pub mod utils;
mod verifier;

pub use cache::{global_cache, SchemaCache};
pub use compiler::compile;
pub use error::CompileError;
