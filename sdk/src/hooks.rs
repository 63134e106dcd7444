//! User extension points for types the engines don't know natively.
//!
//! Hooks return [`HookError`] to fail. An [`Invalid`](HookErrorKind::Invalid)
//! error is reported like any other validation error, with the path of the
//! value the hook was called for. A [`Fatal`](HookErrorKind::Fatal) error
//! is returned to the caller as [`Error::Hook`](crate::Error::Hook) without
//! any decoration.

use keel_schema::{CustomSchema, Value};

use std::{fmt, sync::Arc};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookErrorKind {
    /// The input was unacceptable.
    Invalid,
    /// Something unrelated to the input went wrong.
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HookError {
    pub kind:    HookErrorKind,
    pub message: String,
}

impl HookError {
    pub fn invalid(message: impl Into<String>) -> HookError {
        HookError {
            kind:    HookErrorKind::Invalid,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> HookError {
        HookError {
            kind:    HookErrorKind::Fatal,
            message: message.into(),
        }
    }
}

/// Turns the decoded carrier value of a custom type into its final value.
pub type DecHook =
    Arc<dyn for<'de> Fn(&CustomSchema, Value<'de>) -> Result<Value<'de>, HookError> + Send + Sync>;

/// Replaces a value the encoder can't write with one it can.
pub type EncHook = Arc<dyn Fn(&Value) -> Result<Value<'static>, HookError> + Send + Sync>;

/// Builds a value from a MessagePack extension code and payload.
pub type ExtHook = Arc<dyn Fn(i8, &[u8]) -> Result<Value<'static>, HookError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct Hooks {
    pub(crate) dec: Option<DecHook>,
    pub(crate) enc: Option<EncHook>,
    pub(crate) ext: Option<ExtHook>,
}

impl Hooks {
    pub fn new() -> Hooks {
        Hooks::default()
    }

    pub fn dec_hook<F>(mut self, hook: F) -> Self
    where
        F: for<'de> Fn(&CustomSchema, Value<'de>) -> Result<Value<'de>, HookError> + Send + Sync + 'static,
    {
        self.dec = Some(Arc::new(hook));
        self
    }

    pub fn enc_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value) -> Result<Value<'static>, HookError> + Send + Sync + 'static,
    {
        self.enc = Some(Arc::new(hook));
        self
    }

    pub fn ext_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(i8, &[u8]) -> Result<Value<'static>, HookError> + Send + Sync + 'static,
    {
        self.ext = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("dec", &self.dec.is_some())
            .field("enc", &self.enc.is_some())
            .field("ext", &self.ext.is_some())
            .finish()
    }
}
