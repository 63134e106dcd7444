use crate::{hooks::HookError, path::Path};
use keel_compiler::CompileError;

use std::fmt;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Wire format named in malformed-input errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    MsgPack,
    /// In-memory generic values, see [`convert`](crate::convert).
    Generic,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Json => "JSON",
            Format::MsgPack => "MessagePack",
            Format::Generic => "Value",
        })
    }
}

/// What was wrong with a well-formed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationKind {
    TypeMismatch { expected: String, got: String },
    /// A bound, length or pattern; `detail` reads like `>= 0`.
    Constraint { expected: String, detail: String },
    MissingField(String),
    UnknownField(String),
    /// A literal or tag outside its allowed set, rendered like `'x'` or `3`.
    InvalidValue(String),
    InvalidEnum(String),
    /// Raised by a user hook.
    Hook(String),
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationKind::TypeMismatch { expected, got } => {
                write!(f, "Expected `{}`, got `{}`", expected, got)
            }
            ValidationKind::Constraint { expected, detail } => {
                write!(f, "Expected `{}` {}", expected, detail)
            }
            ValidationKind::MissingField(name) => write!(f, "Object missing required field `{}`", name),
            ValidationKind::UnknownField(name) => write!(f, "Object contains unknown field `{}`", name),
            ValidationKind::InvalidValue(value) => write!(f, "Invalid value {}", value),
            ValidationKind::InvalidEnum(value) => write!(f, "Invalid enum value {}", value),
            ValidationKind::Hook(message) => f.write_str(message),
        }
    }
}

fn at(path: &str) -> String {
    if path == "$" {
        String::new()
    } else {
        format!(" - at `{}`", path)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("{kind}{}", at(.path))]
    Validation { kind: ValidationKind, path: String },

    #[error("{format} is malformed: {message} (byte {offset})")]
    Malformed {
        format:  Format,
        message: String,
        offset:  usize,
    },

    #[error("Maximum recursion depth exceeded{}", at(.path))]
    DepthExceeded { path: String },

    #[error("{message}{}", at(.path))]
    Encode { message: String, path: String },

    /// A fatal hook failure, passed through unchanged.
    #[error(transparent)]
    Hook(HookError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl Error {
    pub(crate) fn validation(kind: ValidationKind, path: &Path) -> Error {
        Error::Validation {
            kind,
            path: path.render(),
        }
    }

    pub(crate) fn mismatch(expected: impl Into<String>, got: impl Into<String>, path: &Path) -> Error {
        Error::validation(
            ValidationKind::TypeMismatch {
                expected: expected.into(),
                got:      got.into(),
            },
            path,
        )
    }

    pub(crate) fn constraint(expected: &str, detail: String, path: &Path) -> Error {
        Error::validation(
            ValidationKind::Constraint {
                expected: expected.to_owned(),
                detail,
            },
            path,
        )
    }

    pub(crate) fn malformed(format: Format, message: impl Into<String>, offset: usize) -> Error {
        Error::Malformed {
            format,
            message: message.into(),
            offset,
        }
    }

    pub(crate) fn encode(message: impl Into<String>, path: &Path) -> Error {
        Error::Encode {
            message: message.into(),
            path:    path.render(),
        }
    }

    /// Invalid hook errors get the path attached; fatal ones pass through.
    pub(crate) fn from_hook(error: HookError, path: &Path) -> Error {
        match error.kind {
            crate::hooks::HookErrorKind::Invalid => {
                Error::validation(ValidationKind::Hook(error.message), path)
            }
            crate::hooks::HookErrorKind::Fatal => Error::Hook(error),
        }
    }

    /// `$`-rooted location of the failure, when there is one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::Validation { path, .. } | Error::DepthExceeded { path } | Error::Encode { path, .. } => {
                Some(path)
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<&ValidationKind> {
        match self {
            Error::Validation { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn expected(&self) -> Option<&str> {
        match self.kind()? {
            ValidationKind::TypeMismatch { expected, .. } | ValidationKind::Constraint { expected, .. } => {
                Some(expected)
            }
            _ => None,
        }
    }

    pub fn got(&self) -> Option<&str> {
        match self.kind()? {
            ValidationKind::TypeMismatch { got, .. } => Some(got),
            _ => None,
        }
    }

    /// Byte offset of malformed input.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Malformed { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HookError;

    #[test]
    fn rendering() {
        let root = Path::root();
        let items = root.field("items");
        let third = items.index(2);

        let err = Error::mismatch("int", "str", &third);
        assert_eq!(err.to_string(), "Expected `int`, got `str` - at `$.items[2]`");
        assert_eq!(err.path(), Some("$.items[2]"));
        assert_eq!(err.expected(), Some("int"));
        assert_eq!(err.got(), Some("str"));

        let err = Error::validation(ValidationKind::MissingField("b".into()), &root);
        assert_eq!(err.to_string(), "Object missing required field `b`");

        let err = Error::malformed(Format::MsgPack, "unexpected end of input", 7);
        assert_eq!(err.to_string(), "MessagePack is malformed: unexpected end of input (byte 7)");
        assert_eq!(err.offset(), Some(7));
        assert_eq!(err.path(), None);
    }

    #[test]
    fn hook_errors() {
        let root = Path::root();
        let field = root.field("when");
        let err = Error::from_hook(HookError::invalid("not a date"), &field);
        assert_eq!(err.to_string(), "not a date - at `$.when`");
        let fatal = HookError::fatal("database is down");
        assert_eq!(Error::from_hook(fatal.clone(), &field), Error::Hook(fatal));
    }
}
