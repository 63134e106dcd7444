use crate::utils::quote;
use thiserror::Error;

/// Why a type description was rejected. Cloneable so a cached failure can be
/// replayed unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("The type {} is not defined", quote(.0))]
    UndefinedType(String),

    #[error("The field {} is defined twice in {}", quote(.field), quote(.name))]
    DuplicateField { name: String, field: String },

    #[error("Required field {} cannot follow optional fields in {}", quote(.field), quote(.name))]
    RequiredAfterOptional { name: String, field: String },

    #[error("The field {} in {} collides with the tag field", quote(.field), quote(.name))]
    TagFieldCollision { name: String, field: String },

    #[error("The tag value {tag} is used by both {} and {}", quote(.first), quote(.second))]
    DuplicateTag {
        tag:    String,
        first:  String,
        second: String,
    },

    #[error("Invalid constraint on `{ty}`: {message}")]
    InvalidConstraint { ty: String, message: String },

    #[error("Invalid pattern {}: {message}", quote(.pattern))]
    InvalidPattern { pattern: String, message: String },

    #[error("The enum {} mixes str and int values", quote(.0))]
    MixedEnum(String),

    #[error("Type `{0}` is not hashable and can't be a set item or map key")]
    UnhashableType(String),

    #[error("Type `{0}` can't be used as a map key")]
    InvalidMapKey(String),

    #[error("Type `{ty}` is not supported: {reason}")]
    AmbiguousUnion { ty: String, reason: String },
}
