//! Settings for decoding, encoding and conversion.
//!
//! All of them deserialize with missing keys taking their defaults, so they
//! can be loaded from a config file:
//!
//! ```
//! let options: keel::DecodeOptions = serde_json::from_str(r#"{"strict": false}"#).unwrap();
//! assert!(!options.strict);
//! assert_eq!(options.max_depth, 256);
//! ```

use serde::Deserialize;

pub const DEFAULT_MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// When false, strings convert to numbers, bools and null where they
    /// parse, integral floats convert to ints and `0`/`1` convert to bools.
    pub strict:    bool,
    /// Deepest container nesting accepted before failing.
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            strict:    true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Order of map entries and set elements on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    Insertion,
    /// Sorted by value, so equal inputs produce identical bytes.
    Deterministic,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    pub max_depth: usize,
    pub order:     Order,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            order:     Order::Insertion,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// The target protocol only allows string map keys.
    pub str_keys:        bool,
    pub strict:          bool,
    /// The target protocol has no bytes type; carry bytes as base64 text.
    pub bytes_as_base64: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            str_keys:        false,
            strict:          true,
            bytes_as_base64: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_json() {
        let encode: EncodeOptions = serde_json::from_str(r#"{"order": "deterministic"}"#).unwrap();
        assert_eq!(encode.order, Order::Deterministic);
        assert_eq!(encode.max_depth, DEFAULT_MAX_DEPTH);

        let convert: ConvertOptions = serde_json::from_str(r#"{"str_keys": true}"#).unwrap();
        assert!(convert.str_keys && convert.strict && !convert.bytes_as_base64);

        assert_eq!(serde_json::from_str::<DecodeOptions>("{}").unwrap(), DecodeOptions::default());
    }
}
