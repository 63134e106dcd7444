//! Decoding a sequence of messages against one schema.

use crate::{
    decode::Core,
    error::{Error, Format, Result},
};
use keel_schema::Value;

use serde::Deserialize;
use tracing::debug;

/// How messages are separated in a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// One JSON document per line. Blank lines are skipped and a bad line
    /// doesn't end the stream. MessagePack has no line structure, so its
    /// decoder reads newline-framed input as concatenated messages.
    #[default]
    Newline,
    /// Each message follows its length as a 4-byte big-endian integer.
    LengthPrefixed,
    /// Messages back to back, optionally separated by whitespace in JSON.
    Concatenated,
}

/// Decodes one message starting at `offset`, returning it and where it ended.
pub(crate) type Step = for<'de> fn(&Core, &'de [u8], usize, bool) -> (Result<Value<'de>>, usize);

/// Skips the separators allowed between concatenated messages.
pub(crate) type Separators = fn(&[u8], usize) -> usize;

/// Iterator over the messages of a stream. Error offsets are positions in
/// the whole input.
pub struct Messages<'d, 'de> {
    core:       &'d Core,
    input:      &'de [u8],
    pos:        usize,
    framing:    Framing,
    format:     Format,
    done:       bool,
    step:       Step,
    separators: Separators,
}

impl<'d, 'de> Messages<'d, 'de> {
    pub(crate) fn new(
        core: &'d Core,
        input: &'de [u8],
        framing: Framing,
        format: Format,
        step: Step,
        separators: Separators,
    ) -> Messages<'d, 'de> {
        Messages {
            core,
            input,
            pos: 0,
            framing,
            format,
            done: false,
            step,
            separators,
        }
    }

    /// Byte offset of the next unread message.
    pub fn offset(&self) -> usize {
        self.pos
    }

    fn line(&mut self) -> Option<Result<Value<'de>>> {
        loop {
            if self.pos >= self.input.len() {
                self.done = true;
                return None;
            }
            let start = self.pos;
            let end = self.input[start..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(self.input.len(), |i| start + i);
            self.pos = end + 1;
            if self.input[start..end].iter().all(|b| matches!(b, b' ' | b'\t' | b'\r')) {
                continue;
            }
            let (result, _) = (self.step)(self.core, &self.input[..end], start, true);
            return Some(result);
        }
    }

    fn prefixed(&mut self) -> Option<Result<Value<'de>>> {
        let len = self.input.len();
        if self.pos == len {
            self.done = true;
            return None;
        }
        let Some(prefix) = self.input.get(self.pos..self.pos + 4) else {
            return Some(Err(Error::malformed(self.format, "truncated length prefix", self.pos)));
        };
        let size = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        let start = self.pos + 4;
        let end = match start.checked_add(size) {
            Some(end) if end <= len => end,
            _ => return Some(Err(Error::malformed(self.format, "truncated message", start))),
        };
        self.pos = end;
        let (result, _) = (self.step)(self.core, &self.input[..end], start, true);
        Some(result)
    }

    fn concatenated(&mut self) -> Option<Result<Value<'de>>> {
        self.pos = (self.separators)(self.input, self.pos);
        if self.pos >= self.input.len() {
            self.done = true;
            return None;
        }
        let (result, end) = (self.step)(self.core, self.input, self.pos, false);
        self.pos = end;
        Some(result)
    }
}

impl<'d, 'de> Iterator for Messages<'d, 'de> {
    type Item = Result<Value<'de>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = match (self.framing, self.format) {
            (Framing::Newline, Format::Json) => self.line(),
            (Framing::LengthPrefixed, _) => self.prefixed(),
            _ => self.concatenated(),
        };
        if let Some(Err(error)) = &item {
            debug!(format = %self.format, offset = self.pos, %error, "stream message failed");
            if self.framing != Framing::Newline || self.format != Format::Json {
                self.done = true;
            }
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json;
    use keel_compiler::compile;
    use keel_schema::TypeDesc;
    use std::sync::Arc;

    fn decoder() -> json::Decoder {
        json::Decoder::new(Arc::new(compile(&TypeDesc::int()).unwrap()))
    }

    #[test]
    fn newline_framing_recovers() {
        let decoder = decoder();
        let results: Vec<String> = decoder
            .messages(b"1\n\n  \n\"x\"\r\n3", Framing::Newline)
            .map(|r| match r {
                Ok(value) => format!("{:?}", value),
                Err(error) => error.to_string(),
            })
            .collect();
        assert_eq!(results, vec!["1", "Expected `int`, got `str`", "3"]);
    }

    #[test]
    fn offsets_are_absolute() {
        let decoder = decoder();
        let errors: Vec<Error> = decoder
            .messages(b"1\n2 x", Framing::Newline)
            .filter_map(|r| r.err())
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].offset(), Some(4));
    }

    #[test]
    fn length_prefixed() {
        let decoder = decoder();
        let mut input = Vec::new();
        for message in [&b"10"[..], b" 20 "] {
            input.extend_from_slice(&(message.len() as u32).to_be_bytes());
            input.extend_from_slice(message);
        }
        input.extend_from_slice(&[0, 0, 0, 9, b'1']);
        let results: Vec<_> = decoder.messages(&input, Framing::LengthPrefixed).collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[1], Ok(Value::Int(20)));
        assert_eq!(
            results[2].as_ref().unwrap_err().to_string(),
            "JSON is malformed: truncated message (byte 18)"
        );
    }

    #[test]
    fn concatenated_stops_at_first_error() {
        let decoder = decoder();
        let results: Vec<_> = decoder.messages(b"1 2\t3 true 4", Framing::Concatenated).collect();
        assert_eq!(results.len(), 4);
        assert_eq!(results[2], Ok(Value::Int(3)));
        assert!(results[3].is_err());
    }
}
