use crate::{
    error::{Error, Format, Result},
    wire::{Scalar, Seq, Wire, WireReader},
};
use keel_schema::{number::parse_float, BigInt};

use std::borrow::Cow;

/// Pull parser over a JSON document held in memory. Strings without
/// escapes are borrowed from the input.
pub(crate) struct JsonReader<'de> {
    input: &'de [u8],
    pos:   usize,
}

impl<'de> JsonReader<'de> {
    pub fn new(input: &'de [u8]) -> JsonReader<'de> {
        JsonReader::at(input, 0)
    }

    /// Starts reading at `pos`; offsets in errors stay relative to `input`.
    pub fn at(input: &'de [u8], pos: usize) -> JsonReader<'de> {
        JsonReader { input, pos }
    }

    fn error_at(&self, message: impl Into<String>, offset: usize) -> Error {
        Error::malformed(Format::Json, message, offset)
    }

    fn error(&self, message: impl Into<String>) -> Error {
        self.error_at(message, self.pos)
    }

    fn eof(&self) -> Error {
        self.error_at("unexpected end of input", self.input.len())
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\n' | b'\r' | b'\t') = self.input.get(self.pos) {
            self.pos += 1;
        }
    }

    /// The next significant byte, not consumed.
    fn byte(&mut self) -> Result<u8> {
        self.skip_whitespace();
        self.input.get(self.pos).copied().ok_or_else(|| self.eof())
    }

    fn unexpected(&self, byte: u8) -> Error {
        self.error(format!("invalid character {:?}", byte as char))
    }

    fn literal(&mut self, word: &'static [u8]) -> Result<()> {
        if self.input[self.pos..].starts_with(word) {
            self.pos += word.len();
            Ok(())
        } else {
            Err(self.error("invalid literal"))
        }
    }

    /// End of the number starting at `pos`, and whether it is integral.
    fn number_end(&self) -> Result<(usize, bool)> {
        let digit = |i: usize| matches!(self.input.get(i), Some(b'0'..=b'9'));
        let mut i = self.pos;
        if self.input.get(i) == Some(&b'-') {
            i += 1;
        }
        match self.input.get(i) {
            Some(b'0') => i += 1,
            Some(b'1'..=b'9') => {
                while digit(i) {
                    i += 1;
                }
            }
            _ => return Err(self.error_at("invalid number", i)),
        }

        let mut integral = true;
        if self.input.get(i) == Some(&b'.') {
            integral = false;
            i += 1;
            if !digit(i) {
                return Err(self.error_at("invalid number", i));
            }
            while digit(i) {
                i += 1;
            }
        }
        if let Some(b'e' | b'E') = self.input.get(i) {
            integral = false;
            i += 1;
            if let Some(b'+' | b'-') = self.input.get(i) {
                i += 1;
            }
            if !digit(i) {
                return Err(self.error_at("invalid number", i));
            }
            while digit(i) {
                i += 1;
            }
        }
        Ok((i, integral))
    }

    fn number(&mut self, float: bool) -> Result<Scalar<'de>> {
        let start = self.pos;
        let (end, integral) = self.number_end()?;
        let token = &self.input[start..end];
        self.pos = end;

        if integral && !float {
            // The token is ASCII digits with an optional sign.
            let text = std::str::from_utf8(token).map_err(|_| self.error_at("invalid number", start))?;
            if let Ok(value) = text.parse::<i64>() {
                return Ok(Scalar::Int(value));
            }
            if let Ok(value) = text.parse::<u64>() {
                return Ok(Scalar::UInt(value));
            }
            if let Some(value) = BigInt::parse(text) {
                return Ok(Scalar::Big(value));
            }
        }
        parse_float(token)
            .map(Scalar::Float)
            .ok_or_else(|| self.error_at("invalid number", start))
    }

    fn hex4(&self, i: &mut usize) -> Result<u32> {
        let digits = self.input.get(*i..*i + 4).ok_or_else(|| self.eof())?;
        let mut value = 0;
        for &d in digits {
            let nibble = (d as char)
                .to_digit(16)
                .ok_or_else(|| self.error_at("invalid unicode escape", *i))?;
            value = value * 16 + nibble;
        }
        *i += 4;
        Ok(value)
    }

    /// Decodes `XXXX` after `\u`, including a following low surrogate.
    fn unicode_escape(&self, i: &mut usize) -> Result<char> {
        let start = *i;
        let high = self.hex4(i)?;
        let code = match high {
            0xD800..=0xDBFF => {
                if self.input.get(*i..*i + 2) != Some(b"\\u") {
                    return Err(self.error_at("unpaired surrogate", start));
                }
                *i += 2;
                let low = self.hex4(i)?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(self.error_at("unpaired surrogate", start));
                }
                0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
            }
            0xDC00..=0xDFFF => return Err(self.error_at("unpaired surrogate", start)),
            _ => high,
        };
        char::from_u32(code).ok_or_else(|| self.error_at("invalid unicode escape", start))
    }

    fn string(&mut self) -> Result<Cow<'de, str>> {
        let start = self.pos + 1;
        let mut i = start;
        loop {
            match self.input.get(i) {
                None => return Err(self.eof()),
                Some(b'"') => {
                    let text = std::str::from_utf8(&self.input[start..i])
                        .map_err(|e| self.error_at("invalid UTF-8", start + e.valid_up_to()))?;
                    self.pos = i + 1;
                    return Ok(Cow::Borrowed(text));
                }
                Some(b'\\') => break,
                Some(&c) if c < 0x20 => return Err(self.error_at("control character in string", i)),
                Some(_) => i += 1,
            }
        }

        let mut out = self.input[start..i].to_vec();
        loop {
            match self.input.get(i) {
                None => return Err(self.eof()),
                Some(b'"') => {
                    i += 1;
                    break;
                }
                Some(b'\\') => {
                    let escape = *self.input.get(i + 1).ok_or_else(|| self.eof())?;
                    i += 2;
                    match escape {
                        b'"' => out.push(b'"'),
                        b'\\' => out.push(b'\\'),
                        b'/' => out.push(b'/'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0c),
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'u' => {
                            let c = self.unicode_escape(&mut i)?;
                            out.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes());
                        }
                        _ => return Err(self.error_at("invalid escape", i - 1)),
                    }
                }
                Some(&c) if c < 0x20 => return Err(self.error_at("control character in string", i)),
                Some(&c) => {
                    out.push(c);
                    i += 1;
                }
            }
        }
        self.pos = i;
        String::from_utf8(out)
            .map(Cow::Owned)
            .map_err(|_| self.error_at("invalid UTF-8", start))
    }

    /// Checks a string as strictly as [`string`](Self::string) without
    /// building it.
    fn skip_string(&mut self) -> Result<()> {
        let start = self.pos + 1;
        let mut i = start;
        loop {
            match self.input.get(i) {
                None => return Err(self.eof()),
                Some(b'"') => break,
                Some(b'\\') => {
                    let escape = *self.input.get(i + 1).ok_or_else(|| self.eof())?;
                    i += 2;
                    match escape {
                        b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' => {}
                        b'u' => {
                            self.unicode_escape(&mut i)?;
                        }
                        _ => return Err(self.error_at("invalid escape", i - 1)),
                    }
                }
                Some(&c) if c < 0x20 => return Err(self.error_at("control character in string", i)),
                Some(_) => i += 1,
            }
        }
        // Escapes are ASCII, so the raw span is UTF-8 exactly when the text is.
        std::str::from_utf8(&self.input[start..i])
            .map_err(|e| self.error_at("invalid UTF-8", start + e.valid_up_to()))?;
        self.pos = i + 1;
        Ok(())
    }

    fn skip_scalar(&mut self) -> Result<()> {
        match self.byte()? {
            b'n' => self.literal(b"null"),
            b't' => self.literal(b"true"),
            b'f' => self.literal(b"false"),
            b'"' => self.skip_string(),
            b'-' | b'0'..=b'9' => {
                self.pos = self.number_end()?.0;
                Ok(())
            }
            other => Err(self.unexpected(other)),
        }
    }
}

impl<'de> WireReader<'de> for JsonReader<'de> {
    const FORMAT: Format = Format::Json;

    type Mark = usize;

    fn offset(&self) -> usize {
        self.pos
    }

    fn mark(&self) -> usize {
        self.pos
    }

    fn reset(&mut self, mark: usize) {
        self.pos = mark;
    }

    fn peek(&mut self) -> Result<Wire> {
        Ok(match self.byte()? {
            b'n' => Wire::Null,
            b't' | b'f' => Wire::Bool,
            b'"' => Wire::Str,
            b'[' => Wire::Array,
            b'{' => Wire::Map,
            b'-' | b'0'..=b'9' => match self.number_end()? {
                (_, true) => Wire::Int,
                (_, false) => Wire::Float,
            },
            other => return Err(self.unexpected(other)),
        })
    }

    fn scalar(&mut self, float: bool) -> Result<Scalar<'de>> {
        match self.byte()? {
            b'n' => self.literal(b"null").map(|_| Scalar::Null),
            b't' => self.literal(b"true").map(|_| Scalar::Bool(true)),
            b'f' => self.literal(b"false").map(|_| Scalar::Bool(false)),
            b'"' => self.string().map(Scalar::Str),
            b'-' | b'0'..=b'9' => self.number(float),
            other => Err(self.unexpected(other)),
        }
    }

    fn begin_array(&mut self) -> Result<Seq> {
        match self.byte()? {
            b'[' => {
                self.pos += 1;
                Ok(Seq::delimited(false))
            }
            other => Err(self.unexpected(other)),
        }
    }

    fn begin_map(&mut self) -> Result<Seq> {
        match self.byte()? {
            b'{' => {
                self.pos += 1;
                Ok(Seq::delimited(true))
            }
            other => Err(self.unexpected(other)),
        }
    }

    fn next(&mut self, seq: &mut Seq) -> Result<bool> {
        let close = if seq.map { b'}' } else { b']' };
        let byte = self.byte()?;
        if byte == close {
            self.pos += 1;
            return Ok(false);
        }
        if seq.started {
            if byte != b',' {
                return Err(self.error(format!("expected ',' or '{}'", close as char)));
            }
            self.pos += 1;
        }
        seq.started = true;
        if seq.map && self.byte()? != b'"' {
            return Err(self.error("expected a string key"));
        }
        Ok(true)
    }

    fn key_end(&mut self) -> Result<()> {
        if self.byte()? != b':' {
            return Err(self.error("expected ':'"));
        }
        self.pos += 1;
        Ok(())
    }

    fn skip(&mut self) -> Result<()> {
        let mut open: Vec<Seq> = Vec::new();
        loop {
            match self.byte()? {
                b'[' => open.push(self.begin_array()?),
                b'{' => open.push(self.begin_map()?),
                _ => self.skip_scalar()?,
            }
            loop {
                let Some(seq) = open.last_mut() else {
                    return Ok(());
                };
                if self.next(seq)? {
                    if seq.map {
                        self.skip_string()?;
                        self.key_end()?;
                    }
                    break;
                }
                open.pop();
            }
        }
    }

    fn raw(&mut self) -> Result<Option<&'de [u8]>> {
        self.skip_whitespace();
        let start = self.pos;
        self.skip()?;
        Ok(Some(&self.input[start..self.pos]))
    }

    fn finish(&mut self) -> Result<()> {
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error("trailing characters"));
        }
        Ok(())
    }

    fn str_keys(&self) -> bool {
        true
    }

    fn bytes_as_str(&self) -> bool {
        true
    }
}
