//! JSON parsing and stringification over runtime values.
//!
//! A single-pass parser building values directly, and a stringifier with
//! escape handling and cycle detection. Errors are plain strings; the
//! method dispatchers route them through the exception substrate.

use crate::heap::Object;
use crate::value::Value;
use std::fmt::Write;

/// Parse a complete JSON document into a Value.
///
/// Trailing characters after a complete JSON value are an error.
/// Integral numbers that fit become i32/i64; everything else is f64.
pub fn parse(input: &str) -> Result<Value, String> {
    let mut parser = Parser::new(input);
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if parser.pos < parser.bytes.len() {
        return Err(format!(
            "trailing characters after JSON value at position {}",
            parser.pos
        ));
    }
    Ok(value)
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn parse_value(&mut self) -> Result<Value, String> {
        self.skip_whitespace();
        if self.pos >= self.bytes.len() {
            return Err("unexpected end of JSON".to_string());
        }
        match self.bytes[self.pos] {
            b'n' => self.parse_literal("null", Value::Null),
            b't' => self.parse_literal("true", Value::Bool(true)),
            b'f' => self.parse_literal("false", Value::Bool(false)),
            b'"' => self.parse_string().map(Value::str),
            b'[' => self.parse_array(),
            b'{' => self.parse_object(),
            b'-' | b'0'..=b'9' => self.parse_number(),
            c => Err(format!(
                "unexpected character '{}' at position {}",
                c as char, self.pos
            )),
        }
    }

    fn parse_literal(&mut self, literal: &str, value: Value) -> Result<Value, String> {
        if self.input[self.pos..].starts_with(literal) {
            self.pos += literal.len();
            Ok(value)
        } else {
            Err(format!("invalid literal at position {}", self.pos))
        }
    }

    fn parse_string(&mut self) -> Result<String, String> {
        debug_assert_eq!(self.bytes[self.pos], b'"');
        self.pos += 1;

        let start = self.pos;
        let mut has_escapes = false;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'"' => {
                    let end = self.pos;
                    self.pos += 1;
                    return if has_escapes {
                        unescape(&self.input[start..end])
                    } else {
                        Ok(self.input[start..end].to_string())
                    };
                }
                b'\\' => {
                    has_escapes = true;
                    self.pos += 2;
                }
                _ => self.pos += 1,
            }
        }
        Err("unterminated string in JSON".to_string())
    }

    fn parse_number(&mut self) -> Result<Value, String> {
        let start = self.pos;
        if self.bytes[self.pos] == b'-' {
            self.pos += 1;
        }
        let mut is_float = false;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'0'..=b'9' => self.pos += 1,
                b'.' | b'e' | b'E' | b'+' | b'-' => {
                    is_float = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        let text = &self.input[start..self.pos];
        if !is_float {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Value::int(n));
            }
        }
        text.parse::<f64>()
            .map(Value::F64)
            .map_err(|_| format!("invalid number `{}` at position {}", text, start))
    }

    fn parse_array(&mut self) -> Result<Value, String> {
        self.pos += 1; // '['
        let mut elements = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Value::array(elements));
        }
        loop {
            elements.push(self.parse_value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Value::array(elements));
                }
                _ => return Err(format!("expected ',' or ']' at position {}", self.pos)),
            }
        }
    }

    fn parse_object(&mut self) -> Result<Value, String> {
        self.pos += 1; // '{'
        let mut obj = Object::new();
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Value::object(obj));
        }
        loop {
            self.skip_whitespace();
            if self.peek() != Some(b'"') {
                return Err(format!("expected field name at position {}", self.pos));
            }
            let key = self.parse_string()?;
            self.skip_whitespace();
            if self.peek() != Some(b':') {
                return Err(format!("expected ':' at position {}", self.pos));
            }
            self.pos += 1;
            let value = self.parse_value()?;
            obj.set(key, value);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Value::object(obj));
                }
                _ => return Err(format!("expected ',' or '}}' at position {}", self.pos)),
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len()
            && matches!(self.bytes[self.pos], b' ' | b'\t' | b'\n' | b'\r')
        {
            self.pos += 1;
        }
    }
}

fn unescape(s: &str) -> Result<String, String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => result.push('"'),
            Some('\\') => result.push('\\'),
            Some('/') => result.push('/'),
            Some('b') => result.push('\u{0008}'),
            Some('f') => result.push('\u{000C}'),
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('u') => {
                let mut hex = String::new();
                for _ in 0..4 {
                    hex.push(chars.next().ok_or("truncated \\u escape")?);
                }
                let code = u16::from_str_radix(&hex, 16)
                    .map_err(|_| format!("invalid \\u escape `{}`", hex))?;
                // Surrogate pairs are decoded as a pair of \u escapes.
                if (0xD800..0xDC00).contains(&code) {
                    if chars.next() != Some('\\') || chars.next() != Some('u') {
                        return Err("unpaired surrogate in JSON string".to_string());
                    }
                    let mut hex2 = String::new();
                    for _ in 0..4 {
                        hex2.push(chars.next().ok_or("truncated \\u escape")?);
                    }
                    let low = u16::from_str_radix(&hex2, 16)
                        .map_err(|_| format!("invalid \\u escape `{}`", hex2))?;
                    let combined = 0x10000
                        + ((code as u32 - 0xD800) << 10)
                        + (low as u32 - 0xDC00);
                    result.push(
                        char::from_u32(combined)
                            .ok_or("invalid surrogate pair in JSON string")?,
                    );
                } else {
                    result.push(
                        char::from_u32(code as u32)
                            .ok_or("invalid codepoint in JSON string")?,
                    );
                }
            }
            other => return Err(format!("invalid escape `\\{:?}`", other)),
        }
    }
    Ok(result)
}

/// Stringify a value as canonical JSON.
///
/// Object fields serialize in insertion order. Cyclic references are an
/// error, as are values with no JSON representation.
pub fn stringify(value: &Value) -> Result<String, String> {
    let mut output = String::new();
    let mut seen = Vec::new();
    stringify_impl(value, &mut output, &mut seen)?;
    Ok(output)
}

fn stringify_impl(
    value: &Value,
    output: &mut String,
    seen: &mut Vec<usize>,
) -> Result<(), String> {
    match value {
        Value::Null => output.push_str("null"),
        Value::Bool(b) => output.push_str(if *b { "true" } else { "false" }),
        v if v.is_float() => {
            let f = v.as_f64();
            if f.is_nan() || f.is_infinite() {
                return Err("cannot serialize NaN or Infinity".to_string());
            }
            let _ = write!(output, "{}", f);
        }
        v if v.is_numeric() => {
            let _ = write!(output, "{}", v.render());
        }
        Value::Str(s) => {
            output.push('"');
            escape_into(&s.lock().data, output);
            output.push('"');
        }
        Value::Rune(c) => {
            output.push('"');
            escape_into(&c.to_string(), output);
            output.push('"');
        }
        Value::Array(arr) => {
            let addr = Value::Array(arr.clone()).heap_addr().unwrap();
            if seen.contains(&addr) {
                return Err("cyclic reference in serialize".to_string());
            }
            seen.push(addr);
            let elements = arr.lock().elements.clone();
            output.push('[');
            for (i, elem) in elements.iter().enumerate() {
                if i > 0 {
                    output.push(',');
                }
                stringify_impl(elem, output, seen)?;
            }
            output.push(']');
            seen.pop();
        }
        Value::Object(obj) => {
            let addr = Value::Object(obj.clone()).heap_addr().unwrap();
            if seen.contains(&addr) {
                return Err("cyclic reference in serialize".to_string());
            }
            seen.push(addr);
            let entries: Vec<(String, Value)> = obj
                .lock()
                .entries()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            output.push('{');
            for (i, (key, field)) in entries.iter().enumerate() {
                if i > 0 {
                    output.push(',');
                }
                output.push('"');
                escape_into(key, output);
                output.push_str("\":");
                stringify_impl(field, output, seen)?;
            }
            output.push('}');
            seen.pop();
        }
        other => {
            return Err(format!("cannot serialize {}", other.type_name()));
        }
    }
    Ok(())
}

fn escape_into(s: &str, output: &mut String) {
    for c in s.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            '\u{0008}' => output.push_str("\\b"),
            '\u{000C}' => output.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(output, "\\u{:04x}", c as u32);
            }
            c => output.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scalars() {
        assert!(parse("null").unwrap().is_null());
        assert!(matches!(parse("true").unwrap(), Value::Bool(true)));
        assert!(matches!(parse("42").unwrap(), Value::I32(42)));
        assert!(matches!(parse("-3.5").unwrap(), Value::F64(f) if f == -3.5));
        assert!(matches!(parse("1e2").unwrap(), Value::F64(f) if f == 100.0));
        assert_eq!(parse("\"hi\"").unwrap().render(), "hi");
    }

    #[test]
    fn big_integers_become_i64() {
        assert!(matches!(parse("4294967296").unwrap(), Value::I64(4294967296)));
    }

    #[test]
    fn trailing_characters_are_an_error() {
        assert!(parse("1 2").is_err());
        assert!(parse("{} x").is_err());
        assert!(parse("  1  ").is_ok());
    }

    #[test]
    fn parses_nested_structures() {
        let v = parse(r#"{"a": [1, {"b": null}], "c": "d"}"#).unwrap();
        if let Value::Object(o) = &v {
            let obj = o.lock();
            assert_eq!(obj.field_names(), vec!["a", "c"]);
        } else {
            panic!("expected object");
        }
    }

    #[test]
    fn string_escape_round_trip() {
        let v = parse(r#""a\n\t\"\\A""#).unwrap();
        assert_eq!(v.render(), "a\n\t\"\\A");
    }

    #[test]
    fn surrogate_pairs_decode() {
        let v = parse(r#""😀""#).unwrap();
        assert_eq!(v.render(), "\u{1F600}");
    }

    #[test]
    fn serialize_round_trips_through_parse() {
        let source = r#"{"name":"x","n":3,"tags":["a","b"],"ok":true,"none":null}"#;
        let v = parse(source).unwrap();
        let out = stringify(&v).unwrap();
        assert_eq!(out, source);
        let again = parse(&out).unwrap();
        assert_eq!(stringify(&again).unwrap(), source);
    }

    #[test]
    fn cyclic_object_is_an_error() {
        let v = parse(r#"{"a": 1}"#).unwrap();
        if let Value::Object(o) = &v {
            let self_ref = Value::Object(o.clone());
            o.lock().set("self".to_string(), self_ref);
        }
        assert!(stringify(&v).is_err());
    }

    #[test]
    fn malformed_documents_error() {
        assert!(parse("{").is_err());
        assert!(parse("[1,").is_err());
        assert!(parse("{\"a\" 1}").is_err());
        assert!(parse("tru").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn functions_do_not_serialize() {
        // A channel stands in for any non-JSON heap value.
        let ch = Value::Channel(std::sync::Arc::new(crate::channel::Channel::new(1)));
        assert!(stringify(&ch).is_err());
    }
}
