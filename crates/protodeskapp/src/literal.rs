//! # Structured Literals
//!
//! Object, array and shape cells are edited as text in a small literal
//! language: JSON extended with the constructs people actually type into a
//! code box.
//!
//! ```text
//! {
//!   name: "Ada",                      // bare identifier keys
//!   'nick': 'ada',                    // single-quoted strings
//!   price: new Decimal('19.99'),      // decimals
//!   born: new Date('1815-12-10T00:00:00.000Z'),
//!   tags: ["math", "engines",],       // trailing commas
//! }
//! ```
//!
//! The parser only builds values; there is nothing to evaluate. The result of
//! a parse is checked by [`verify_literal`], which accepts only null, booleans,
//! numbers, strings, dates, decimals, arrays and plain records.
//!
//! [`encode_literal`] is the inverse used to seed the editor: it pretty prints
//! with the given indent, or on one line when the indent is zero.

use crate::value::{format_date, format_number, parse_date, Record, Value};
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub message: String,
    pub offset: usize,
}

impl LiteralError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// Parse a literal and verify it only contains plain data.
pub fn parse_literal(source: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser {
        src: source.as_bytes(),
        text: source,
        pos: 0,
    };
    parser.skip_trivia();
    let value = parser.value()?;
    parser.skip_trivia();
    if parser.pos < parser.src.len() {
        return Err(LiteralError::new("Unexpected trailing input", parser.pos));
    }
    verify_literal(&value)?;
    Ok(value)
}

/// Reject anything that is not null/boolean/number/string/date/decimal or an
/// array/record made of those.
pub fn verify_literal(value: &Value) -> Result<(), LiteralError> {
    match value {
        Value::Null
        | Value::Bool(_)
        | Value::Number(_)
        | Value::String(_)
        | Value::Date(_)
        | Value::Decimal(_) => Ok(()),
        Value::Array(items) => items.iter().try_for_each(verify_literal),
        Value::Object(record) => record.values().try_for_each(verify_literal),
        Value::Pointer(_) | Value::File(_) => Err(LiteralError::new("Invalid Object", 0)),
    }
}

/// Encode a value as literal source, indenting nested levels by `space`.
pub fn encode_literal(value: &Value, space: usize) -> String {
    let mut out = String::new();
    write_literal(&mut out, value, space, space);
    out
}

fn write_literal(out: &mut String, value: &Value, space: usize, padding: usize) {
    let newline = if space > 0 { "\n" } else { "" };
    let separator = if space > 0 { ",\n" } else { ", " };
    let indent = " ".repeat(padding);
    let closing = " ".repeat(padding.saturating_sub(space));
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
        Value::Number(v) => out.push_str(&format_number(*v)),
        Value::String(s) => out.push_str(&quote(s)),
        Value::Date(d) => out.push_str(&format!("new Date('{}')", format_date(d))),
        Value::Decimal(d) => out.push_str(&format!("new Decimal('{}')", d)),
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Array(items) => {
            out.push('[');
            out.push_str(newline);
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(separator);
                }
                out.push_str(&indent);
                write_literal(out, item, space, padding + space);
            }
            out.push_str(newline);
            out.push_str(&closing);
            out.push(']');
        }
        Value::Object(record) if record.is_empty() => out.push_str("{}"),
        Value::Object(record) => {
            out.push('{');
            out.push_str(newline);
            for (i, (k, v)) in record.iter().enumerate() {
                if i > 0 {
                    out.push_str(separator);
                }
                out.push_str(&indent);
                if is_identifier(k) {
                    out.push_str(k);
                } else {
                    out.push_str(&quote(k));
                }
                out.push_str(": ");
                write_literal(out, v, space, padding + space);
            }
            out.push_str(newline);
            out.push_str(&closing);
            out.push('}');
        }
        // References are not literals; they print as their wire records.
        Value::Pointer(_) | Value::File(_) => {
            write_literal(out, &Value::from_json(&strip_tag(value)), space, padding)
        }
    }
}

fn strip_tag(value: &Value) -> serde_json::Value {
    match value.to_json() {
        serde_json::Value::Object(map) => {
            let inner = map
                .into_iter()
                .map(|(k, v)| (k.trim_start_matches('$').to_string(), v))
                .collect();
            serde_json::Value::Object(inner)
        }
        other => other,
    }
}

fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

struct Parser<'a> {
    src: &'a [u8],
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, LiteralError> {
        Err(LiteralError::new(message, self.pos))
    }

    fn expect(&mut self, byte: u8) -> Result<(), LiteralError> {
        self.skip_trivia();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            self.error(format!("Expected '{}'", byte as char))
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
                self.pos += 1;
            }
            if self.src[self.pos..].starts_with(b"//") {
                while !matches!(self.peek(), None | Some(b'\n')) {
                    self.pos += 1;
                }
            } else if self.src[self.pos..].starts_with(b"/*") {
                match self.text[self.pos + 2..].find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => self.pos = self.src.len(),
                }
            } else {
                return;
            }
        }
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        self.skip_trivia();
        match self.peek() {
            None => self.error("Unexpected end of input"),
            Some(b'{') => self.record(),
            Some(b'[') => self.array(),
            Some(b'"') | Some(b'\'') => self.string().map(Value::String),
            Some(b) if b == b'-' || b == b'+' || b == b'.' || b.is_ascii_digit() => self.number(),
            Some(b) if b.is_ascii_alphabetic() || b == b'_' || b == b'$' => self.word(),
            Some(b) => self.error(format!("Unexpected character '{}'", b as char)),
        }
    }

    fn identifier(&mut self) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_' || b == b'$')
        {
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }

    fn word(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let word = self.identifier();
        match word {
            "null" | "undefined" => Ok(Value::Null),
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            "new" => {
                self.skip_trivia();
                let ctor_start = self.pos;
                let ctor = self.identifier();
                self.constructor(ctor, ctor_start)
            }
            "Decimal" => self.constructor(word, start),
            _ => Err(LiteralError::new(format!("Unknown identifier '{}'", word), start)),
        }
    }

    fn constructor(&mut self, name: &str, start: usize) -> Result<Value, LiteralError> {
        self.expect(b'(')?;
        self.skip_trivia();
        let arg_start = self.pos;
        let arg = match self.peek() {
            Some(b'"') | Some(b'\'') => self.string()?,
            _ => {
                self.number()?;
                self.text[arg_start..self.pos].to_string()
            }
        };
        self.expect(b')')?;
        match name {
            "Decimal" => Decimal::from_str(arg.trim())
                .or_else(|_| Decimal::from_scientific(arg.trim()))
                .map(Value::Decimal)
                .map_err(|_| LiteralError::new(format!("Invalid decimal '{}'", arg), arg_start)),
            "Date" => parse_date(&arg)
                .map(Value::Date)
                .ok_or_else(|| LiteralError::new(format!("Invalid date '{}'", arg), arg_start)),
            _ => Err(LiteralError::new(format!("Unknown constructor '{}'", name), start)),
        }
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-') | Some(b'+')) {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(b) if b.is_ascii_digit() || b == b'.') {
            self.pos += 1;
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'-') | Some(b'+')) {
                self.pos += 1;
            }
            while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text = &self.text[start..self.pos];
        text.parse::<f64>()
            .map(Value::Number)
            .map_err(|_| LiteralError::new(format!("Invalid number '{}'", text), start))
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let quote = self.src[self.pos];
        self.pos += 1;
        let mut out = String::new();
        loop {
            let Some(c) = self.text[self.pos..].chars().next() else {
                return self.error("Unterminated string");
            };
            self.pos += c.len_utf8();
            match c {
                c if c as u32 == quote as u32 => return Ok(out),
                '\n' => return self.error("Unterminated string"),
                '\\' => out.push(self.escape()?),
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self) -> Result<char, LiteralError> {
        let Some(c) = self.peek() else {
            return self.error("Unterminated escape");
        };
        self.pos += 1;
        Ok(match c {
            b'n' => '\n',
            b't' => '\t',
            b'r' => '\r',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'0' => '\0',
            b'u' => {
                let hex = self.text.get(self.pos..self.pos + 4).unwrap_or("");
                let code = u32::from_str_radix(hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| LiteralError::new("Invalid unicode escape", self.pos))?;
                self.pos += 4;
                code
            }
            _ => {
                // Any other escaped character stands for itself.
                self.pos -= 1;
                let ch = self.text[self.pos..].chars().next().unwrap_or('\\');
                self.pos += ch.len_utf8();
                ch
            }
        })
    }

    fn array(&mut self) -> Result<Value, LiteralError> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some(b']') {
                self.pos += 1;
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);
            self.skip_trivia();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {}
                _ => return self.error("Expected ',' or ']'"),
            }
        }
    }

    fn record(&mut self) -> Result<Value, LiteralError> {
        self.pos += 1;
        let mut record = Record::new();
        loop {
            self.skip_trivia();
            let key = match self.peek() {
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Value::Object(record));
                }
                Some(b'"') | Some(b'\'') => self.string()?,
                Some(b) if b.is_ascii_alphanumeric() || b == b'_' || b == b'$' => {
                    self.identifier().to_string()
                }
                _ => return self.error("Expected a key"),
            };
            self.expect(b':')?;
            let value = self.value()?;
            record.insert(key, value);
            self.skip_trivia();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {}
                _ => return self.error("Expected ',' or '}'"),
            }
        }
    }
}
