//! The pull tokenizer.
//!
//! [`JsonReader`] reads a JSON document from a [`CharSource`] as a stream of
//! tokens in depth-first order. Tokens are discovered by a peek phase that
//! classifies the next token without consuming it, and consumed by the
//! `begin_*` / `end_*` / `next_*` methods, which also maintain the JSONPath
//! trace used in diagnostics.
//!
//! The reader decodes literals directly out of a fixed lookahead buffer, so
//! the buffer must be at least as long as the longest token that can be
//! reported as a number. Number literals that outgrow it are handed to the
//! lenient unquoted-literal path instead.

use alloc::{
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};
use core::fmt;
use core::fmt::Write as _;

use crate::{error::Error, scope::JsonScope, source::CharSource, token::JsonToken};

/// Sized to hold the longest token reportable as a number without
/// allocation.
const BUFFER_SIZE: usize = 1024;

/// Smallest value a running negative total may hold and still accept one
/// more digit without leaving the i64 range.
const MIN_INCOMPLETE_INTEGER: i64 = i64::MIN / 10;

/// The memoized classification of the next token. `None` means the next
/// operation must re-peek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Peeked {
    None,
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    True,
    False,
    Null,
    SingleQuoted,
    DoubleQuoted,
    Unquoted,
    /// The string value is already decoded into `peeked_string`.
    Buffered,
    SingleQuotedName,
    DoubleQuotedName,
    UnquotedName,
    /// The integer value is stored in `peeked_long`.
    Long,
    /// `peeked_number_length` characters at `pos` form the literal.
    Number,
    Eof,
}

/// States of the number DFA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumberChar {
    None,
    Sign,
    Digit,
    Decimal,
    FractionDigit,
    ExpE,
    ExpSign,
    ExpDigit,
}

/// Reads a JSON-encoded value from a [`CharSource`] as a stream of tokens.
///
/// The reader is strict by default and accepts only RFC 7159; see
/// [`set_lenient`](JsonReader::set_lenient) for the relaxed dialect. Each
/// reader consumes a single stream and is not thread safe.
///
/// # Examples
///
/// ```rust
/// use jsonpull::{JsonReader, StringSource};
///
/// let mut reader = JsonReader::new(StringSource::new(r#"[1, "two", true]"#));
/// reader.begin_array().unwrap();
/// assert_eq!(reader.next_i64().unwrap(), 1);
/// assert_eq!(reader.next_string().unwrap(), "two");
/// assert!(reader.next_bool().unwrap());
/// reader.end_array().unwrap();
/// ```
pub struct JsonReader<S> {
    source: S,

    /// True to accept the relaxed dialect.
    lenient: bool,

    /// Lookahead buffer. `pos` is the next unread offset, `limit` one past
    /// the last valid one; `0 <= pos <= limit <= buffer.len()` always holds.
    buffer: Vec<char>,
    pos: usize,
    limit: usize,

    /// Newlines seen so far.
    line_number: usize,
    /// Buffer offset of the current line start. Shifted by `-pos` on every
    /// refill, so it can be negative when a line outlives a buffer window.
    line_start: isize,

    peeked: Peeked,

    /// A peeked integer literal, valid when `peeked` is `Long`. Composed
    /// entirely of digits with an optional leading dash; positive values may
    /// not have a leading 0.
    peeked_long: i64,

    /// Length of a peeked number literal starting at `pos`, valid when
    /// `peeked` is `Number`.
    peeked_number_length: usize,

    /// A string to be delivered by the next string or number accessor,
    /// valid when `peeked` is `Buffered`. Populated before a numeric parse
    /// so the literal survives a conversion failure.
    peeked_string: Option<String>,

    /// The nesting stack, never empty. `path_names` and `path_indices` run
    /// parallel to it: object frames carry the most recent name, array
    /// frames the index of the current element.
    stack: Vec<JsonScope>,
    path_names: Vec<Option<String>>,
    path_indices: Vec<usize>,
}

impl<S: CharSource> JsonReader<S> {
    /// Creates a new reader consuming `source`.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            source,
            lenient: false,
            buffer: vec!['\0'; BUFFER_SIZE],
            pos: 0,
            limit: 0,
            line_number: 0,
            line_start: 0,
            peeked: Peeked::None,
            peeked_long: 0,
            peeked_number_length: 0,
            peeked_string: None,
            stack: vec![JsonScope::EmptyDocument],
            path_names: vec![None],
            path_indices: vec![0],
        }
    }

    /// Configures the reader to be liberal in what it accepts. Beyond
    /// RFC 7159, the lenient dialect allows:
    ///
    /// - the non-execute prefix `")]}'\n"` at the start of the stream
    /// - multiple top-level values
    /// - numbers that are `NaN` or infinities
    /// - `//`, `#` end-of-line comments and non-nesting `/* */` comments
    /// - unquoted or `'single quoted'` names and strings
    /// - `;` instead of `,` as an element or member separator
    /// - unnecessary array separators, read as if `null` were the value
    /// - `=` or `=>` instead of `:` between names and values
    /// - a trailing separator before an object's closing brace
    pub fn set_lenient(&mut self, lenient: bool) {
        self.lenient = lenient;
    }

    /// Returns true if this reader is liberal in what it accepts.
    #[must_use]
    pub fn is_lenient(&self) -> bool {
        self.lenient
    }

    /// Consumes the next token and asserts that it is the beginning of a new
    /// array.
    pub fn begin_array(&mut self) -> Result<(), Error> {
        let p = self.require_peek()?;
        if p == Peeked::BeginArray {
            self.push(JsonScope::EmptyArray);
            self.peeked = Peeked::None;
            Ok(())
        } else {
            Err(self.expected_token_error(JsonToken::BeginArray, p))
        }
    }

    /// Consumes the next token and asserts that it is the end of the current
    /// array.
    pub fn end_array(&mut self) -> Result<(), Error> {
        let p = self.require_peek()?;
        if p == Peeked::EndArray {
            self.pop();
            self.increment_path_index();
            self.peeked = Peeked::None;
            Ok(())
        } else {
            Err(self.expected_token_error(JsonToken::EndArray, p))
        }
    }

    /// Consumes the next token and asserts that it is the beginning of a new
    /// object.
    pub fn begin_object(&mut self) -> Result<(), Error> {
        let p = self.require_peek()?;
        if p == Peeked::BeginObject {
            self.push(JsonScope::EmptyObject);
            self.peeked = Peeked::None;
            Ok(())
        } else {
            Err(self.expected_token_error(JsonToken::BeginObject, p))
        }
    }

    /// Consumes the next token and asserts that it is the end of the current
    /// object.
    pub fn end_object(&mut self) -> Result<(), Error> {
        let p = self.require_peek()?;
        if p == Peeked::EndObject {
            self.pop();
            self.increment_path_index();
            self.peeked = Peeked::None;
            Ok(())
        } else {
            Err(self.expected_token_error(JsonToken::EndObject, p))
        }
    }

    /// Returns true if the current array or object has another element.
    pub fn has_next(&mut self) -> Result<bool, Error> {
        let p = self.require_peek()?;
        Ok(p != Peeked::EndObject && p != Peeked::EndArray)
    }

    /// Returns the kind of the next token without consuming it.
    pub fn peek(&mut self) -> Result<JsonToken, Error> {
        let p = self.require_peek()?;
        Ok(Self::token_of(p))
    }

    /// Consumes the next token, asserting that it is a property name, and
    /// returns the decoded string. The name is recorded into the path trace
    /// at the current depth.
    pub fn next_name(&mut self) -> Result<String, Error> {
        let p = self.require_peek()?;
        let result = match p {
            Peeked::UnquotedName => self.next_unquoted_value()?,
            Peeked::SingleQuotedName => self.next_quoted_value('\'')?,
            Peeked::DoubleQuotedName => self.next_quoted_value('"')?,
            _ => return Err(self.expected_kind_error("a name", p)),
        };
        self.peeked = Peeked::None;
        if let Some(slot) = self.path_names.last_mut() {
            *slot = Some(result.clone());
        }
        Ok(result)
    }

    /// Consumes the next token, asserting that it is a string, and returns
    /// its value. If the next token is a number it is returned in its
    /// textual form.
    pub fn next_string(&mut self) -> Result<String, Error> {
        let p = self.require_peek()?;
        let result = match p {
            Peeked::Unquoted => self.next_unquoted_value()?,
            Peeked::SingleQuoted => self.next_quoted_value('\'')?,
            Peeked::DoubleQuoted => self.next_quoted_value('"')?,
            Peeked::Buffered => self.peeked_string.take().unwrap_or_default(),
            Peeked::Long => self.peeked_long.to_string(),
            Peeked::Number => {
                let result: String = self.buffer[self.pos..self.pos + self.peeked_number_length]
                    .iter()
                    .collect();
                self.pos += self.peeked_number_length;
                result
            }
            _ => return Err(self.expected_kind_error("a string", p)),
        };
        self.peeked = Peeked::None;
        self.increment_path_index();
        Ok(result)
    }

    /// Consumes the next token, asserting that it is a boolean, and returns
    /// its value.
    pub fn next_bool(&mut self) -> Result<bool, Error> {
        let p = self.require_peek()?;
        match p {
            Peeked::True => {
                self.peeked = Peeked::None;
                self.increment_path_index();
                Ok(true)
            }
            Peeked::False => {
                self.peeked = Peeked::None;
                self.increment_path_index();
                Ok(false)
            }
            _ => Err(self.expected_kind_error("a boolean", p)),
        }
    }

    /// Consumes the next token, asserting that it is a literal `null`.
    pub fn next_null(&mut self) -> Result<(), Error> {
        let p = self.require_peek()?;
        if p == Peeked::Null {
            self.peeked = Peeked::None;
            self.increment_path_index();
            Ok(())
        } else {
            Err(self.expected_kind_error("null", p))
        }
    }

    /// Consumes the next token as an `f64`. Strings are parsed; in strict
    /// mode NaN and infinities are rejected.
    pub fn next_f64(&mut self) -> Result<f64, Error> {
        let p = self.require_peek()?;

        if p == Peeked::Long {
            self.peeked = Peeked::None;
            self.increment_path_index();
            #[allow(clippy::cast_precision_loss)]
            let widened = self.peeked_long as f64;
            return Ok(widened);
        }

        match p {
            Peeked::Number => self.buffer_peeked_number(),
            Peeked::SingleQuoted | Peeked::DoubleQuoted => {
                let value = self.next_quoted_value(Self::quote_of(p))?;
                self.peeked_string = Some(value);
            }
            Peeked::Unquoted => {
                let value = self.next_unquoted_value()?;
                self.peeked_string = Some(value);
            }
            Peeked::Buffered => {}
            _ => return Err(self.expected_kind_error("an f64", p)),
        }

        // Keep the literal buffered so a failed parse leaves it consumable
        // as a string.
        self.peeked = Peeked::Buffered;
        let result = match self.peeked_string.as_deref().unwrap_or_default().parse() {
            Ok(value) => value,
            Err(_) => {
                let literal = self.peeked_string.as_deref().unwrap_or_default();
                return Err(self.number_error(format!("Expected an f64 but was {literal}")));
            }
        };
        if !self.lenient && !f64::is_finite(result) {
            return Err(self.syntax_error(format!("JSON forbids NaN and infinities: {result}")));
        }
        self.peeked_string = None;
        self.peeked = Peeked::None;
        self.increment_path_index();
        Ok(result)
    }

    /// Consumes the next token as an `i64`. Strings are parsed as an integer
    /// first, then as a double whose conversion must be lossless.
    pub fn next_i64(&mut self) -> Result<i64, Error> {
        let p = self.require_peek()?;

        if p == Peeked::Long {
            self.peeked = Peeked::None;
            self.increment_path_index();
            return Ok(self.peeked_long);
        }

        match p {
            Peeked::Number => self.buffer_peeked_number(),
            Peeked::SingleQuoted | Peeked::DoubleQuoted | Peeked::Unquoted => {
                let value = if p == Peeked::Unquoted {
                    self.next_unquoted_value()?
                } else {
                    self.next_quoted_value(Self::quote_of(p))?
                };
                if let Ok(result) = value.parse::<i64>() {
                    self.peeked = Peeked::None;
                    self.increment_path_index();
                    return Ok(result);
                }
                // Fall back to parsing as a double below.
                self.peeked_string = Some(value);
            }
            Peeked::Buffered => {}
            _ => return Err(self.expected_kind_error("an i64", p)),
        }

        self.peeked = Peeked::Buffered;
        let as_double = self.parse_buffered_f64("an i64")?;
        #[allow(clippy::cast_possible_truncation)]
        let result = as_double as i64;
        #[allow(clippy::cast_precision_loss)]
        let roundtrip = result as f64;
        if roundtrip != as_double {
            // Precision was lost narrowing to an integer.
            let literal = self.peeked_string.as_deref().unwrap_or_default();
            return Err(self.number_error(format!("Expected an i64 but was {literal}")));
        }
        self.peeked_string = None;
        self.peeked = Peeked::None;
        self.increment_path_index();
        Ok(result)
    }

    /// Consumes the next token as an `i32`; see [`next_i64`](Self::next_i64)
    /// for the coercion rules.
    pub fn next_i32(&mut self) -> Result<i32, Error> {
        let p = self.require_peek()?;

        if p == Peeked::Long {
            #[allow(clippy::cast_possible_truncation)]
            let result = self.peeked_long as i32;
            if i64::from(result) != self.peeked_long {
                let literal = self.peeked_long;
                return Err(self.number_error(format!("Expected an i32 but was {literal}")));
            }
            self.peeked = Peeked::None;
            self.increment_path_index();
            return Ok(result);
        }

        match p {
            Peeked::Number => self.buffer_peeked_number(),
            Peeked::SingleQuoted | Peeked::DoubleQuoted | Peeked::Unquoted => {
                let value = if p == Peeked::Unquoted {
                    self.next_unquoted_value()?
                } else {
                    self.next_quoted_value(Self::quote_of(p))?
                };
                if let Ok(result) = value.parse::<i32>() {
                    self.peeked = Peeked::None;
                    self.increment_path_index();
                    return Ok(result);
                }
                // Fall back to parsing as a double below.
                self.peeked_string = Some(value);
            }
            Peeked::Buffered => {}
            _ => return Err(self.expected_kind_error("an i32", p)),
        }

        self.peeked = Peeked::Buffered;
        let as_double = self.parse_buffered_f64("an i32")?;
        #[allow(clippy::cast_possible_truncation)]
        let result = as_double as i32;
        if f64::from(result) != as_double {
            let literal = self.peeked_string.as_deref().unwrap_or_default();
            return Err(self.number_error(format!("Expected an i32 but was {literal}")));
        }
        self.peeked_string = None;
        self.peeked = Peeked::None;
        self.increment_path_index();
        Ok(result)
    }

    /// Skips the next value recursively. If it is an object or array, all
    /// nested elements are skipped too.
    pub fn skip_value(&mut self) -> Result<(), Error> {
        let mut count = 0i32;
        loop {
            let p = self.require_peek()?;
            match p {
                Peeked::BeginArray => {
                    self.push(JsonScope::EmptyArray);
                    count += 1;
                }
                Peeked::BeginObject => {
                    self.push(JsonScope::EmptyObject);
                    count += 1;
                }
                Peeked::EndArray | Peeked::EndObject => {
                    self.pop();
                    count -= 1;
                }
                Peeked::UnquotedName | Peeked::Unquoted => self.skip_unquoted_value()?,
                Peeked::SingleQuoted | Peeked::SingleQuotedName => self.skip_quoted_value('\'')?,
                Peeked::DoubleQuoted | Peeked::DoubleQuotedName => self.skip_quoted_value('"')?,
                Peeked::Number => self.pos += self.peeked_number_length,
                _ => {}
            }
            self.peeked = Peeked::None;
            if count == 0 {
                break;
            }
        }

        self.increment_path_index();
        if let Some(slot) = self.path_names.last_mut() {
            *slot = Some(String::from("null"));
        }
        Ok(())
    }

    /// Re-tags a peeked object name so that it can be consumed with the
    /// string or number accessors instead of [`next_name`](Self::next_name).
    pub fn promote_name_to_value(&mut self) -> Result<(), Error> {
        let p = self.require_peek()?;
        self.peeked = match p {
            Peeked::DoubleQuotedName => Peeked::DoubleQuoted,
            Peeked::SingleQuotedName => Peeked::SingleQuoted,
            Peeked::UnquotedName => Peeked::Unquoted,
            _ => return Err(self.expected_kind_error("a name", p)),
        };
        Ok(())
    }

    /// Closes the reader. Every subsequent operation fails with a state
    /// error; the source is released when the reader is dropped.
    pub fn close(&mut self) {
        self.peeked = Peeked::None;
        self.peeked_string = None;
        self.stack.clear();
        self.stack.push(JsonScope::Closed);
        self.path_names.clear();
        self.path_names.push(None);
        self.path_indices.clear();
        self.path_indices.push(0);
    }

    /// Returns a [JSONPath](https://goessner.net/articles/JsonPath/) to the
    /// current location in the document, such as `$.store.book[2].title`.
    #[must_use]
    pub fn path(&self) -> String {
        let mut result = String::from("$");
        for (i, scope) in self.stack.iter().enumerate() {
            match scope {
                JsonScope::EmptyArray | JsonScope::NonemptyArray => {
                    let _ = write!(result, "[{}]", self.path_indices[i]);
                }
                JsonScope::EmptyObject | JsonScope::DanglingName | JsonScope::NonemptyObject => {
                    result.push('.');
                    if let Some(name) = &self.path_names[i] {
                        result.push_str(name);
                    }
                }
                JsonScope::EmptyDocument | JsonScope::NonemptyDocument | JsonScope::Closed => {}
            }
        }
        result
    }

    // --------------------------------------------------------------------
    // Token discovery
    // --------------------------------------------------------------------

    fn require_peek(&mut self) -> Result<Peeked, Error> {
        match self.peeked {
            Peeked::None => self.do_peek(),
            p => Ok(p),
        }
    }

    fn do_peek(&mut self) -> Result<Peeked, Error> {
        let peek_stack = self.top_scope();
        match peek_stack {
            JsonScope::EmptyArray => self.set_top_scope(JsonScope::NonemptyArray),
            JsonScope::NonemptyArray => {
                // Look for a separator before the next element.
                match self.next_non_whitespace()? {
                    ']' => return Ok(self.set_peeked(Peeked::EndArray)),
                    ';' => self.check_lenient()?,
                    ',' => {}
                    _ => return Err(self.syntax_error("Unterminated array")),
                }
            }
            JsonScope::EmptyObject | JsonScope::NonemptyObject => {
                self.set_top_scope(JsonScope::DanglingName);
                // Look for a separator before the next member.
                if peek_stack == JsonScope::NonemptyObject {
                    match self.next_non_whitespace()? {
                        '}' => return Ok(self.set_peeked(Peeked::EndObject)),
                        ';' => self.check_lenient()?,
                        ',' => {}
                        _ => return Err(self.syntax_error("Unterminated object")),
                    }
                }
                let c = self.next_non_whitespace()?;
                match c {
                    '"' => return Ok(self.set_peeked(Peeked::DoubleQuotedName)),
                    '\'' => {
                        self.check_lenient()?;
                        return Ok(self.set_peeked(Peeked::SingleQuotedName));
                    }
                    '}' => {
                        if peek_stack != JsonScope::NonemptyObject {
                            return Ok(self.set_peeked(Peeked::EndObject));
                        }
                        // A separator directly before the closing brace is a
                        // trailing comma, tolerated only in lenient mode.
                        self.check_lenient()?;
                        return Ok(self.set_peeked(Peeked::EndObject));
                    }
                    _ => {
                        self.check_lenient()?;
                        self.pos -= 1; // the first character of an unquoted name stays unread
                        if self.is_literal(c)? {
                            return Ok(self.set_peeked(Peeked::UnquotedName));
                        }
                        return Err(self.syntax_error("Expected name"));
                    }
                }
            }
            JsonScope::DanglingName => {
                self.set_top_scope(JsonScope::NonemptyObject);
                // Look for the name/value separator.
                match self.next_non_whitespace()? {
                    ':' => {}
                    '=' => {
                        self.check_lenient()?;
                        if (self.pos < self.limit || self.fill_buffer(1)?)
                            && self.buffer[self.pos] == '>'
                        {
                            self.pos += 1;
                        }
                    }
                    _ => return Err(self.syntax_error("Expected ':'")),
                }
            }
            JsonScope::EmptyDocument => {
                if self.lenient {
                    self.consume_non_execute_prefix()?;
                }
                self.set_top_scope(JsonScope::NonemptyDocument);
            }
            JsonScope::NonemptyDocument => match self.next_non_whitespace_opt()? {
                None => return Ok(self.set_peeked(Peeked::Eof)),
                Some(_) => {
                    self.check_lenient()?;
                    self.pos -= 1;
                }
            },
            JsonScope::Closed => return Err(self.state_error("JsonReader is closed".to_string())),
        }

        let c = self.next_non_whitespace()?;
        match c {
            ']' if peek_stack == JsonScope::EmptyArray => {
                return Ok(self.set_peeked(Peeked::EndArray));
            }
            // A separator with no value before it reads as null, but only
            // inside an array and only in lenient mode.
            ']' | ';' | ',' => {
                if peek_stack == JsonScope::EmptyArray || peek_stack == JsonScope::NonemptyArray {
                    self.check_lenient()?;
                    self.pos -= 1;
                    return Ok(self.set_peeked(Peeked::Null));
                }
                return Err(self.syntax_error("Unexpected value"));
            }
            '\'' => {
                self.check_lenient()?;
                return Ok(self.set_peeked(Peeked::SingleQuoted));
            }
            '"' => return Ok(self.set_peeked(Peeked::DoubleQuoted)),
            '[' => return Ok(self.set_peeked(Peeked::BeginArray)),
            '{' => return Ok(self.set_peeked(Peeked::BeginObject)),
            _ => self.pos -= 1, // the first character of a literal value stays unread
        }

        if let Some(p) = self.peek_keyword()? {
            return Ok(p);
        }
        if let Some(p) = self.peek_number()? {
            return Ok(p);
        }

        let c = self.buffer[self.pos];
        if !self.is_literal(c)? {
            return Err(self.syntax_error("Expected value"));
        }
        self.check_lenient()?;
        Ok(self.set_peeked(Peeked::Unquoted))
    }

    /// Matches `true`, `false` or `null` at `pos`. Other casings only match
    /// in lenient mode.
    fn peek_keyword(&mut self) -> Result<Option<Peeked>, Error> {
        let (keyword, peeking) = match self.buffer[self.pos] {
            't' | 'T' => ("true", Peeked::True),
            'f' | 'F' => ("false", Peeked::False),
            'n' | 'N' => ("null", Peeked::Null),
            _ => return Ok(None),
        };

        // Confirm that chars [0..length) match the keyword.
        let length = keyword.len();
        let mut exact = true;
        for (i, k) in keyword.bytes().enumerate() {
            if self.pos + i >= self.limit && !self.fill_buffer(i + 1)? {
                return Ok(None);
            }
            let c = self.buffer[self.pos + i];
            if c != k as char {
                if c.to_ascii_lowercase() != k as char {
                    return Ok(None);
                }
                exact = false;
            }
        }

        if (self.pos + length < self.limit || self.fill_buffer(length + 1)?)
            && self.is_literal(self.buffer[self.pos + length])?
        {
            return Ok(None); // don't match trues, falsey or nullsoft
        }
        if !exact {
            self.check_lenient()?;
        }

        // The keyword is followed by EOF or by a non-literal character.
        self.pos += length;
        Ok(Some(self.set_peeked(peeking)))
    }

    /// Scans forward over a number literal without advancing `pos`,
    /// accumulating its value as a negative running total so the full
    /// negative range is representable. Returns `None` when the characters
    /// do not form a number the buffer can hold, letting the caller fall
    /// back to the unquoted-literal path.
    fn peek_number(&mut self) -> Result<Option<Peeked>, Error> {
        let mut p = self.pos;
        let mut l = self.limit;

        let mut value: i64 = 0;
        let mut negative = false;
        let mut fits_in_long = true;
        let mut last = NumberChar::None;

        let mut i = 0;
        'characters: loop {
            if p + i == l {
                if i == self.buffer.len() {
                    // Looks like a well-formed number, but it is too long to
                    // keep in the buffer. Surrender it to the application as
                    // an unquoted literal.
                    return Ok(None);
                }
                if !self.fill_buffer(i + 1)? {
                    break 'characters;
                }
                p = self.pos;
                l = self.limit;
            }

            let c = self.buffer[p + i];
            match c {
                '-' => {
                    if last == NumberChar::None {
                        negative = true;
                        last = NumberChar::Sign;
                    } else if last == NumberChar::ExpE {
                        last = NumberChar::ExpSign;
                    } else {
                        return Ok(None);
                    }
                }
                '+' => {
                    if last == NumberChar::ExpE {
                        last = NumberChar::ExpSign;
                    } else {
                        return Ok(None);
                    }
                }
                'e' | 'E' => {
                    if last == NumberChar::Digit || last == NumberChar::FractionDigit {
                        last = NumberChar::ExpE;
                    } else {
                        return Ok(None);
                    }
                }
                '.' => {
                    if last == NumberChar::Digit {
                        last = NumberChar::Decimal;
                    } else {
                        return Ok(None);
                    }
                }
                _ => {
                    if !c.is_ascii_digit() {
                        if !self.is_literal(c)? {
                            break 'characters;
                        }
                        return Ok(None);
                    }
                    let digit = i64::from(c as u8 - b'0');
                    if last == NumberChar::Sign || last == NumberChar::None {
                        value = -digit;
                        last = NumberChar::Digit;
                    } else if last == NumberChar::Digit {
                        if value == 0 {
                            return Ok(None); // a leading '0' prefix could be octal
                        }
                        let new_value = value.wrapping_mul(10).wrapping_sub(digit);
                        fits_in_long &= value > MIN_INCOMPLETE_INTEGER
                            || (value == MIN_INCOMPLETE_INTEGER && new_value < value);
                        value = new_value;
                    } else if last == NumberChar::Decimal {
                        last = NumberChar::FractionDigit;
                    } else if last == NumberChar::ExpE || last == NumberChar::ExpSign {
                        last = NumberChar::ExpDigit;
                    }
                }
            }
            i += 1;
        }

        // A complete number; decide between the integer and decimal tags.
        // `-0` is deliberately excluded so it keeps its sign as a double.
        if last == NumberChar::Digit
            && fits_in_long
            && (value != i64::MIN || negative)
            && (value != 0 || !negative)
        {
            self.peeked_long = if negative { value } else { -value };
            self.pos += i;
            Ok(Some(self.set_peeked(Peeked::Long)))
        } else if last == NumberChar::Digit
            || last == NumberChar::FractionDigit
            || last == NumberChar::ExpDigit
        {
            self.peeked_number_length = i;
            Ok(Some(self.set_peeked(Peeked::Number)))
        } else {
            Ok(None)
        }
    }

    /// Returns false for characters that terminate an unquoted literal. The
    /// first group is only allowed to do so in lenient mode.
    fn is_literal(&mut self, c: char) -> Result<bool, Error> {
        match c {
            '/' | '\\' | ';' | '#' | '=' => {
                self.check_lenient()?;
                Ok(false)
            }
            '{' | '}' | '[' | ']' | ':' | ',' | ' ' | '\t' | '\u{0C}' | '\r' | '\n' => Ok(false),
            _ => Ok(true),
        }
    }

    // --------------------------------------------------------------------
    // String decoding
    // --------------------------------------------------------------------

    /// Returns the string up to but not including `quote`, unescaping any
    /// escape sequences encountered along the way. The opening quote has
    /// already been read; the closing quote is consumed but not returned.
    fn next_quoted_value(&mut self, quote: char) -> Result<String, Error> {
        let mut builder: Option<String> = None;
        loop {
            let mut p = self.pos;
            let mut l = self.limit;
            // The offset of the first character not yet appended.
            let mut start = p;
            while p < l {
                let c = self.buffer[p];
                p += 1;

                if c == quote {
                    self.pos = p;
                    let tail = &self.buffer[start..p - 1];
                    return Ok(match builder {
                        None => tail.iter().collect(),
                        Some(mut b) => {
                            b.extend(tail);
                            b
                        }
                    });
                } else if c == '\\' {
                    self.pos = p;
                    let len = p - start - 1;
                    let b = builder.get_or_insert_with(|| String::with_capacity(
                        ((len + 1) * 2).max(16),
                    ));
                    b.extend(&self.buffer[start..p - 1]);
                    let escaped = self.read_escape_character()?;
                    b.push(escaped);
                    p = self.pos;
                    l = self.limit;
                    start = p;
                } else if c == '\n' {
                    self.line_number += 1;
                    self.line_start = p as isize;
                }
            }

            let b = builder.get_or_insert_with(|| String::with_capacity(((p - start) * 2).max(16)));
            b.extend(&self.buffer[start..p]);
            self.pos = p;
            if !self.fill_buffer(1)? {
                return Err(self.syntax_error_eof("Unterminated string"));
            }
        }
    }

    /// Returns an unquoted value as a string. Values longer than the buffer
    /// spill into a growing builder.
    fn next_unquoted_value(&mut self) -> Result<String, Error> {
        let mut builder: Option<String> = None;
        let mut i = 0;

        'find: loop {
            while self.pos + i < self.limit {
                let c = self.buffer[self.pos + i];
                if !self.is_literal(c)? {
                    break 'find;
                }
                i += 1;
            }

            // Attempt to load the entire literal into the buffer at once.
            if i < self.buffer.len() {
                if self.fill_buffer(i + 1)? {
                    continue;
                }
                break;
            }

            // The value fills the buffer; it is too long to be a number.
            let b = builder.get_or_insert_with(|| String::with_capacity(i.max(16)));
            b.extend(&self.buffer[self.pos..self.pos + i]);
            self.pos += i;
            i = 0;
            if !self.fill_buffer(1)? {
                break;
            }
        }

        let result = match builder {
            None => self.buffer[self.pos..self.pos + i].iter().collect(),
            Some(mut b) => {
                b.extend(&self.buffer[self.pos..self.pos + i]);
                b
            }
        };
        self.pos += i;
        Ok(result)
    }

    fn skip_quoted_value(&mut self, quote: char) -> Result<(), Error> {
        loop {
            let mut p = self.pos;
            let mut l = self.limit;
            while p < l {
                let c = self.buffer[p];
                p += 1;
                if c == quote {
                    self.pos = p;
                    return Ok(());
                } else if c == '\\' {
                    self.pos = p;
                    self.read_escape_character()?;
                    p = self.pos;
                    l = self.limit;
                } else if c == '\n' {
                    self.line_number += 1;
                    self.line_start = p as isize;
                }
            }
            self.pos = p;
            if !self.fill_buffer(1)? {
                return Err(self.syntax_error_eof("Unterminated string"));
            }
        }
    }

    fn skip_unquoted_value(&mut self) -> Result<(), Error> {
        loop {
            let mut i = 0;
            while self.pos + i < self.limit {
                let c = self.buffer[self.pos + i];
                if !self.is_literal(c)? {
                    self.pos += i;
                    return Ok(());
                }
                i += 1;
            }
            self.pos += i;
            if !self.fill_buffer(1)? {
                return Ok(());
            }
        }
    }

    /// Unescapes the character or characters that immediately follow a
    /// backslash; the backslash itself has already been read. `\uXXXX`
    /// escapes forming a UTF-16 surrogate pair are combined into a single
    /// character.
    fn read_escape_character(&mut self) -> Result<char, Error> {
        if self.pos == self.limit && !self.fill_buffer(1)? {
            return Err(self.syntax_error_eof("Unterminated escape sequence"));
        }

        let escaped = self.buffer[self.pos];
        self.pos += 1;
        match escaped {
            'u' => {
                let high = self.read_unicode_escape()?;
                if let Some(c) = char::from_u32(high) {
                    return Ok(c);
                }
                if !(0xD800..0xDC00).contains(&high) {
                    return Err(self.syntax_error("Unpaired surrogate escape"));
                }
                // A high surrogate; the low half must follow as another
                // escape so the pair can form one scalar value.
                if self.pos + 2 > self.limit && !self.fill_buffer(2)? {
                    return Err(self.syntax_error_eof("Unterminated escape sequence"));
                }
                if self.buffer[self.pos] != '\\' || self.buffer[self.pos + 1] != 'u' {
                    return Err(self.syntax_error("Unpaired surrogate escape"));
                }
                self.pos += 2;
                let low = self.read_unicode_escape()?;
                if !(0xDC00..0xE000).contains(&low) {
                    return Err(self.syntax_error("Unpaired surrogate escape"));
                }
                let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                match char::from_u32(code) {
                    Some(c) => Ok(c),
                    None => Err(self.syntax_error("Unpaired surrogate escape")),
                }
            }

            't' => Ok('\t'),
            'b' => Ok('\u{0008}'),
            'n' => Ok('\n'),
            'r' => Ok('\r'),
            'f' => Ok('\u{000C}'),

            '\n' => {
                self.line_number += 1;
                self.line_start = self.pos as isize;
                Ok('\n')
            }

            '\'' | '"' | '\\' | '/' => Ok(escaped),
            _ => Err(self.syntax_error("Invalid escape sequence")),
        }
    }

    /// Reads exactly four hex digits.
    fn read_unicode_escape(&mut self) -> Result<u32, Error> {
        if self.pos + 4 > self.limit && !self.fill_buffer(4)? {
            return Err(self.syntax_error_eof("Unterminated escape sequence"));
        }
        let mut result = 0u32;
        for i in self.pos..self.pos + 4 {
            let c = self.buffer[i];
            result <<= 4;
            match c.to_digit(16) {
                Some(digit) => result += digit,
                None => {
                    let digits: String = self.buffer[self.pos..self.pos + 4].iter().collect();
                    return Err(self.syntax_error(format!("Malformed \\uxxxx escape: \\u{digits}")));
                }
            }
        }
        self.pos += 4;
        Ok(result)
    }

    // --------------------------------------------------------------------
    // Whitespace, comments, refill
    // --------------------------------------------------------------------

    /// Ensures `limit - pos >= minimum`, shifting the unread window to the
    /// start of the buffer and reading more characters from the source.
    /// Returns false if the data runs out first. Callers must reload any
    /// cached copies of `pos` and `limit` afterwards.
    fn fill_buffer(&mut self, mut minimum: usize) -> Result<bool, Error> {
        self.line_start -= self.pos as isize;
        if self.limit != self.pos {
            self.limit -= self.pos;
            self.buffer.copy_within(self.pos..self.pos + self.limit, 0);
        } else {
            self.limit = 0;
        }
        self.pos = 0;

        loop {
            let total = self.source.read(&mut self.buffer[self.limit..])?;
            if total == 0 {
                return Ok(false);
            }
            self.limit += total;

            // On the very first read, consume a byte order mark if present.
            if self.line_number == 0 && self.line_start == 0 && self.buffer[0] == '\u{FEFF}' {
                self.pos += 1;
                self.line_start += 1;
                minimum += 1;
            }

            if self.limit >= minimum {
                return Ok(true);
            }
        }
    }

    /// Returns the next character that is neither whitespace nor part of a
    /// comment, or a malformed-JSON error flagged as unexpected EOF if the
    /// input ends first.
    fn next_non_whitespace(&mut self) -> Result<char, Error> {
        match self.next_non_whitespace_opt()? {
            Some(c) => Ok(c),
            None => Err(self.syntax_error_eof("End of input")),
        }
    }

    /// Like [`next_non_whitespace`](Self::next_non_whitespace) but reports
    /// end of input as `None`. When this returns a character it is always at
    /// `buffer[pos - 1]`, so the caller can push it back by decrementing
    /// `pos`.
    fn next_non_whitespace_opt(&mut self) -> Result<Option<char>, Error> {
        // Locals stand in for `pos` and `limit` to avoid field reads on each
        // whitespace character. They must be flushed to the fields before
        // any call that can refill the buffer, and reloaded afterwards.
        let mut p = self.pos;
        let mut l = self.limit;
        loop {
            if p == l {
                self.pos = p;
                if !self.fill_buffer(1)? {
                    return Ok(None);
                }
                p = self.pos;
                l = self.limit;
            }

            let c = self.buffer[p];
            p += 1;
            if c == '\n' {
                self.line_number += 1;
                self.line_start = p as isize;
                continue;
            } else if c == ' ' || c == '\r' || c == '\t' {
                continue;
            }

            if c == '/' {
                self.pos = p;
                if p == l {
                    self.pos -= 1; // push back '/' so it survives the refill
                    let chars_loaded = self.fill_buffer(2)?;
                    self.pos += 1; // consume the '/' again
                    if !chars_loaded {
                        return Ok(Some(c));
                    }
                }

                self.check_lenient()?;
                match self.buffer[self.pos] {
                    '*' => {
                        // skip a /* c-style comment */
                        self.pos += 1;
                        if !self.skip_to("*/")? {
                            return Err(self.syntax_error_eof("Unterminated comment"));
                        }
                        p = self.pos + 2;
                        l = self.limit;
                    }
                    '/' => {
                        // skip a // end-of-line comment
                        self.pos += 1;
                        self.skip_to_end_of_line()?;
                        p = self.pos;
                        l = self.limit;
                    }
                    _ => return Ok(Some(c)),
                }
            } else if c == '#' {
                self.pos = p;
                // Hash comments are outside the RFC but appear in documents
                // in the wild.
                self.check_lenient()?;
                self.skip_to_end_of_line()?;
                p = self.pos;
                l = self.limit;
            } else {
                self.pos = p;
                return Ok(Some(c));
            }
        }
    }

    /// Advances past the next newline. A line terminated by `"\r\n"` leaves
    /// the `'\n'` to be consumed as whitespace by the caller.
    fn skip_to_end_of_line(&mut self) -> Result<(), Error> {
        while self.pos < self.limit || self.fill_buffer(1)? {
            let c = self.buffer[self.pos];
            self.pos += 1;
            if c == '\n' {
                self.line_number += 1;
                self.line_start = self.pos as isize;
                break;
            } else if c == '\r' {
                break;
            }
        }
        Ok(())
    }

    /// Advances to the start of `to_find`, which must not contain a newline.
    fn skip_to(&mut self, to_find: &str) -> Result<bool, Error> {
        let length = to_find.len();
        'outer: while self.pos + length <= self.limit || self.fill_buffer(length)? {
            if self.buffer[self.pos] == '\n' {
                self.line_number += 1;
                self.line_start = self.pos as isize + 1;
                self.pos += 1;
                continue;
            }
            for (c, find) in to_find.bytes().enumerate() {
                if self.buffer[self.pos + c] != find as char {
                    self.pos += 1;
                    continue 'outer;
                }
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Consumes the `")]}'\n"` prefix, if present.
    fn consume_non_execute_prefix(&mut self) -> Result<(), Error> {
        // fast forward through the leading whitespace
        self.next_non_whitespace()?;
        self.pos -= 1;

        if self.pos + 5 > self.limit && !self.fill_buffer(5)? {
            return Ok(());
        }

        let p = self.pos;
        if self.buffer[p] != ')'
            || self.buffer[p + 1] != ']'
            || self.buffer[p + 2] != '}'
            || self.buffer[p + 3] != '\''
            || self.buffer[p + 4] != '\n'
        {
            return Ok(()); // not a security prefix
        }

        // consumed a security prefix!
        self.pos += 5;
        Ok(())
    }

    // --------------------------------------------------------------------
    // Scope stack and errors
    // --------------------------------------------------------------------

    fn top_scope(&self) -> JsonScope {
        self.stack.last().copied().unwrap_or(JsonScope::Closed)
    }

    fn set_top_scope(&mut self, scope: JsonScope) {
        if let Some(top) = self.stack.last_mut() {
            *top = scope;
        }
    }

    fn push(&mut self, scope: JsonScope) {
        self.stack.push(scope);
        self.path_names.push(None);
        self.path_indices.push(0);
    }

    fn pop(&mut self) {
        self.stack.pop();
        self.path_names.pop();
        self.path_indices.pop();
    }

    fn increment_path_index(&mut self) {
        if let Some(index) = self.path_indices.last_mut() {
            *index += 1;
        }
    }

    fn set_peeked(&mut self, p: Peeked) -> Peeked {
        self.peeked = p;
        p
    }

    /// Moves a peeked number literal out of the buffer into `peeked_string`.
    fn buffer_peeked_number(&mut self) {
        let literal: String = self.buffer[self.pos..self.pos + self.peeked_number_length]
            .iter()
            .collect();
        self.pos += self.peeked_number_length;
        self.peeked_string = Some(literal);
    }

    fn parse_buffered_f64(&self, expected: &str) -> Result<f64, Error> {
        let literal = self.peeked_string.as_deref().unwrap_or_default();
        match literal.parse() {
            Ok(value) => Ok(value),
            Err(_) => Err(self.number_error(format!("Expected {expected} but was {literal}"))),
        }
    }

    fn quote_of(p: Peeked) -> char {
        if p == Peeked::SingleQuoted || p == Peeked::SingleQuotedName {
            '\''
        } else {
            '"'
        }
    }

    fn token_of(p: Peeked) -> JsonToken {
        match p {
            Peeked::BeginObject => JsonToken::BeginObject,
            Peeked::EndObject => JsonToken::EndObject,
            Peeked::BeginArray => JsonToken::BeginArray,
            Peeked::EndArray => JsonToken::EndArray,
            Peeked::SingleQuotedName | Peeked::DoubleQuotedName | Peeked::UnquotedName => {
                JsonToken::Name
            }
            Peeked::True | Peeked::False => JsonToken::Boolean,
            Peeked::Null => JsonToken::Null,
            Peeked::SingleQuoted | Peeked::DoubleQuoted | Peeked::Unquoted | Peeked::Buffered => {
                JsonToken::String
            }
            Peeked::Long | Peeked::Number => JsonToken::Number,
            Peeked::Eof | Peeked::None => JsonToken::EndDocument,
        }
    }

    fn check_lenient(&self) -> Result<(), Error> {
        if self.lenient {
            Ok(())
        } else {
            Err(self.syntax_error("Use JsonReader::set_lenient(true) to accept malformed JSON"))
        }
    }

    fn location_string(&self) -> String {
        let line = self.line_number + 1;
        let column = self.pos as isize - self.line_start + 1;
        format!(" at line {line} column {column} path {}", self.path())
    }

    fn syntax_error(&self, message: impl Into<String>) -> Error {
        Error::Malformed {
            message: message.into(),
            location: self.location_string(),
            unexpected_eof: false,
        }
    }

    fn syntax_error_eof(&self, message: impl Into<String>) -> Error {
        Error::Malformed {
            message: message.into(),
            location: self.location_string(),
            unexpected_eof: true,
        }
    }

    fn state_error(&self, message: String) -> Error {
        Error::State {
            message,
            location: self.location_string(),
        }
    }

    fn number_error(&self, message: String) -> Error {
        Error::Number {
            message,
            location: self.location_string(),
        }
    }

    fn expected_token_error(&self, expected: JsonToken, was: Peeked) -> Error {
        self.state_error(format!("Expected {expected} but was {}", Self::token_of(was)))
    }

    fn expected_kind_error(&self, expected: &str, was: Peeked) -> Error {
        self.state_error(format!("Expected {expected} but was {}", Self::token_of(was)))
    }
}

impl<S: CharSource> fmt::Debug for JsonReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonReader")
            .field("lenient", &self.lenient)
            .field("line", &(self.line_number + 1))
            .field("column", &(self.pos as isize - self.line_start + 1))
            .field("path", &self.path())
            .finish_non_exhaustive()
    }
}

impl<S: CharSource> fmt::Display for JsonReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = self.line_number + 1;
        let column = self.pos as isize - self.line_start + 1;
        write!(
            f,
            "JsonReader at line {line} column {column} path {}",
            self.path()
        )
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;
    use crate::source::StringSource;

    fn reader(text: &str) -> JsonReader<StringSource> {
        JsonReader::new(StringSource::new(text))
    }

    #[test]
    fn peek_is_idempotent() {
        let mut r = reader("[true]");
        assert_eq!(r.peek().unwrap(), JsonToken::BeginArray);
        assert_eq!(r.peek().unwrap(), JsonToken::BeginArray);
        r.begin_array().unwrap();
        assert_eq!(r.peek().unwrap(), JsonToken::Boolean);
        assert_eq!(r.peek().unwrap(), JsonToken::Boolean);
        assert!(r.next_bool().unwrap());
    }

    #[test]
    fn closed_reader_reports_state_error() {
        let mut r = reader("[]");
        r.close();
        let err = r.peek().unwrap_err();
        assert!(matches!(err, Error::State { .. }));
        assert!(err.to_string().contains("closed"));
    }

    #[test]
    fn display_tracks_location() {
        let mut r = reader("{\"a\": 1}");
        r.begin_object().unwrap();
        r.next_name().unwrap();
        assert!(r.to_string().starts_with("JsonReader at line 1 column "));
        assert!(r.to_string().ends_with("path $.a"));
    }

    #[test]
    fn minus_zero_stays_a_double() {
        let mut r = reader("[-0]");
        r.begin_array().unwrap();
        assert_eq!(r.peek().unwrap(), JsonToken::Number);
        let value = r.next_f64().unwrap();
        assert_eq!(value, 0.0);
        assert!(value.is_sign_negative());
        r.end_array().unwrap();
    }

    #[test]
    fn long_min_and_max_peek_as_integers() {
        let mut r = reader("[-9223372036854775808, 9223372036854775807]");
        r.begin_array().unwrap();
        assert_eq!(r.next_i64().unwrap(), i64::MIN);
        assert_eq!(r.next_i64().unwrap(), i64::MAX);
        r.end_array().unwrap();
    }

    #[test]
    fn promote_name_reads_it_as_a_string() {
        let mut r = reader("{\"a\": 5}");
        r.begin_object().unwrap();
        r.promote_name_to_value().unwrap();
        assert_eq!(r.next_string().unwrap(), "a");
        assert_eq!(r.next_i64().unwrap(), 5);
        r.end_object().unwrap();
    }

    #[test]
    fn promote_name_rejects_values() {
        let mut r = reader("[1]");
        r.begin_array().unwrap();
        assert!(matches!(
            r.promote_name_to_value().unwrap_err(),
            Error::State { .. }
        ));
    }
}
