//! A pull-based streaming reader for JSON
//! ([RFC 7159](https://www.rfc-editor.org/rfc/rfc7159)) and an
//! insertion-ordered associative map for materialising decoded objects.
//!
//! [`JsonReader`] reads a document as a stream of tokens in depth-first
//! order: call [`JsonReader::peek`] to classify the next token without
//! consuming it, then one of the `begin_*`/`end_*`/`next_*` methods to
//! consume it. A lenient mode accepts a documented superset of the RFC.
//!
//! [`OrderedMap`] keeps entries in insertion order while using an AVL tree
//! per hash bucket for `O(log n)` comparison-ordered lookup.
//!
//! ```rust
//! use jsonpull::{JsonReader, JsonToken, StringSource};
//!
//! let mut reader = JsonReader::new(StringSource::new(r#"{"id": 7, "name": "seven"}"#));
//! reader.begin_object().unwrap();
//! assert_eq!(reader.next_name().unwrap(), "id");
//! assert_eq!(reader.next_i64().unwrap(), 7);
//! assert_eq!(reader.next_name().unwrap(), "name");
//! assert_eq!(reader.next_string().unwrap(), "seven");
//! reader.end_object().unwrap();
//! assert_eq!(reader.peek().unwrap(), JsonToken::EndDocument);
//! ```

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

mod error;
mod map;
mod reader;
mod scope;
mod source;
mod token;

pub use error::Error;
pub use map::{
    Comparator, ConcurrentModification, Cursor, Iter, Keys, NaturalOrder, OrderedMap, Values,
};
pub use reader::JsonReader;
pub use source::{CharSource, SourceError, StringSource};
pub use token::JsonToken;
