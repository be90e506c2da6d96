use alloc::string::String;

use thiserror::Error;

use crate::source::SourceError;

/// Errors produced by [`JsonReader`](crate::JsonReader).
///
/// Every diagnostic ends with a `" at line L column C path P"` suffix where
/// `P` is the JSONPath trace of the reader's position, so messages can be
/// surfaced to users as-is.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The input violates the JSON grammar for the configured dialect.
    #[error("{message}{location}")]
    Malformed {
        message: String,
        location: String,
        /// True when the input ended where the grammar required more, so
        /// callers can distinguish truncated documents from corrupt ones.
        unexpected_eof: bool,
    },

    /// The reader was driven in a way that disagrees with the token stream,
    /// or was used after [`close`](crate::JsonReader::close).
    #[error("{message}{location}")]
    State { message: String, location: String },

    /// A literal could not be converted to the requested numeric type, or
    /// the conversion would lose precision.
    #[error("{message}{location}")]
    Number { message: String, location: String },

    /// The character source failed; carried unchanged.
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl Error {
    /// Returns `true` for malformed-JSON errors caused by input that ended
    /// before the grammar allowed it to.
    #[must_use]
    pub fn is_unexpected_eof(&self) -> bool {
        matches!(
            self,
            Error::Malformed {
                unexpected_eof: true,
                ..
            }
        )
    }
}
