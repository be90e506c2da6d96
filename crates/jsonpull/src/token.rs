use core::fmt;

/// A structure, name, or value type produced by
/// [`JsonReader::peek`](crate::JsonReader::peek).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonToken {
    /// The opening `[` of an array.
    BeginArray,
    /// The closing `]` of an array.
    EndArray,
    /// The opening `{` of an object.
    BeginObject,
    /// The closing `}` of an object.
    EndObject,
    /// An object property name. Consume with
    /// [`next_name`](crate::JsonReader::next_name).
    Name,
    /// A string value.
    String,
    /// A number value. May be consumed as a string to avoid precision loss.
    Number,
    /// `true` or `false`.
    Boolean,
    /// The `null` literal.
    Null,
    /// The end of the document. Attempting to consume it fails.
    EndDocument,
}

impl fmt::Display for JsonToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JsonToken::BeginArray => "BEGIN_ARRAY",
            JsonToken::EndArray => "END_ARRAY",
            JsonToken::BeginObject => "BEGIN_OBJECT",
            JsonToken::EndObject => "END_OBJECT",
            JsonToken::Name => "NAME",
            JsonToken::String => "STRING",
            JsonToken::Number => "NUMBER",
            JsonToken::Boolean => "BOOLEAN",
            JsonToken::Null => "NULL",
            JsonToken::EndDocument => "END_DOCUMENT",
        };
        f.write_str(name)
    }
}
