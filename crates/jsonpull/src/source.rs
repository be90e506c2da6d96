use alloc::{string::String, vec::Vec};

use thiserror::Error;

/// A blocking producer of characters for [`JsonReader`](crate::JsonReader).
///
/// Implementations fill as much of `dst` as they can and return how many
/// characters were stored. Returning `Ok(0)` signals end of input; all
/// blocking happens inside `read`.
pub trait CharSource {
    fn read(&mut self, dst: &mut [char]) -> Result<usize, SourceError>;
}

/// Failure reported by a [`CharSource`].
///
/// The reader propagates these unchanged inside
/// [`Error::Source`](crate::Error::Source).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SourceError {
    message: String,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A [`CharSource`] over an in-memory string.
///
/// [`with_chunk_size`](StringSource::with_chunk_size) caps how many
/// characters a single `read` call returns, which exercises the reader's
/// buffer-refill paths the same way a slow pipe would.
#[derive(Debug, Clone)]
pub struct StringSource {
    chars: Vec<char>,
    pos: usize,
    chunk_size: usize,
}

impl StringSource {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            chunk_size: usize::MAX,
        }
    }

    pub fn with_chunk_size(text: &str, chunk_size: usize) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl CharSource for StringSource {
    fn read(&mut self, dst: &mut [char]) -> Result<usize, SourceError> {
        let remaining = self.chars.len() - self.pos;
        let count = dst.len().min(remaining).min(self.chunk_size);
        dst[..count].copy_from_slice(&self.chars[self.pos..self.pos + count]);
        self.pos += count;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::{CharSource, StringSource};

    #[test]
    fn reads_to_exhaustion() {
        let mut source = StringSource::new("abc");
        let mut buf = ['\0'; 8];
        assert_eq!(source.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &['a', 'b', 'c']);
        assert_eq!(source.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn chunk_size_caps_each_read() {
        let mut source = StringSource::with_chunk_size("abcd", 3);
        let mut buf = ['\0'; 8];
        assert_eq!(source.read(&mut buf).unwrap(), 3);
        assert_eq!(source.read(&mut buf).unwrap(), 1);
        assert_eq!(source.read(&mut buf).unwrap(), 0);
    }
}
