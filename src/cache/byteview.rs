//! Byte View Module
//!
//! Defines the immutable value type handed out by the cache.

use std::borrow::Cow;

use bytes::Bytes;

// == Byte View ==
/// An immutable view of cached bytes.
///
/// Clones share the same buffer; nothing can mutate it after creation.
/// Callers that need an owned, writable buffer use [`ByteView::to_vec`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteView {
    bytes: Bytes,
}

impl ByteView {
    // == Constructor ==
    /// Creates a view by copying the given slice.
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self {
            bytes: Bytes::copy_from_slice(data),
        }
    }

    // == Length ==
    /// Returns the size of the value in bytes.
    ///
    /// This is the unit the cache's byte budget is charged in.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the value holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    // == Copy Out ==
    /// Returns a copy of the data as a byte vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    /// Returns the data as a string, replacing invalid UTF-8.
    pub fn as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Returns the underlying shared buffer.
    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }
}

impl AsRef<[u8]> for ByteView {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(data: Vec<u8>) -> Self {
        Self {
            bytes: Bytes::from(data),
        }
    }
}

impl From<Bytes> for ByteView {
    fn from(bytes: Bytes) -> Self {
        Self { bytes }
    }
}

impl From<&str> for ByteView {
    fn from(s: &str) -> Self {
        Self::copy_from_slice(s.as_bytes())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_len() {
        let view = ByteView::from("630");
        assert_eq!(view.len(), 3);
        assert!(!view.is_empty());
        assert!(ByteView::default().is_empty());
    }

    #[test]
    fn test_to_vec_is_a_copy() {
        let view = ByteView::from(vec![1u8, 2, 3]);

        let mut copy = view.to_vec();
        copy[0] = 42;

        assert_eq!(view.as_ref(), &[1, 2, 3]);
        assert_eq!(copy, vec![42, 2, 3]);
    }

    #[test]
    fn test_as_str() {
        let view = ByteView::from("hello");
        assert_eq!(view.as_str(), "hello");
    }

    #[test]
    fn test_clones_are_equal() {
        let view = ByteView::copy_from_slice(b"abc");
        let other = view.clone();
        assert_eq!(view, other);
        assert_eq!(other.bytes(), Bytes::from_static(b"abc"));
    }
}
