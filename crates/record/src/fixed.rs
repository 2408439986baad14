//! Bounded, NUL-padded text fields.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("value is {len} bytes, capacity is {max}")]
    TooLong { len: usize, max: usize },
    #[error("value contains a NUL byte")]
    Nul,
    #[error("field has no NUL terminator")]
    Unterminated,
    #[error("field is not valid utf-8")]
    InvalidUtf8,
}

/// Text stored in exactly `N` bytes: up to `N - 1` bytes of content followed
/// by NUL padding.
///
/// This is the layout of every string field in the node store and on the
/// wire. The buffer always holds at least one NUL and everything after the
/// first NUL is zero, so comparing two values compares the full padded width.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedStr<const N: usize> {
    buf: [u8; N],
}

impl<const N: usize> FixedStr<N> {
    /// Largest content length in bytes.
    pub const CAPACITY: usize = N - 1;

    /// Builds a field from `s`, rejecting content that does not fit.
    pub fn new(s: &str) -> Result<Self, FieldError> {
        let bytes = s.as_bytes();
        if bytes.len() > Self::CAPACITY {
            return Err(FieldError::TooLong {
                len: bytes.len(),
                max: Self::CAPACITY,
            });
        }
        if bytes.contains(&0) {
            return Err(FieldError::Nul);
        }
        let mut buf = [0u8; N];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Self { buf })
    }

    /// Decodes a padded buffer as read from disk or the wire.
    ///
    /// Content ends at the first NUL; bytes after it are discarded. A buffer
    /// with no NUL at all is rejected.
    pub fn from_padded(raw: [u8; N]) -> Result<Self, FieldError> {
        let len = raw
            .iter()
            .position(|&b| b == 0)
            .ok_or(FieldError::Unterminated)?;
        if std::str::from_utf8(&raw[..len]).is_err() {
            return Err(FieldError::InvalidUtf8);
        }
        let mut buf = [0u8; N];
        buf[..len].copy_from_slice(&raw[..len]);
        Ok(Self { buf })
    }

    /// The full padded representation.
    pub fn as_padded(&self) -> &[u8; N] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.iter().position(|&b| b == 0).unwrap_or(N)
    }

    pub fn is_empty(&self) -> bool {
        self.buf.first().map_or(true, |&b| b == 0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len()]
    }

    pub fn as_str(&self) -> &str {
        // content is validated on every constructor
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }
}

impl<const N: usize> Default for FixedStr<N> {
    fn default() -> Self {
        Self { buf: [0u8; N] }
    }
}

impl<const N: usize> fmt::Debug for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl<const N: usize> fmt::Display for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Plate = FixedStr<8>;

    #[test]
    fn new_pads_with_nul() {
        let p = Plate::new("ABC12").unwrap();
        assert_eq!(p.as_padded(), b"ABC12\0\0\0");
        assert_eq!(p.len(), 5);
        assert_eq!(p.as_str(), "ABC12");
    }

    #[test]
    fn new_accepts_exact_capacity() {
        let p = Plate::new("ABCDEFG").unwrap();
        assert_eq!(p.as_padded(), b"ABCDEFG\0");
        assert_eq!(Plate::CAPACITY, 7);
    }

    #[test]
    fn new_rejects_overlong() {
        assert_eq!(
            Plate::new("ABCDEFGH"),
            Err(FieldError::TooLong { len: 8, max: 7 })
        );
    }

    #[test]
    fn new_rejects_interior_nul() {
        assert_eq!(Plate::new("AB\0C"), Err(FieldError::Nul));
    }

    #[test]
    fn empty_and_default_agree() {
        let e = Plate::new("").unwrap();
        assert!(e.is_empty());
        assert_eq!(e, Plate::default());
    }

    #[test]
    fn from_padded_discards_bytes_after_nul() {
        let p = Plate::from_padded(*b"XYZ\0junk").unwrap();
        assert_eq!(p.as_str(), "XYZ");
        assert_eq!(p, Plate::new("XYZ").unwrap());
        assert_eq!(p.as_padded(), b"XYZ\0\0\0\0\0");
    }

    #[test]
    fn from_padded_requires_terminator() {
        assert_eq!(
            Plate::from_padded(*b"ABCDEFGH"),
            Err(FieldError::Unterminated)
        );
    }

    #[test]
    fn from_padded_rejects_bad_utf8() {
        let mut raw = [0u8; 8];
        raw[0] = 0xff;
        raw[1] = 0xfe;
        assert_eq!(Plate::from_padded(raw), Err(FieldError::InvalidUtf8));
    }

    #[test]
    fn equality_is_full_width() {
        // a prefix of a key must not compare equal to it
        let short = Plate::new("ABC12").unwrap();
        let long = Plate::new("ABC123").unwrap();
        assert_ne!(short, long);
    }

    #[test]
    fn display_and_debug() {
        let p = Plate::new("QWE987").unwrap();
        assert_eq!(p.to_string(), "QWE987");
        assert_eq!(format!("{:?}", p), "\"QWE987\"");
    }
}
