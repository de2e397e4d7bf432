//! Opaque resource handles.
//!
//! A [`Handle`] names a live host resource (open file, socket, HTTP listener,
//! in-flight request) by a 64-bit identifier. Scripts never see the
//! identifier directly: it travels through the value system as an 8-byte
//! little-endian byte sequence. A handle carries no resource-kind
//! information, so passing a file handle to a socket operation is detected
//! only when the receiving service fails to find the identifier.

use std::fmt;
use thiserror::Error;

/// Encoded size of a handle, in bytes.
pub const HANDLE_LEN: usize = 8;

// ---------------------------------------------------------------------------
// HandleError
// ---------------------------------------------------------------------------

/// Errors produced while decoding a byte sequence into a [`Handle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HandleError {
    /// An empty byte sequence is never a valid handle.
    #[error("empty handle")]
    Empty,
    /// The byte sequence is not exactly [`HANDLE_LEN`] bytes long.
    #[error("malformed handle: expected {HANDLE_LEN} bytes, got {0}")]
    BadLength(usize),
    /// Identifier 0 is never issued.
    #[error("zero handle")]
    Zero,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// A non-zero resource identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    /// Wrap a raw identifier. Returns `None` for 0, which is reserved as the
    /// "no handle" value.
    pub fn new(id: u64) -> Option<Self> {
        (id != 0).then_some(Self(id))
    }

    /// Return the raw numeric identifier.
    pub fn id(self) -> u64 {
        self.0
    }

    /// Encode as the 8-byte little-endian sequence scripts carry around.
    pub fn to_bytes(self) -> [u8; HANDLE_LEN] {
        self.0.to_le_bytes()
    }

    /// Decode a byte sequence produced by [`Handle::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HandleError> {
        if bytes.is_empty() {
            return Err(HandleError::Empty);
        }
        let raw: [u8; HANDLE_LEN] = bytes
            .try_into()
            .map_err(|_| HandleError::BadLength(bytes.len()))?;
        Self::new(u64::from_le_bytes(raw)).ok_or(HandleError::Zero)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_little_endian() {
        let h = Handle::new(0x0102).unwrap();
        assert_eq!(h.to_bytes(), [0x02, 0x01, 0, 0, 0, 0, 0, 0]);
        assert_eq!(Handle::from_bytes(&h.to_bytes()), Ok(h));
    }

    #[test]
    fn zero_is_never_a_handle() {
        assert!(Handle::new(0).is_none());
        assert_eq!(Handle::from_bytes(&[0u8; 8]), Err(HandleError::Zero));
    }

    #[test]
    fn rejects_empty_and_short_sequences() {
        assert_eq!(Handle::from_bytes(&[]), Err(HandleError::Empty));
        assert_eq!(Handle::from_bytes(&[1, 2, 3]), Err(HandleError::BadLength(3)));
        assert_eq!(
            Handle::from_bytes(&[1u8; 9]),
            Err(HandleError::BadLength(9))
        );
    }

    #[test]
    fn display_uses_hash_prefix() {
        assert_eq!(Handle::new(42).unwrap().to_string(), "#42");
    }
}
